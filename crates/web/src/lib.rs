//! A small async web framework on top of `nimble-http`.
//!
//! # Features
//!
//! - Trie router with `:name` parameters, route groups and per-method handlers
//! - Middleware composed once at startup, global then group then route
//! - Synchronous handlers on a bounded worker pool, async handlers on the connection task
//! - Handlers return anything implementing [`Responder`]
//! - A dispatch boundary that turns every failure into a proper HTTP response
//! - Pluggable logger, task orchestrator and template engine
//!
//! # Example
//!
//! ```no_run
//! use nimble_http::protocol::Request;
//! use nimble_web::handler::{async_handler, sync_handler};
//! use nimble_web::responder::Json;
//! use nimble_web::router::{Routable, Router};
//! use nimble_web::Server;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::builder();
//!     router.get("/", sync_handler(|_req: Request| "Hello World!"))?;
//!     router.get("/users/:id", async_handler(|req: Request| async move {
//!         Json(json!({ "id": req.param("id") }))
//!     }))?;
//!
//!     let server = Server::builder().router(router).port(8080).build()?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod components;
mod date;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod responder;
pub mod router;
pub mod server;

pub use components::RequestExt;
pub use error::{HandlerError, RouteError, ServerError};
pub use handler::{async_handler, sync_handler};
pub use middleware::{Middleware, Next, middleware_fn};
pub use responder::{Html, Json, Responder};
pub use router::{Routable, Router};
pub use server::Server;
