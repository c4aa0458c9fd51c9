//! The HTTP/1.1 protocol core of nimble
//!
//! This crate provides the wire layer of the nimble web framework: an
//! incremental request parser, a response model with deferred body
//! serialization, and a connection loop that serves keep-alive and pipelined
//! requests on top of tokio.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing from arbitrarily fragmented input
//! - `Content-Length` framed request bodies with configurable size limits
//! - Keep-alive connections and in-order pipelining
//! - Read and keep-alive timeouts
//! - Lazily parsed query strings and request bodies (JSON, form, text)
//! - Response content type inference and exact `Content-Length`
//!
//! # Example
//!
//! ```no_run
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use nimble_http::connection::HttpConnection;
//! use nimble_http::handler::make_handler;
//! use nimble_http::protocol::{Request, Response};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             match connection.process(handler).await {
//!                 Ok(_) => {
//!                     info!("finished process, connection shutdown");
//!                 }
//!                 Err(e) => {
//!                     error!("service has error, cause {}, connection shutdown", e);
//!                 }
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
//!     info!(path = request.path(), "receiving request");
//!     Ok(Response::text("Hello World!\r\n"))
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`connection`]: Connection handling, timeouts and lifecycle management
//! - [`protocol`]: Request, response and error types
//! - [`codec`]: Request decoding and response encoding
//! - [`handler`]: Request handler trait and utilities
//!
//! # Limitations
//!
//! - HTTP/1.x only (currently HTTP/2 or HTTP/3 is not supported)
//! - No TLS support (use a reverse proxy for HTTPS)
//! - No chunked request bodies; `Transfer-Encoding` is answered with `501`
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
