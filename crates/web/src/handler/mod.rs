//! Request handlers and their execution model.
//!
//! Every route endpoint is a [`RouteHandler`], tagged once at registration:
//!
//! - [`sync_handler`]: a blocking function, executed on the bounded [`WorkerPool`]
//!   so it never stalls the connection tasks
//! - [`async_handler`]: an async function, awaited directly on the connection task
//!
//! Both kinds may return anything implementing [`Responder`].

mod worker_pool;

pub use worker_pool::{DEFAULT_WORKERS, WorkerPool};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use nimble_http::handler::BoxError;
use nimble_http::protocol::{Request, Response};

use crate::middleware::Next;
use crate::responder::Responder;

/// The outcome of handling a request: a response or an error for the dispatch boundary.
pub type HandlerResult = Result<Response, BoxError>;

type SyncFn = Arc<dyn Fn(Request) -> HandlerResult + Send + Sync>;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request) -> HandlerResult;
}

/// A holder which represents any async Fn
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut, R> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Responder,
{
    async fn invoke(&self, req: Request) -> HandlerResult {
        (self.f)(req).await.respond()
    }
}

/// A route endpoint with its execution model.
#[derive(Clone)]
pub enum RouteHandler {
    /// Runs on the worker pool
    Sync(SyncFn),
    /// Awaited on the connection task
    Async(Arc<dyn RequestHandler>),
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteHandler::Sync(_) => f.write_str("RouteHandler::Sync"),
            RouteHandler::Async(_) => f.write_str("RouteHandler::Async"),
        }
    }
}

impl RouteHandler {
    pub fn is_async(&self) -> bool {
        matches!(self, RouteHandler::Async(_))
    }

    /// Turns the endpoint into the innermost link of a middleware chain.
    pub(crate) fn into_next(self, pool: &WorkerPool) -> Next {
        match self {
            RouteHandler::Sync(f) => Next::new(BlockingHandler { f, pool: pool.clone() }),
            RouteHandler::Async(handler) => Next::from_arc(handler),
        }
    }
}

/// Tags a blocking function as a route endpoint.
pub fn sync_handler<F, R>(f: F) -> RouteHandler
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: Responder,
{
    RouteHandler::Sync(Arc::new(move |req| f(req).respond()))
}

/// Tags an async function as a route endpoint.
pub fn async_handler<F, Fut, R>(f: F) -> RouteHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + 'static,
{
    RouteHandler::Async(Arc::new(FnHandler { f }))
}

/// Runs a synchronous endpoint off the connection task.
struct BlockingHandler {
    f: SyncFn,
    pool: WorkerPool,
}

#[async_trait]
impl RequestHandler for BlockingHandler {
    async fn invoke(&self, req: Request) -> HandlerResult {
        let f = Arc::clone(&self.f);
        self.pool.run(move || f(req)).await?
    }
}
