//! Middleware: decorators around a request handler.
//!
//! A [`Middleware`] takes the rest of the chain as a [`Next`] and returns a new
//! [`Next`] wrapping it. Chains are composed once, when the router is frozen:
//!
//! ```text
//! global[0] -> global[1] -> ... -> route[0] -> route[1] -> ... -> handler
//! ```
//!
//! A middleware may inspect or modify the request, call the rest of the chain,
//! modify the response, or answer on its own without calling the chain at all.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use nimble_http::protocol::Request;

use crate::handler::{HandlerResult, RequestHandler};

/// A shared, type erased middleware.
pub type BoxMiddleware = Arc<dyn Middleware>;

pub trait Middleware: Send + Sync {
    fn decorate(&self, next: Next) -> Next;
}

/// The remainder of a handler chain.
#[derive(Clone)]
pub struct Next {
    inner: Arc<dyn RequestHandler>,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

impl PartialEq for Next {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Next {
    pub fn new(handler: impl RequestHandler + 'static) -> Self {
        Self { inner: Arc::new(handler) }
    }

    pub fn from_arc(handler: Arc<dyn RequestHandler>) -> Self {
        Self { inner: handler }
    }

    pub async fn run(&self, req: Request) -> HandlerResult {
        self.inner.invoke(req).await
    }
}

/// Wraps `endpoint` so that `middlewares[0]` runs first.
pub(crate) fn compose(middlewares: &[BoxMiddleware], endpoint: Next) -> Next {
    middlewares.iter().rev().fold(endpoint, |next, middleware| middleware.decorate(next))
}

pub struct MiddlewareFn<F> {
    f: Arc<F>,
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareFn").finish_non_exhaustive()
    }
}

/// Builds a middleware from an async closure receiving the request and the rest of the chain.
///
/// ```
/// use nimble_web::middleware::{middleware_fn, Next};
/// use nimble_http::protocol::Request;
/// use http::{HeaderName, HeaderValue};
///
/// let powered_by = middleware_fn(|req: Request, next: Next| async move {
///     let mut response = next.run(req).await?;
///     response.set_header(HeaderName::from_static("x-powered-by"), HeaderValue::from_static("nimble"));
///     Ok(response)
/// });
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    MiddlewareFn { f: Arc::new(f) }
}

impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn decorate(&self, next: Next) -> Next {
        Next::new(MiddlewareHandler { f: Arc::clone(&self.f), next })
    }
}

struct MiddlewareHandler<F> {
    f: Arc<F>,
    next: Next,
}

#[async_trait]
impl<F, Fut> RequestHandler for MiddlewareHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn invoke(&self, req: Request) -> HandlerResult {
        (self.f)(req, self.next.clone()).await
    }
}
