//! The seam between a connection and the application.
//!
//! A connection hands every complete [`Request`] to a [`Handler`] and writes
//! back whatever [`Response`] it produces. Handler errors never reach the
//! client verbatim; the connection answers them with `500 Internal Server Error`.
//! Requests that never parse don't reach [`Handler::call`], they are reported
//! through [`Handler::on_parse_error`] instead.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{ParseError, Request, Response};

/// A boxed error that can cross task boundaries.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<BoxError>;

    async fn call(&self, req: Request) -> Result<Response, Self::Error>;

    /// Told about a request that could not be parsed, before the connection
    /// answers it and closes.
    fn on_parse_error(&self, _error: &ParseError) {}
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response, Err>> + Send,
{
    type Error = Err;

    async fn call(&self, req: Request) -> Result<Response, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, Err, Ret>(f: F) -> HandlerFn<F>
where
    Err: Into<BoxError>,
    Ret: Future<Output = Result<Response, Err>>,
    F: Fn(Request) -> Ret,
{
    HandlerFn { f }
}
