//! Errors of the framework layer.

use std::io;

use http::{Method, StatusCode};
use thiserror::Error;

use nimble_http::protocol::Response;

/// Failure to resolve or register a route.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches the requested path")]
    NotFound,

    #[error("method not allowed, allowed methods: {allow:?}")]
    MethodNotAllowed { allow: Vec<Method> },

    #[error("invalid route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },
}

impl RouteError {
    pub fn invalid_route<P: ToString, S: ToString>(path: P, reason: S) -> Self {
        Self::InvalidRoute { path: path.to_string(), reason: reason.to_string() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidRoute { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An HTTP error raised on purpose by application code.
///
/// Returned from a handler or middleware (boxed as any other error), it is
/// rendered verbatim: its status and message become the response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HandlerError {
    status: StatusCode,
    message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// An error whose message is the canonical reason of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_response(&self) -> Response {
        let mut response = Response::text(self.message.clone());
        response.set_status(self.status);
        response
    }
}

/// Failure to configure, build or run a server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("router must be set")]
    MissingRouter,

    #[error("bind {address} error: {source}")]
    Bind { address: String, source: io::Error },

    #[error("accept error: {source}")]
    Accept { source: io::Error },
}

impl ServerError {
    pub fn invalid_config<S: ToString>(str: S) -> Self {
        Self::InvalidConfig { reason: str.to_string() }
    }
}
