//! Response handling module that converts handler results into HTTP responses.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses. It includes implementations for common types
//! like Result, Option, String, etc.
//!
//! Text bodies get their content type inferred: markup-looking text is served as
//! html, anything else as plain text. Use [`Html`] to force html regardless.

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use nimble_http::handler::BoxError;
use nimble_http::protocol::Response;

use crate::error::HandlerError;
use crate::handler::HandlerResult;

/// A trait for types that can be converted into HTTP responses.
///
/// Types implementing this trait can be returned directly from request handlers
/// and will be automatically converted into HTTP responses.
pub trait Responder {
    fn respond(self) -> HandlerResult;
}

/// A value serialized as a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Text served as `text/html` without inspecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Html<T>(pub T);

/// Errors become the failure of the handler; the dispatch boundary renders them.
impl<T: Responder, E: Into<BoxError>> Responder for Result<T, E> {
    fn respond(self) -> HandlerResult {
        match self {
            Ok(t) => t.respond(),
            Err(e) => Err(e.into()),
        }
    }
}

/// `None` answers `404 Not Found`.
impl<T: Responder> Responder for Option<T> {
    fn respond(self) -> HandlerResult {
        match self {
            Some(t) => t.respond(),
            None => Ok(HandlerError::from_status(StatusCode::NOT_FOUND).to_response()),
        }
    }
}

impl Responder for Response {
    fn respond(self) -> HandlerResult {
        Ok(self)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn respond(self) -> HandlerResult {
        let (status, responder) = self;
        let mut response = responder.respond()?;
        response.set_status(status);
        Ok(response)
    }
}

impl Responder for HandlerError {
    fn respond(self) -> HandlerResult {
        Ok(self.to_response())
    }
}

impl Responder for String {
    fn respond(self) -> HandlerResult {
        Ok(Response::new(self))
    }
}

impl Responder for &'static str {
    fn respond(self) -> HandlerResult {
        Ok(Response::new(self))
    }
}

impl Responder for Value {
    fn respond(self) -> HandlerResult {
        Ok(Response::json(self))
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn respond(self) -> HandlerResult {
        let value = serde_json::to_value(self.0)?;
        Ok(Response::json(value))
    }
}

impl<T: Into<String>> Responder for Html<T> {
    fn respond(self) -> HandlerResult {
        Ok(Response::html(self.0))
    }
}

impl Responder for Bytes {
    fn respond(self) -> HandlerResult {
        Ok(Response::binary(self))
    }
}

impl Responder for Vec<u8> {
    fn respond(self) -> HandlerResult {
        Ok(Response::binary(self))
    }
}

impl Responder for () {
    fn respond(self) -> HandlerResult {
        Ok(Response::new(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimble_http::protocol::ResponseBody;
    use serde_json::json;

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn string_infers_content_type() {
        let response = "<h1>hi</h1>".respond().unwrap();
        assert_eq!(response.resolved_content_type().unwrap(), "text/html; charset=utf-8");

        let response = String::from("hi").respond().unwrap();
        assert_eq!(response.resolved_content_type().unwrap(), "text/plain; charset=utf-8");
    }

    #[test]
    fn json_wrapper_serializes() {
        let response = Json(User { id: 7, name: "jane" }).respond().unwrap();
        assert_eq!(response.body(), &ResponseBody::Json(json!({"id": 7, "name": "jane"})));
        assert_eq!(response.resolved_content_type().unwrap(), "application/json");
    }

    #[test]
    fn html_wrapper_forces_html() {
        let response = Html("plain words").respond().unwrap();
        assert_eq!(response.resolved_content_type().unwrap(), "text/html; charset=utf-8");
    }

    #[test]
    fn status_tuple() {
        let response = (StatusCode::CREATED, json!({"ok": true})).respond().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn none_is_not_found() {
        let response = Option::<String>::None.respond().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), &ResponseBody::Text("Not Found".into()));
    }

    #[test]
    fn err_is_propagated() {
        let result: Result<String, HandlerError> = Err(HandlerError::new(StatusCode::CONFLICT, "taken"));
        let error = result.respond().unwrap_err();
        assert_eq!(error.downcast_ref::<HandlerError>().unwrap().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unit_and_binary() {
        assert!(().respond().unwrap().body().is_empty());
        let response = vec![1u8, 2, 3].respond().unwrap();
        assert_eq!(response.resolved_content_type().unwrap(), "application/octet-stream");
    }
}
