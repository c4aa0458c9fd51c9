//! HTTP response model.
//!
//! A [`Response`] keeps its body as a [`ResponseBody`] variant; bytes are only
//! produced when the [`ResponseEncoder`](crate::codec::ResponseEncoder) writes
//! the final wire message. Until then the response may be freely mutated, e.g.
//! the connection loop injecting `Connection` or the router injecting `Allow`.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;

use crate::ensure;
use crate::protocol::ResponseBody;

/// An outgoing HTTP response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    content_type: Option<HeaderValue>,
    body: ResponseBody,
}

/// Rejected arguments to the status-checked response constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidStatus {
    #[error("invalid redirect status code {0}: must be in the 3xx range")]
    NotRedirect(StatusCode),
    #[error("invalid error status code {0}: must be in the 4xx or 5xx range")]
    NotError(StatusCode),
}

impl Response {
    /// Creates a `200 OK` response whose content type is inferred from `body`.
    pub fn new(body: impl Into<ResponseBody>) -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), content_type: None, body: body.into() }
    }

    pub fn with_status(status: StatusCode, body: impl Into<ResponseBody>) -> Self {
        Self { status, ..Self::new(body) }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::with_status(status, ResponseBody::Empty)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResponseBody::Text(text.into())).content_type(HeaderValue::from_static("text/plain; charset=utf-8"))
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::new(ResponseBody::Text(html.into())).content_type(HeaderValue::from_static("text/html; charset=utf-8"))
    }

    pub fn json(value: Value) -> Self {
        Self::new(ResponseBody::Json(value))
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(ResponseBody::Binary(bytes.into()))
    }

    /// A redirect to `location`; `status` must be a 3xx code.
    pub fn redirect(location: HeaderValue, status: StatusCode) -> Result<Self, InvalidStatus> {
        ensure!(status.is_redirection(), InvalidStatus::NotRedirect(status));

        let reason = status.canonical_reason().unwrap_or_default();
        let mut response = Self::text(reason);
        response.status = status;
        response.headers.insert(LOCATION, location);
        Ok(response)
    }

    /// A plain text error response; `status` must be a 4xx or 5xx code.
    ///
    /// Without a message, the canonical reason phrase becomes the body.
    pub fn error(status: StatusCode, message: Option<&str>) -> Result<Self, InvalidStatus> {
        ensure!(status.is_client_error() || status.is_server_error(), InvalidStatus::NotError(status));

        let message = message.or(status.canonical_reason()).unwrap_or_default();
        let mut response = Self::text(message);
        response.status = status;
        Ok(response)
    }

    #[must_use]
    pub fn content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets header `name`, replacing any previous values.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if name == CONTENT_TYPE {
            self.content_type = Some(value);
        } else {
            self.headers.insert(name, value);
        }
    }

    /// Appends a value to header `name`, keeping previous values.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn set_content_type(&mut self, content_type: HeaderValue) {
        self.content_type = Some(content_type);
    }

    /// The explicit content type if one was set, otherwise the one inferred from the body.
    pub fn resolved_content_type(&self) -> Option<HeaderValue> {
        match &self.content_type {
            Some(content_type) => Some(content_type.clone()),
            None => self.body.inferred_content_type().map(HeaderValue::from_static),
        }
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<ResponseBody>) {
        self.body = body.into();
    }

    /// Takes the body out, leaving [`ResponseBody::Empty`] behind.
    pub fn take_body(&mut self) -> ResponseBody {
        std::mem::take(&mut self.body)
    }
}
