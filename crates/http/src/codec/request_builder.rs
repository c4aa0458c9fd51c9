//! Incremental construction of a [`Request`] from parser completion points.
//!
//! The decoders report what they observe through a fixed set of callbacks:
//!
//! - [`on_url`](RequestBuilder::on_url): the request target was read
//! - [`on_header`](RequestBuilder::on_header): one header field was read
//! - [`on_headers_complete`](RequestBuilder::on_headers_complete): method and version are known
//! - [`on_body`](RequestBuilder::on_body): a body fragment arrived
//! - [`on_message_complete`](RequestBuilder::on_message_complete): the message is finished
//!
//! The builder is reused across the requests of one connection; completing a
//! message hands out the request and leaves the builder empty.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::protocol::{ParseError, Request};

#[derive(Debug, Default)]
pub struct RequestBuilder {
    target: Option<String>,
    method: Option<Method>,
    version: Option<Version>,
    headers: HeaderMap,
    body: BytesMut,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the request target.
    ///
    /// Absolute-form targets are reduced to their path and query so that the
    /// request always carries an origin-form target.
    pub fn on_url(&mut self, target: &str) -> Result<(), ParseError> {
        let uri = target.parse::<Uri>().map_err(|e| ParseError::invalid_uri(format!("{target}: {e}")))?;
        let target = match uri.path_and_query() {
            Some(path_and_query) => path_and_query.as_str().to_owned(),
            None => target.to_owned(),
        };
        self.target = Some(target);
        Ok(())
    }

    /// Records a header field; a repeated name overwrites the previous value.
    pub fn on_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn on_headers_complete(&mut self, method: Method, version: Version) {
        self.method = Some(method);
        self.version = Some(version);
    }

    pub fn on_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Reserves room for a body of `size` bytes.
    pub fn reserve_body(&mut self, size: usize) {
        self.body.reserve(size);
    }

    /// Finishes the current message and resets the builder for the next one.
    ///
    /// # Errors
    ///
    /// Fails if the head of the message was never completed.
    pub fn on_message_complete(&mut self) -> Result<Request, ParseError> {
        let target = self.target.take().ok_or_else(|| ParseError::invalid_uri("missing request target"))?;
        let method = self.method.take().ok_or(ParseError::InvalidMethod)?;
        let version = self.version.take().unwrap_or(Version::HTTP_11);

        let request = Request::new(method, target)
            .with_version(version)
            .with_headers(std::mem::take(&mut self.headers))
            .with_body(self.body.split().freeze());
        Ok(request)
    }

    /// Drops any partially built message.
    pub fn reset(&mut self) {
        self.target = None;
        self.method = None;
        self.version = None;
        self.headers.clear();
        self.body.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_request_from_completion_points() {
        let mut builder = RequestBuilder::new();
        builder.on_url("/submit?draft=1").unwrap();
        builder.on_header(HeaderName::from_static("content-type"), HeaderValue::from_static("text/plain"));
        builder.on_headers_complete(Method::POST, Version::HTTP_11);
        builder.on_body(b"hello ");
        builder.on_body(b"world");

        let request = builder.on_message_complete().unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/submit");
        assert_eq!(request.query_param("draft"), Some("1"));
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.raw_body().unwrap().as_ref(), b"hello world");

        // builder is empty again
        assert!(builder.on_message_complete().is_err());
    }

    #[test]
    fn repeated_header_keeps_last_value() {
        let mut builder = RequestBuilder::new();
        builder.on_url("/").unwrap();
        builder.on_header(HeaderName::from_static("x-token"), HeaderValue::from_static("first"));
        builder.on_header(HeaderName::from_static("x-token"), HeaderValue::from_static("second"));
        builder.on_headers_complete(Method::GET, Version::HTTP_11);

        let request = builder.on_message_complete().unwrap();
        assert_eq!(request.header("x-token"), Some("second"));
    }

    #[test]
    fn absolute_form_target() {
        let mut builder = RequestBuilder::new();
        builder.on_url("http://example.com/users/7?full=true").unwrap();
        builder.on_headers_complete(Method::GET, Version::HTTP_11);

        let request = builder.on_message_complete().unwrap();
        assert_eq!(request.path(), "/users/7");
        assert_eq!(request.query_string(), Some("full=true"));
    }

    #[test]
    fn reset_discards_partial_message() {
        let mut builder = RequestBuilder::new();
        builder.on_url("/a").unwrap();
        builder.on_body(b"partial");
        builder.reset();

        builder.on_url("/b").unwrap();
        builder.on_headers_complete(Method::GET, Version::HTTP_10);
        let request = builder.on_message_complete().unwrap();
        assert_eq!(request.path(), "/b");
        assert!(request.raw_body().is_none());
    }
}
