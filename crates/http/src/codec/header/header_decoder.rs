//! HTTP head decoder: request line and header fields.
//!
//! This module parses the head of an HTTP/1.x request with `httparse` and feeds
//! the result into a [`RequestBuilder`] through its completion points. It also
//! determines how many body bytes follow the head.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: configurable, 8KB by default
//! - Only HTTP/1.0 and HTTP/1.1 are accepted
//!
//! # Implementation Details
//!
//! The decoder works in multiple stages:
//!
//! 1. Parse raw bytes using `httparse`
//! 2. Record header name/value byte ranges
//! 3. Split the head off the buffer and hand every field to the builder
//! 4. Determine the body length from `Content-Length`
//!
//! Recording byte ranges instead of borrowing from the parser lets the header
//! values share the frozen head buffer instead of being copied one by one.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Version};
use httparse::{Error, Status};
use tracing::trace;

use crate::codec::RequestBuilder;
use crate::ensure;
use crate::protocol::ParseError;

/// Maximum number of headers allowed in a request
pub const MAX_HEADER_NUM: usize = 64;

/// Default maximum size in bytes allowed for the request line plus headers
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for the request line and headers.
#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder {
    max_header_bytes: usize,
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self { max_header_bytes: DEFAULT_MAX_HEADER_BYTES }
    }
}

impl HeaderDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }

    /// Attempts to decode a request head from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(content_length))` once the head is complete; the head has been
    ///   removed from `src` and delivered to `builder`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds `MAX_HEADER_NUM`
    /// - The head size exceeds the configured limit
    /// - The request line or a header is malformed
    /// - The HTTP version is not supported
    /// - The body framing headers are invalid or unsupported
    pub fn decode(&self, src: &mut BytesMut, builder: &mut RequestBuilder) -> Result<Option<u64>, ParseError> {
        let mut req = httparse::Request::new(&mut []);
        let mut headers = [const { MaybeUninit::<httparse::Header<'_>>::uninit() }; MAX_HEADER_NUM];

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            // Currently HTTP/2 and HTTP/3 not supported
            v => return Err(ParseError::InvalidVersion(v)),
        };
        let method = req
            .method
            .ok_or(ParseError::InvalidMethod)
            .and_then(|m| Method::from_bytes(m.as_bytes()).map_err(|_| ParseError::InvalidMethod))?;
        let target = req.path.ok_or_else(|| ParseError::invalid_uri("missing request target"))?;

        builder.on_url(target)?;

        let header_count = req.headers.len();
        let mut header_index = [HeaderIndex::EMPTY; MAX_HEADER_NUM];
        HeaderIndex::record(src, req.headers, &mut header_index);

        // Split header portion from source buffer
        let header_bytes = src.split_to(body_offset).freeze();

        let mut framing = BodyFraming::default();
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
                .map_err(|e| ParseError::invalid_header(e.to_string()))?;
            let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                .map_err(|e| ParseError::invalid_header(format!("{name}: {e}")))?;

            framing.observe(&name, &value)?;
            builder.on_header(name, value);
        }

        builder.on_headers_complete(method, version);

        framing.content_length().map(Some)
    }
}

/// Body framing information collected while walking the header fields.
#[derive(Debug, Default)]
struct BodyFraming {
    content_length: Option<u64>,
    transfer_encoding: Option<String>,
}

impl BodyFraming {
    fn observe(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), ParseError> {
        if name == http::header::TRANSFER_ENCODING {
            self.transfer_encoding = Some(String::from_utf8_lossy(value.as_bytes()).into_owned());
        } else if name == http::header::CONTENT_LENGTH {
            let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
            let digits = cl_str.trim();
            ensure!(
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
                ParseError::invalid_content_length(format!("value {cl_str} is not a decimal number"))
            );
            let length =
                digits.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            if let Some(previous) = self.content_length {
                ensure!(
                    previous == length,
                    ParseError::invalid_content_length(format!("conflicting values {previous} and {length}"))
                );
            }
            self.content_length = Some(length);
        }
        Ok(())
    }

    /// Only `Content-Length` framing is supported; any transfer coding is rejected.
    fn content_length(self) -> Result<u64, ParseError> {
        match (self.transfer_encoding, self.content_length) {
            (Some(te), _) => Err(ParseError::unsupported_transfer_encoding(te)),
            (None, Some(length)) => Ok(length),
            (None, None) => Ok(0),
        }
    }
}

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    /// Start and end byte positions of the header name
    name: (usize, usize),
    /// Start and end byte positions of the header value
    value: (usize, usize),
}

impl HeaderIndex {
    const EMPTY: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decode(str: &str) -> (Result<Option<u64>, ParseError>, RequestBuilder, BytesMut) {
        let mut buf = BytesMut::from(str.replace('\n', "\r\n").as_str());
        let mut builder = RequestBuilder::default();
        let result = HeaderDecoder::default().decode(&mut buf, &mut builder);
        (result, builder, buf)
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let (result, mut builder, buf) = decode(str);
        assert_eq!(result.unwrap(), Some(0));
        assert!(buf.is_empty());

        let request = builder.on_message_complete().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.path(), "/index.html");
        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.header("accept"), Some("*/*"));
        assert_eq!(request.header("host"), Some("127.0.0.1:8080"));
        assert_eq!(request.header("user-agent"), Some("curl/7.79.1"));
    }

    #[test]
    fn leaves_body_in_buffer() {
        let str = indoc! {r##"
        POST /submit HTTP/1.1
        Content-Length: 3

        123"##};

        let (result, _builder, buf) = decode(str);
        assert_eq!(result.unwrap(), Some(3));
        assert_eq!(&buf[..], b"123");
    }

    #[test]
    fn partial_head() {
        let (result, _builder, buf) = decode("GET /index.html HTTP/1.1\nHost: 127.0.0.1");
        assert_eq!(result.unwrap(), None);
        assert_eq!(buf.len(), "GET /index.html HTTP/1.1\r\nHost: 127.0.0.1".len());
    }

    #[test]
    fn reject_transfer_encoding() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Transfer-Encoding: chunked

        "##};

        let (result, _, _) = decode(str);
        assert!(matches!(result, Err(ParseError::UnsupportedTransferEncoding { .. })));
    }

    #[test]
    fn reject_conflicting_content_length() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: 3
        Content-Length: 4

        "##};

        let (result, _, _) = decode(str);
        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn reject_invalid_content_length() {
        let (result, _, _) = decode("POST / HTTP/1.1\nContent-Length: abc\n\n");
        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn reject_signed_content_length() {
        for value in ["+5", "-5", "5 5", ""] {
            let (result, _, _) = decode(&format!("POST / HTTP/1.1\nContent-Length: {value}\n\nhello"));
            assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })), "accepted {value:?}");
        }
    }

    #[test]
    fn reject_too_many_headers() {
        let mut str = String::from("GET / HTTP/1.1\n");
        for i in 0..=MAX_HEADER_NUM {
            str.push_str(&format!("X-Header-{i}: {i}\n"));
        }
        str.push('\n');

        let (result, _, _) = decode(&str);
        let e = result.unwrap_err();
        assert!(matches!(e, ParseError::TooManyHeaders { max_num: MAX_HEADER_NUM }));
        assert_eq!(e.status_code(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn reject_malformed_request_line() {
        let (result, _, _) = decode("GET\n\n");
        assert!(matches!(result, Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn reject_malformed_header() {
        let (result, _, _) = decode("GET / HTTP/1.1\nno colon here\n\n");
        assert!(result.is_err());
    }

    #[test]
    fn reject_oversized_head() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nX-Long: ");
        buf.extend_from_slice(&[b'a'; 200]);

        let mut builder = RequestBuilder::default();
        let result = HeaderDecoder::new(128).decode(&mut buf, &mut builder);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { max_size: 128, .. })));
    }

    #[test]
    fn http_10_version() {
        let (result, mut builder, _) = decode("GET / HTTP/1.0\n\n");
        assert_eq!(result.unwrap(), Some(0));
        assert_eq!(builder.on_message_complete().unwrap().version(), Version::HTTP_10);
    }
}
