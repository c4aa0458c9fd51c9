//! HTTP header encoder implementation for serializing HTTP response heads
//!
//! This module writes the status line, the header fields and the framing
//! headers of a [`Response`]. The response body is written separately by the
//! [`ResponseEncoder`](crate::codec::ResponseEncoder).
//!
//! # Features
//!
//! - Status line with the canonical reason phrase of the status code
//! - `Content-Type` resolved from the explicit value or the body shape
//! - `Content-Length` always computed from the serialized body

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{HeaderValue, StatusCode, header};
use tokio_util::codec::Encoder;

use crate::protocol::{Response, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
///
/// The item is the response together with the length of its serialized body.
/// User supplied `Content-Type` and `Content-Length` headers never reach the
/// wire directly; both are derived here so they always agree with the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl<'a> Encoder<(&'a Response, usize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes HTTP response head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if writing to buffer fails
    fn encode(&mut self, item: (&'a Response, usize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (response, content_length) = item;
        let status = response.status();

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;

        let has_content = allows_content(status);
        if let Some(content_type) = response.resolved_content_type().filter(|_| has_content) {
            put_header(dst, header::CONTENT_TYPE.as_ref(), &content_type);
        }

        for (header_name, header_value) in response.headers() {
            if header_name == header::CONTENT_LENGTH || header_name == header::CONTENT_TYPE {
                continue;
            }
            put_header(dst, header_name.as_ref(), header_value);
        }

        if has_content {
            put_header(dst, header::CONTENT_LENGTH.as_ref(), &HeaderValue::from(content_length));
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Informational and `204 No Content` responses never carry a body or its length.
pub(crate) fn allows_content(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT)
}

#[inline]
fn put_header(dst: &mut BytesMut, name: &[u8], value: &HeaderValue) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
