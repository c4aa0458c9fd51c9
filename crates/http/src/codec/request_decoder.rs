//! HTTP request decoder module
//!
//! This module provides functionality for decoding HTTP requests using a streaming approach.
//! Bytes may arrive in arbitrary fragments; the decoder keeps its progress in a
//! [`ParsePhase`] and emits a complete [`Request`] once the head and the
//! `Content-Length` body have been received.
//!
//! # Components
//!
//! - [`RequestDecoder`]: Main decoder that coordinates head and body parsing
//! - Head parsing: Uses [`HeaderDecoder`] for the request line and headers
//! - Message assembly: Uses [`RequestBuilder`] completion points
//!
//! # Example
//!
//! ```no_run
//! use nimble_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/");
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::RequestBuilder;
use crate::codec::header::{DEFAULT_MAX_HEADER_BYTES, HeaderDecoder};
use crate::ensure;
use crate::protocol::{ParseError, Request};

/// Default maximum size in bytes of a request body
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Progress of the message currently being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePhase {
    /// Nothing, or only part of the request line, has been received
    RequestLine,
    /// The request line is complete and header fields are being received
    Headers,
    /// The head is complete and body bytes are outstanding
    Body,
    /// The message is complete and waiting to be handed out
    Complete,
}

/// A decoder for HTTP requests that handles both the head and the body.
///
/// After a request has been emitted the decoder resets itself, so pipelined
/// requests left in the buffer are decoded by subsequent calls.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    builder: RequestBuilder,
    phase: ParsePhase,
    remaining: u64,
    max_body_bytes: u64,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` with the default size limits
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(max_header_bytes: usize, max_body_bytes: u64) -> Self {
        Self {
            header_decoder: HeaderDecoder::new(max_header_bytes),
            builder: RequestBuilder::new(),
            phase: ParsePhase::RequestLine,
            remaining: 0,
            max_body_bytes,
        }
    }

    pub fn phase(&self) -> ParsePhase {
        self.phase
    }

    /// Whether part of a message has already been consumed.
    pub fn in_progress(&self) -> bool {
        self.phase != ParsePhase::RequestLine
    }

    /// Discards any partially parsed message.
    pub fn reset(&mut self) {
        self.builder.reset();
        self.phase = ParsePhase::RequestLine;
        self.remaining = 0;
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_BODY_BYTES)
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request was decoded
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.phase {
                ParsePhase::RequestLine | ParsePhase::Headers => {
                    let Some(content_length) = self.header_decoder.decode(src, &mut self.builder)? else {
                        if self.phase == ParsePhase::RequestLine && src.contains(&b'\n') {
                            self.phase = ParsePhase::Headers;
                        }
                        return Ok(None);
                    };

                    ensure!(
                        content_length <= self.max_body_bytes,
                        ParseError::too_large_body(content_length, self.max_body_bytes)
                    );

                    trace!(content_length, "request head complete");
                    // bounded by max_body_bytes above
                    self.builder.reserve_body(content_length as usize);
                    self.remaining = content_length;
                    self.phase = ParsePhase::Body;
                }

                ParsePhase::Body => {
                    if self.remaining > 0 {
                        if src.is_empty() {
                            return Ok(None);
                        }
                        let available = src.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
                        let chunk = src.split_to(available);
                        self.builder.on_body(&chunk);
                        self.remaining -= available as u64;
                        if self.remaining > 0 {
                            return Ok(None);
                        }
                    }
                    self.phase = ParsePhase::Complete;
                }

                ParsePhase::Complete => {
                    let request = self.builder.on_message_complete()?;
                    self.reset();
                    return Ok(Some(request));
                }
            }
        }
    }

    /// A message cut short by the peer closing its side is dropped silently.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None => {
                if !src.is_empty() || self.in_progress() {
                    trace!(phase = ?self.phase, remaining = src.len(), "connection closed mid-message");
                }
                Ok(None)
            }
        }
    }
}
