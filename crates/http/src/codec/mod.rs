//! HTTP codec module for encoding and decoding HTTP messages
//!
//! This module provides functionality for streaming HTTP message processing,
//! including request decoding and response encoding.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestDecoder`]: Decodes incoming HTTP requests, tracking a [`ParsePhase`]
//!   - [`RequestBuilder`]: Assembles a request from parser completion points
//!   - Head parsing via the [`header`] module
//!
//! - Response handling:
//!   - [`ResponseEncoder`]: Encodes outgoing HTTP responses
//!   - [`encode_response`]: one-shot serialization of a response
//!
//! # Example
//!
//! ```
//! use nimble_http::codec::{RequestDecoder, ResponseEncoder};
//! use nimble_http::protocol::Response;
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! // Decode incoming request
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::from("GET /hello HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut request_buffer).unwrap().unwrap();
//!
//! // Encode outgoing response
//! let mut encoder = ResponseEncoder::new();
//! let mut response_buffer = BytesMut::new();
//! encoder.encode(Response::text(request.path().to_owned()), &mut response_buffer).unwrap();
//! assert!(response_buffer.ends_with(b"/hello"));
//! ```

pub mod header;
mod request_builder;
mod request_decoder;
mod response_encoder;

pub use request_builder::RequestBuilder;
pub use request_decoder::{DEFAULT_MAX_BODY_BYTES, ParsePhase, RequestDecoder};
pub use response_encoder::{ResponseEncoder, encode_response};
