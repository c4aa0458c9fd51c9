//! HTTP header processing module for encoding and decoding heads
//!
//! # Components
//!
//! - [`HeaderDecoder`]: Decodes the request line and header fields from raw bytes
//!   - Header field validation
//!   - Head size limit enforcement
//!   - `Content-Length` framing, rejection of transfer codings
//!
//! - [`HeaderEncoder`]: Encodes a response status line and header fields
//!   - Content type resolution
//!   - `Content-Length` computed from the serialized body

mod header_decoder;
mod header_encoder;

pub use header_decoder::{DEFAULT_MAX_HEADER_BYTES, HeaderDecoder, MAX_HEADER_NUM};
pub(crate) use header_encoder::allows_content;
pub use header_encoder::HeaderEncoder;
