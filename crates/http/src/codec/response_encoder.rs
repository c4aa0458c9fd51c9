//! HTTP response encoder.
//!
//! Serializes a complete [`Response`] into its wire form: status line,
//! headers, `Content-Length` and the body bytes.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::{HeaderEncoder, allows_content};
use crate::protocol::{Response, SendError};

/// Encoder for complete HTTP responses.
///
/// In head-only mode, used to answer `HEAD` requests, the encoder writes the
/// same head as for the full response, `Content-Length` included, but leaves
/// out the body bytes.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
    head_only: bool,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_head_only(&mut self, head_only: bool) {
        self.head_only = head_only;
    }

    pub fn is_head_only(&self) -> bool {
        self.head_only
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.body().to_bytes().map_err(SendError::invalid_body)?;
        let body = if allows_content(item.status()) { body } else { Bytes::new() };

        self.header_encoder.encode((&item, body.len()), dst)?;
        if !self.head_only {
            dst.extend_from_slice(&body);
        }
        Ok(())
    }
}

/// Serializes `response` into a standalone buffer.
///
/// # Errors
///
/// Fails if the body cannot be serialized.
pub fn encode_response(response: Response) -> Result<Bytes, SendError> {
    let mut dst = BytesMut::new();
    ResponseEncoder::new().encode(response, &mut dst)?;
    Ok(dst.freeze())
}
