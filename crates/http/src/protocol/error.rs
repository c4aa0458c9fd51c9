use http::StatusCode;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("no complete request within {timeout:?}")]
    Timeout { timeout: Duration },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("body size too large, declared: {declared_size} exceed the limit {max_size}")]
    TooLargeBody { declared_size: u64, max_size: u64 },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri: {reason}")]
    InvalidUri { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-encoding: {value}")]
    UnsupportedTransferEncoding { value: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_large_body(declared_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { declared_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { value: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status code a client receives for this failure.
    ///
    /// Size limit violations map to `413 Payload Too Large`, transfer codings we
    /// cannot frame map to `501 Not Implemented`, everything else is a plain
    /// `400 Bad Request`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLargeHeader { .. } | Self::TooManyHeaders { .. } | Self::TooLargeBody { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::UnsupportedTransferEncoding { .. } => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_of_parse_errors() {
        assert_eq!(ParseError::too_large_header(9000, 8192).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::too_large_body(10, 5).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::too_many_headers(64).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::invalid_header("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ParseError::InvalidMethod.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ParseError::unsupported_transfer_encoding("chunked").status_code(), StatusCode::NOT_IMPLEMENTED);
    }
}
