//! Core HTTP protocol abstractions.
//!
//! This module provides the value types exchanged between the wire layer and
//! request handlers, along with the error taxonomy of the protocol layer.
//!
//! # Architecture
//!
//! - **Request Processing** ([`request`]): the fully received request
//!   - [`Request`]: method, decoded path, headers, body, lazily parsed query and body
//!   - [`PathParams`]: parameters bound by the router
//!
//! - **Response Processing** ([`response`]): the outgoing response
//!   - [`Response`]: status, headers, content type and a deferred body
//!
//! - **Bodies** ([`body`]):
//!   - [`ParsedBody`]: a request body interpreted per `Content-Type`
//!   - [`ResponseBody`]: text, json or binary response payloads
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Request parsing errors
//!   - [`SendError`]: Response sending errors

mod body;
pub use body::ParsedBody;
pub use body::ResponseBody;

mod params;
pub use params::PathParams;

mod request;
pub use request::Request;

mod response;
pub use response::InvalidStatus;
pub use response::Response;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
