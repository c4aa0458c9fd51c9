//! Body representations for both directions of an exchange.
//!
//! - [`ParsedBody`]: a request body interpreted according to its `Content-Type`
//! - [`ResponseBody`]: a response body kept in its original shape until the
//!   response encoder serializes it onto the wire

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;

/// A request body interpreted according to the request `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(HashMap<String, String>),
    /// any other content type, decoded as (lossy) UTF-8 text
    Text(String),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&HashMap<String, String>> {
        match self {
            ParsedBody::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The body of a [`Response`](crate::protocol::Response).
///
/// The variant decides the inferred content type, and serialization is deferred
/// to the encoder so that helpers can build a response and callers may still
/// mutate it afterwards without paying for an encoding pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Binary(Bytes),
}

impl ResponseBody {
    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseBody::Empty => true,
            ResponseBody::Text(text) => text.is_empty(),
            ResponseBody::Json(_) => false,
            ResponseBody::Binary(bytes) => bytes.is_empty(),
        }
    }

    /// The content type implied by the body variant.
    ///
    /// Text that looks like markup (starts with `<` and ends with `>` once
    /// trimmed) is served as html, any other text as plain text.
    pub fn inferred_content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Empty => None,
            ResponseBody::Json(_) => Some("application/json"),
            ResponseBody::Text(text) if looks_like_markup(text) => Some("text/html; charset=utf-8"),
            ResponseBody::Text(_) => Some("text/plain; charset=utf-8"),
            ResponseBody::Binary(_) => Some("application/octet-stream"),
        }
    }

    /// Serializes the body into the bytes written after the response head.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        match self {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            ResponseBody::Json(value) => serde_json::to_vec(value).map(Bytes::from),
            ResponseBody::Binary(bytes) => Ok(bytes.clone()),
        }
    }
}

fn looks_like_markup(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() > 1 && trimmed.starts_with('<') && trimmed.ends_with('>')
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        ResponseBody::Text(value)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        ResponseBody::Text(value.to_owned())
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        ResponseBody::Json(value)
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        ResponseBody::Binary(value)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        ResponseBody::Binary(Bytes::from(value))
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        ResponseBody::Empty
    }
}
