//! The request value handed to handlers.
//!
//! A [`Request`] is materialized once per completed parse cycle by the
//! [`RequestDecoder`](crate::codec::RequestDecoder). It owns everything the
//! handler may need: the decoded path, the headers, the raw body and two
//! lazily computed views over them (query parameters and the parsed body).

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_TYPE};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Version};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::protocol::{ParsedBody, PathParams};

/// A fully received HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    target: String,
    path: String,
    query: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
    metadata: HashMap<String, Value>,
    extensions: Extensions,
    parsed_query: OnceLock<HashMap<String, String>>,
    parsed_body: OnceLock<Option<ParsedBody>>,
}

impl Request {
    /// Creates a bodyless HTTP/1.1 request for `target`.
    ///
    /// The target is split into path and query; the path is percent-decoded,
    /// the query is kept raw until [`query_params`](Self::query_params) is called.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let target = target.into();
        let (raw_path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target.as_str(), None),
        };
        let path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();

        Self {
            method,
            path,
            query,
            target,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: PathParams::empty(),
            metadata: HashMap::new(),
            extensions: Extensions::new(),
            parsed_query: OnceLock::new(),
            parsed_body: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.parsed_body = OnceLock::new();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The percent-decoded path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path as it appeared on the request line, still percent-encoded.
    ///
    /// Routing splits this on `/` before decoding, so an encoded `%2F` stays
    /// inside its segment.
    pub fn encoded_path(&self) -> &str {
        self.target.split_once('?').map_or(self.target.as_str(), |(path, _)| path)
    }

    /// The request target exactly as it appeared on the request line.
    pub fn raw_path(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn version_str(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the value of header `name` if it is present and valid visible ASCII.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers.get(name.as_ref()).and_then(|value| value.to_str().ok())
    }

    /// Inserts a header, replacing any previous value of the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The query parameters, parsed on first access.
    ///
    /// Repeated keys keep the last value; an unparsable query yields an empty map.
    pub fn query_params(&self) -> &HashMap<String, String> {
        self.parsed_query.get_or_init(|| match &self.query {
            Some(query) => serde_urlencoded::from_str::<Vec<(String, String)>>(query)
                .map(|pairs| pairs.into_iter().collect())
                .unwrap_or_else(|e| {
                    warn!(cause = %e, query = %query, "can't parse query string");
                    HashMap::new()
                }),
            None => HashMap::new(),
        })
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params().get(key).map(String::as_str)
    }

    /// The raw body bytes, `None` when the request carried no body.
    pub fn raw_body(&self) -> Option<&Bytes> {
        if self.body.is_empty() { None } else { Some(&self.body) }
    }

    /// The body interpreted according to `Content-Type`, parsed on first access.
    ///
    /// Returns `None` when there is no body, no content type, or the body could
    /// not be parsed as the declared type.
    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.parsed_body.get_or_init(|| self.parse_body()).as_ref()
    }

    fn parse_body(&self) -> Option<ParsedBody> {
        if self.body.is_empty() {
            return None;
        }

        let content_type = self.header(CONTENT_TYPE)?;
        let essence = content_type.split(';').next().unwrap_or_default().trim();

        let parsed = match essence.parse::<mime::Mime>() {
            Ok(m) if m.type_() == mime::APPLICATION && m.subtype() == mime::JSON => {
                serde_json::from_slice(&self.body).map(ParsedBody::Json).map_err(|e| e.to_string())
            }
            Ok(m) if m.type_() == mime::APPLICATION && m.subtype() == mime::WWW_FORM_URLENCODED => {
                serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
                    .map(|pairs| ParsedBody::Form(pairs.into_iter().collect()))
                    .map_err(|e| e.to_string())
            }
            _ => Ok(ParsedBody::Text(String::from_utf8_lossy(&self.body).into_owned())),
        };

        parsed
            .map_err(|reason| warn!(content_type = %content_type, cause = %reason, "can't parse request body"))
            .ok()
    }

    /// Deserializes a JSON body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Deserializes a url-encoded form body into `T`.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_bytes(&self.body)
    }

    /// Returns the path parameter bound to `name` by the router.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn set_path_params(&mut self, params: PathParams) {
        self.path_params = params;
    }

    /// Attaches an annotation visible to every later middleware and the handler.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Whether the client allows the connection to stay open after this exchange.
    ///
    /// An explicit `Connection: close` or `Connection: keep-alive` token wins;
    /// otherwise HTTP/1.1 defaults to keep-alive and HTTP/1.0 to close.
    pub fn keep_alive(&self) -> bool {
        let tokens = self
            .headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim);

        let mut keep_alive = None;
        for token in tokens {
            if token.eq_ignore_ascii_case("close") {
                return false;
            }
            if token.eq_ignore_ascii_case("keep-alive") {
                keep_alive = Some(true);
            }
        }

        keep_alive.unwrap_or(self.version >= Version::HTTP_11)
    }
}
