use std::time::Duration;

use nimble_http::codec::DEFAULT_MAX_BODY_BYTES;
use nimble_http::codec::header::DEFAULT_MAX_HEADER_BYTES;
use nimble_http::connection::ConnectionConfig;
use serde::{Deserialize, Deserializer};

use crate::error::ServerError;
use crate::handler::DEFAULT_WORKERS;

/// Settings of a [`Server`](super::Server).
///
/// Loadable from any serde source; missing keys take their default and
/// durations are given in seconds:
///
/// ```
/// use nimble_web::server::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(r#"{"port": 9000, "keep_alive_timeout": 1.5}"#).unwrap();
/// assert_eq!(config.port, 9000);
/// assert_eq!(config.keep_alive_timeout.as_millis(), 1500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections served at once; further accepted connections wait for a slot
    pub max_connections: Option<usize>,
    /// Synchronous handlers running at once
    pub sync_workers: usize,
    #[serde(deserialize_with = "seconds")]
    pub read_timeout: Duration,
    #[serde(deserialize_with = "seconds")]
    pub keep_alive_timeout: Duration,
    pub read_buffer_size: usize,
    pub max_header_bytes: usize,
    pub max_body_bytes: u64,
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl Default for ServerConfig {
    fn default() -> Self {
        let connection = ConnectionConfig::default();
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            max_connections: None,
            sync_workers: DEFAULT_WORKERS,
            read_timeout: connection.read_timeout,
            keep_alive_timeout: connection.keep_alive_timeout,
            read_buffer_size: connection.read_buffer_size,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] for an empty host or any zero limit or timeout.
    pub fn validate(&self) -> Result<(), ServerError> {
        let zero = [
            ("sync_workers", self.sync_workers == 0),
            ("max_connections", self.max_connections == Some(0)),
            ("read_timeout", self.read_timeout.is_zero()),
            ("keep_alive_timeout", self.keep_alive_timeout.is_zero()),
            ("read_buffer_size", self.read_buffer_size == 0),
            ("max_header_bytes", self.max_header_bytes == 0),
        ];

        if self.host.trim().is_empty() {
            return Err(ServerError::invalid_config("host must not be empty"));
        }
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ServerError::invalid_config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            read_timeout: self.read_timeout,
            keep_alive_timeout: self.keep_alive_timeout,
            read_buffer_size: self.read_buffer_size,
            max_header_bytes: self.max_header_bytes,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
