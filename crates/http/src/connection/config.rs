use std::time::Duration;

use crate::codec::header::DEFAULT_MAX_HEADER_BYTES;
use crate::codec::DEFAULT_MAX_BODY_BYTES;

/// Per-connection limits and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Time allowed to receive a complete request once reading has started,
    /// and to receive the first request of a fresh connection
    pub read_timeout: Duration,
    /// Time an idle keep-alive connection may wait for its next request
    pub keep_alive_timeout: Duration,
    /// Initial capacity of the read buffer
    pub read_buffer_size: usize,
    /// Maximum size of the request line plus headers
    pub max_header_bytes: usize,
    /// Maximum declared `Content-Length`
    pub max_body_bytes: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(15),
            keep_alive_timeout: Duration::from_secs(5),
            read_buffer_size: 8 * 1024,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
