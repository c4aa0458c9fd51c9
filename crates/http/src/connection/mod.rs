//! HTTP connection handling module
//!
//! This module drives a single client connection: it reads requests, hands
//! them to a [`Handler`](crate::handler::Handler) and writes the responses
//! back in request order.
//!
//! # Components
//!
//! - [`HttpConnection`]: Main connection handler that:
//!   - Manages the lifecycle of HTTP connections
//!   - Processes pipelined requests in order
//!   - Supports keep-alive connections
//!   - Enforces read and keep-alive timeouts
//! - [`ConnectionConfig`]: limits and timeouts of a connection
//! - [`ConnectionState`]: where a connection currently is in its lifecycle
//!
//! # Error responses
//!
//! | condition                                   | response                         |
//! |---------------------------------------------|----------------------------------|
//! | malformed request                           | `400`, then close                |
//! | head or body over the configured limit      | `413`, then close                |
//! | `Transfer-Encoding` present, `CONNECT`      | `501`                            |
//! | request incomplete at read timeout          | `408`, then close                |
//! | idle keep-alive timeout, peer closed        | close without a response         |
//! | handler error                               | `500`                            |

mod config;
mod http_connection;
mod state;

pub use config::ConnectionConfig;
pub use http_connection::HttpConnection;
pub use state::ConnectionState;
