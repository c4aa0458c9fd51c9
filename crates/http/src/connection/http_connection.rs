use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::header::CONNECTION;
use http::{HeaderValue, Method, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, trace, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::connection::{ConnectionConfig, ConnectionState};
use crate::handler::{BoxError, Handler};
use crate::protocol::{HttpError, ParseError, Request, Response};

const CONNECTION_CLOSE: HeaderValue = HeaderValue::from_static("close");
const CONNECTION_KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");

/// An HTTP connection that reads requests and writes responses in order
///
/// `HttpConnection` handles the full lifecycle of an HTTP/1.x connection, including:
/// - Reading and decoding requests, pipelined ones included
/// - Dispatching each request to the handler
/// - Keep-alive negotiation through the `Connection` header
/// - Read and keep-alive timeouts
/// - Error responses for requests that cannot be parsed
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
///
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    config: ConnectionConfig,
    state: ConnectionState,
    served: usize,
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("served", &self.served)
            .finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ConnectionConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: ConnectionConfig) -> Self {
        let decoder = RequestDecoder::with_limits(config.max_header_bytes, config.max_body_bytes);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, config.read_buffer_size),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            config,
            state: ConnectionState::AwaitingRequestLine,
            served: 0,
        }
    }

    /// Serves requests until the peer closes, a request asks to close, or an error occurs.
    ///
    /// # Errors
    ///
    /// Returns the parse, send or timeout error that ended the connection. A
    /// response has already been written for it whenever that was possible.
    pub async fn process<H: Handler>(mut self, handler: Arc<H>) -> Result<(), HttpError> {
        loop {
            let next = match self.next_request().await {
                Ok(next) => next,
                Err(timeout) => return self.on_timeout(timeout).await,
            };

            match next {
                Some(Ok(request)) => {
                    let keep_alive = self.dispatch(request, &handler).await?;
                    if !keep_alive {
                        debug!(served = self.served, "request asked to close, connection shutdown");
                        self.close().await;
                        return Ok(());
                    }
                }

                Some(Err(ParseError::Io { source })) => {
                    self.state = ConnectionState::Closed;
                    return Err(ParseError::io(source).into());
                }

                Some(Err(e)) => {
                    warn!(cause = %e, "can't parse request, connection shutdown");
                    handler.on_parse_error(&e);
                    self.send_final(error_response(e.status_code())).await?;
                    return Err(e.into());
                }

                None => {
                    trace!(served = self.served, "peer closed, connection shutdown");
                    self.state = ConnectionState::Closed;
                    return Ok(());
                }
            }
        }
    }

    /// Waits for the next request under the timeout matching the connection state.
    ///
    /// An idle connection that starts receiving a request while waiting moves
    /// on to the read timeout instead of failing the keep-alive deadline.
    async fn next_request(&mut self) -> Result<Option<Result<Request, ParseError>>, Duration> {
        loop {
            self.state = if self.served > 0 && !self.has_partial_request() {
                ConnectionState::AwaitingNextRequest
            } else {
                ConnectionState::reading(self.framed_read.decoder().phase())
            };

            let timeout = if self.state.is_idle() { self.config.keep_alive_timeout } else { self.config.read_timeout };

            match tokio::time::timeout(timeout, self.framed_read.next()).await {
                Ok(next) => return Ok(next),
                Err(_) if self.state.is_idle() && self.has_partial_request() => {
                    trace!("request started while idle, switch to read timeout");
                }
                Err(_) => return Err(timeout),
            }
        }
    }

    async fn on_timeout(&mut self, timeout: Duration) -> Result<(), HttpError> {
        if self.state.is_idle() {
            debug!(served = self.served, ?timeout, "keep-alive timeout, connection shutdown");
            self.close().await;
            return Ok(());
        }

        self.state = ConnectionState::reading(self.framed_read.decoder().phase());
        warn!(state = ?self.state, ?timeout, "request not received in time, connection shutdown");
        self.send_final(error_response(StatusCode::REQUEST_TIMEOUT)).await?;
        Err(HttpError::Timeout { timeout })
    }

    /// Runs the handler for one request and writes its response.
    ///
    /// Returns whether the connection stays open afterwards.
    async fn dispatch<H: Handler>(&mut self, request: Request, handler: &Arc<H>) -> Result<bool, HttpError> {
        self.state = ConnectionState::Dispatching;

        let keep_alive = request.keep_alive();
        let is_head = request.method() == Method::HEAD;

        let mut response = if request.method() == Method::CONNECT {
            debug!(uri = request.raw_path(), "CONNECT is not supported");
            error_response(StatusCode::NOT_IMPLEMENTED)
        } else {
            match handler.call(request).await {
                Ok(response) => response,
                Err(e) => {
                    let e: BoxError = e.into();
                    error!(cause = %e, "handle request error");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        };

        response.set_header(CONNECTION, if keep_alive { CONNECTION_KEEP_ALIVE } else { CONNECTION_CLOSE });

        self.framed_write.encoder_mut().set_head_only(is_head);
        self.framed_write.send(response).await?;
        self.served += 1;

        Ok(keep_alive)
    }

    /// Writes a last response carrying `Connection: close`, then closes.
    async fn send_final(&mut self, mut response: Response) -> Result<(), HttpError> {
        response.set_header(CONNECTION, CONNECTION_CLOSE);
        self.framed_write.encoder_mut().set_head_only(false);
        self.framed_write.send(response).await?;
        self.close().await;
        Ok(())
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Closed;
        if let Err(e) = self.framed_write.close().await {
            trace!(cause = %e, "shutdown write half failed");
        }
    }

    fn has_partial_request(&self) -> bool {
        self.framed_read.decoder().in_progress() || !self.framed_read.read_buffer().is_empty()
    }
}

fn error_response(status: StatusCode) -> Response {
    Response::error(status, None).unwrap_or_else(|_| Response::empty(status))
}
