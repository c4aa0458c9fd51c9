//! The server: accept loop, connection tasks and the dispatch boundary.
//!
//! [`Server`] implements the protocol crate's [`Handler`], so every connection
//! task calls straight into [`Server::call`]. That is the dispatch boundary:
//! whatever happens below it, a response comes out.
//!
//! | condition                           | response                                    |
//! |-------------------------------------|---------------------------------------------|
//! | no route for the path               | `404 Not Found`                             |
//! | route without the method            | `405 Method Not Allowed` with `Allow`       |
//! | `OPTIONS` on a routed path          | `204 No Content` with `Allow`               |
//! | handler returns a [`HandlerError`]  | its status and message                      |
//! | handler fails otherwise, or panics  | `500 Internal Server Error`, detail logged  |

mod builder;
mod config;

pub use builder::ServerBuilder;
pub use config::ServerConfig;

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::future::{self, Future};
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use http::header::{ALLOW, DATE};
use http::{HeaderValue, Method, StatusCode};
use nimble_http::connection::HttpConnection;
use nimble_http::handler::{BoxError, Handler};
use nimble_http::protocol::{ParseError, Request, Response};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::components::{Components, LogLevel};
use crate::date::DateService;
use crate::error::{HandlerError, RouteError, ServerError};
use crate::router::Router;

/// Pause after a transient accept failure.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    router: Router,
    components: Arc<Components>,
    config: ServerConfig,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("components", &self.components)
            .field("config", &self.config)
            .finish()
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

fn allow_header(methods: &[Method]) -> Option<HeaderValue> {
    let joined = methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    HeaderValue::from_str(&joined).ok()
}

fn status_response(status: StatusCode) -> Response {
    HandlerError::from_status(status).to_response()
}

fn route_error_response(e: &RouteError) -> Response {
    let mut response = status_response(e.status_code());
    if let RouteError::MethodNotAllowed { allow } = e
        && let Some(value) = allow_header(allow)
    {
        response.set_header(ALLOW, value);
    }
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// Installs a `tracing` subscriber at `INFO` unless one is already set.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] if the address can't be bound, [`ServerError::Accept`]
    /// if accepting fails for good.
    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("a global tracing subscriber is already installed");
        }

        let address = self.config.address();
        let listener =
            TcpListener::bind(&address).await.map_err(|source| ServerError::Bind { address: address.clone(), source })?;
        info!(%address, "start listening");

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(cause = %e, "failed to listen for ctrl-c, serving until the process ends");
                future::pending::<()>().await;
            }
            info!("ctrl-c received, shutting down");
        })
        .await
    }

    /// Accepts connections from `listener` until `shutdown` completes.
    ///
    /// The orchestrator, if any, is started before the first accept and shut
    /// down after the last one.
    ///
    /// # Errors
    ///
    /// [`ServerError::Accept`] when accepting fails with a non transient error.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        for route in self.router.routes() {
            info!(%route, "route registered");
        }

        let orchestrator = self.components.orchestrator_arc();
        if let Some(orchestrator) = &orchestrator {
            let orchestrator = Arc::clone(orchestrator);
            if let Err(e) = tokio::task::spawn_blocking(move || orchestrator.start()).await {
                error!(cause = %e, "orchestrator failed to start");
            }
        }

        let gate = self.config.max_connections.map(|max| Arc::new(Semaphore::new(max)));
        let connection_config = self.config.connection_config();
        let server = Arc::new(self);
        let mut shutdown = std::pin::pin!(shutdown);

        let result = loop {
            let permit = match &gate {
                Some(gate) => tokio::select! {
                    permit = Arc::clone(gate).acquire_owned() => permit.ok(),
                    () = &mut shutdown => break Ok(()),
                },
                None => None,
            };

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                () = &mut shutdown => break Ok(()),
            };

            let (tcp_stream, remote_addr) = match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) if is_transient(&e) => {
                    warn!(cause = %e, "failed to accept, retrying");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
                Err(e) => {
                    error!(cause = %e, "failed to accept, stop serving");
                    break Err(ServerError::Accept { source: e });
                }
            };

            let handler = Arc::clone(&server);
            tokio::spawn(async move {
                let _permit = permit;
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::with_config(reader, writer, connection_config);
                match connection.process(handler).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => warn!(%remote_addr, cause = %e, "connection shutdown with error"),
                }
            });
        };

        if let Some(orchestrator) = orchestrator
            && let Err(e) = tokio::task::spawn_blocking(move || orchestrator.shutdown()).await
        {
            error!(cause = %e, "orchestrator failed to shut down");
        }
        info!("server stopped");
        result
    }

    async fn dispatch(&self, mut req: Request) -> Response {
        req.extensions_mut().insert(Arc::clone(&self.components));

        let method = req.method().clone();
        if method == Method::OPTIONS {
            return self.options(req.encoded_path());
        }

        // HEAD is served by the GET route; the connection drops the body
        let lookup = if method == Method::HEAD { Method::GET } else { method };
        let matched = match self.router.resolve(&lookup, req.encoded_path()) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(method = %req.method(), path = req.path(), cause = %e, "no route");
                self.components.log(LogLevel::Warning, &format!("{} {}: {e}", req.method(), req.path()));
                return route_error_response(&e);
            }
        };

        let (next, params) = matched.into_parts();
        req.set_path_params(params);
        let path = req.path().to_owned();

        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => self.error_response(&path, &e),
            Err(panic) => {
                let message = format!("handler for {path} panicked: {}", panic_message(panic.as_ref()));
                self.components.log(LogLevel::Critical, &message);
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn options(&self, path: &str) -> Response {
        match self.router.allowed_methods(path) {
            Some(allowed) => {
                let mut response = Response::empty(StatusCode::NO_CONTENT);
                if let Some(value) = allow_header(&allowed) {
                    response.set_header(ALLOW, value);
                }
                response
            }
            None => {
                self.components.log(LogLevel::Warning, &format!("OPTIONS {path}: {}", RouteError::NotFound));
                status_response(StatusCode::NOT_FOUND)
            }
        }
    }

    fn error_response(&self, path: &str, e: &BoxError) -> Response {
        if let Some(handler_error) = e.downcast_ref::<HandlerError>() {
            return handler_error.to_response();
        }

        self.components.log(LogLevel::Error, &format!("unhandled error on {path}: {e}"));
        status_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[async_trait]
impl Handler for Server {
    type Error = Infallible;

    async fn call(&self, req: Request) -> Result<Response, Self::Error> {
        let mut response = self.dispatch(req).await;
        if let Some(date) = DateService::get_global_instance().http_date() {
            response.set_header(DATE, date);
        }
        Ok(response)
    }

    fn on_parse_error(&self, error: &ParseError) {
        self.components.log(LogLevel::Warning, &format!("malformed request, answered {}: {error}", error.status_code()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MockLogger, MockOrchestrator, RequestExt, TaskHandle};
    use crate::handler::{async_handler, sync_handler};
    use crate::middleware::{Next, middleware_fn};
    use crate::router::{Routable, RouterBuilder};
    use mockall::predicate::{always, eq, str::contains};
    use nimble_http::protocol::ResponseBody;
    use serde_json::json;

    fn routes() -> RouterBuilder {
        let mut builder = Router::builder();
        builder.get("/hello", async_handler(|_req: Request| async { "hello" })).unwrap();
        builder
            .post("/users/:id", sync_handler(|req: Request| json!({"id": req.param("id"), "body": req.json::<serde_json::Value>().ok()})))
            .unwrap();
        builder
            .get(
                "/forbidden",
                async_handler(|_req: Request| async { Err::<String, _>(HandlerError::new(StatusCode::FORBIDDEN, "go away")) }),
            )
            .unwrap();
        builder
            .get("/broken", async_handler(|_req: Request| async { Err::<String, BoxError>("database is down".into()) }))
            .unwrap();
        builder.get("/panic", sync_handler(|_req: Request| -> &'static str { panic!("sync boom") })).unwrap();
        builder
    }

    fn server() -> Server {
        Server::builder().router(routes()).build().unwrap()
    }

    async fn call(server: &Server, req: Request) -> Response {
        server.call(req).await.unwrap()
    }

    #[tokio::test]
    async fn dispatch_to_route() {
        let response = call(&server(), Request::new(Method::GET, "/hello")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &ResponseBody::Text("hello".into()));
        assert!(response.headers().contains_key(DATE));
    }

    #[tokio::test]
    async fn dispatch_binds_params_and_body() {
        let req = Request::new(Method::POST, "/users/7")
            .with_header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"name":"jane"}"#);

        let response = call(&server(), req).await;
        assert_eq!(response.body(), &ResponseBody::Json(json!({"id": "7", "body": {"name": "jane"}})));
    }

    #[tokio::test]
    async fn not_found_and_method_not_allowed() {
        let server = server();

        let response = call(&server, Request::new(Method::GET, "/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = call(&server, Request::new(Method::DELETE, "/hello")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
    }

    #[tokio::test]
    async fn routing_failures_are_logged() {
        let mut logger = MockLogger::new();
        logger
            .expect_log()
            .with(eq(LogLevel::Warning), contains("GET /nope: no route"))
            .times(1)
            .return_const(());
        logger
            .expect_log()
            .with(eq(LogLevel::Warning), contains("DELETE /hello: method not allowed"))
            .times(1)
            .return_const(());
        logger.expect_log().with(eq(LogLevel::Warning), contains("OPTIONS /nope")).times(1).return_const(());
        let server = Server::builder().router(routes()).logger(logger).build().unwrap();

        assert_eq!(call(&server, Request::new(Method::GET, "/nope")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(call(&server, Request::new(Method::DELETE, "/hello")).await.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(call(&server, Request::new(Method::OPTIONS, "/nope")).await.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn parse_errors_are_logged() {
        let mut logger = MockLogger::new();
        logger
            .expect_log()
            .with(eq(LogLevel::Warning), contains("answered 400 Bad Request: invalid http method"))
            .times(1)
            .return_const(());
        let server = Server::builder().router(routes()).logger(logger).build().unwrap();

        server.on_parse_error(&ParseError::InvalidMethod);
    }

    #[tokio::test]
    async fn encoded_slash_stays_in_its_segment() {
        let mut builder = Router::builder();
        builder.get("/files/:name", async_handler(|req: Request| async move { req.param("name").unwrap_or_default().to_owned() })).unwrap();
        let server = Server::builder().router(builder).build().unwrap();

        let req = Request::new(Method::GET, "/files/a%2Fb");
        assert_eq!(req.path(), "/files/a/b");
        let response = call(&server, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &ResponseBody::Text("a/b".into()));

        let response = call(&server, Request::new(Method::GET, "/files/a/b")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn head_uses_get_route() {
        let response = call(&server(), Request::new(Method::HEAD, "/hello")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &ResponseBody::Text("hello".into()));
    }

    #[tokio::test]
    async fn options_lists_methods() {
        let server = server();

        let response = call(&server, Request::new(Method::OPTIONS, "/users/1")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "POST");

        let response = call(&server, Request::new(Method::OPTIONS, "/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_error_is_rendered_verbatim() {
        let response = call(&server(), Request::new(Method::GET, "/forbidden")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body(), &ResponseBody::Text("go away".into()));
    }

    #[tokio::test]
    async fn unexpected_error_is_hidden_and_logged() {
        let mut logger = MockLogger::new();
        logger
            .expect_log()
            .with(eq(LogLevel::Error), contains("database is down"))
            .times(1)
            .return_const(());
        let server = Server::builder().router(routes()).logger(logger).build().unwrap();

        let response = call(&server, Request::new(Method::GET, "/broken")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), &ResponseBody::Text("Internal Server Error".into()));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let mut logger = MockLogger::new();
        // the pool reports a panicking blocking handler as an error
        logger.expect_log().with(eq(LogLevel::Error), always()).times(1).return_const(());
        let server = Server::builder().router(routes()).logger(logger).build().unwrap();

        let response = call(&server, Request::new(Method::GET, "/panic")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn async_panic_is_contained() {
        let mut logger = MockLogger::new();
        logger.expect_log().with(eq(LogLevel::Critical), contains("async boom")).times(1).return_const(());

        let mut builder = Router::builder();
        builder
            .get("/", async_handler(|req: Request| async move { if req.path() == "/" { panic!("async boom") } "unreachable" }))
            .unwrap();
        let server = Server::builder().router(builder).logger(logger).build().unwrap();

        let response = call(&server, Request::new(Method::GET, "/")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn components_reach_handlers() {
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_submit().times(1).returning(|task| {
            task();
            Ok(TaskHandle(3))
        });

        let mut builder = Router::builder();
        builder
            .post(
                "/jobs",
                async_handler(|req: Request| async move {
                    let handle = req.submit_task(|| {})?;
                    Ok::<_, BoxError>((StatusCode::ACCEPTED, json!({"task": handle.0})))
                }),
            )
            .unwrap();
        let server = Server::builder().router(builder).orchestrator(orchestrator).build().unwrap();

        let response = call(&server, Request::new(Method::POST, "/jobs")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body(), &ResponseBody::Json(json!({"task": 3})));
    }

    #[tokio::test]
    async fn global_middleware_sees_dispatch() {
        let mut builder = routes();
        builder.wrap(middleware_fn(|req: Request, next: Next| async move {
            let mut response = next.run(req).await?;
            response.set_header(http::HeaderName::from_static("x-served-by"), HeaderValue::from_static("nimble"));
            Ok(response)
        }));
        let server = Server::builder().router(builder).build().unwrap();

        let response = call(&server, Request::new(Method::GET, "/hello")).await;
        assert_eq!(response.headers().get("x-served-by").unwrap(), "nimble");
    }
}
