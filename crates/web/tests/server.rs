use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use http::StatusCode;
use indoc::indoc;
use nimble_http::protocol::Request;
use nimble_web::components::{CronSpec, Orchestrator, OrchestratorError, Task, TaskHandle};
use nimble_web::handler::{async_handler, sync_handler};
use nimble_web::router::{Routable, Router, RouterBuilder};
use nimble_web::server::ServerConfig;
use nimble_web::{HandlerError, Json, RequestExt, Server};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Default)]
struct InlineOrchestrator {
    started: AtomicBool,
    stopped: AtomicBool,
    next_id: AtomicU64,
}

impl Orchestrator for InlineOrchestrator {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn submit(&self, task: Task) -> Result<TaskHandle, OrchestratorError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(OrchestratorError::rejected("stopped"));
        }
        task();
        Ok(TaskHandle(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn schedule_cron(&self, _task: Task, _spec: CronSpec) -> Result<TaskHandle, OrchestratorError> {
        Ok(TaskHandle(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Shares the flags of an orchestrator owned by the server.
struct Shared(Arc<InlineOrchestrator>);

impl Orchestrator for Shared {
    fn start(&self) {
        self.0.start();
    }

    fn submit(&self, task: Task) -> Result<TaskHandle, OrchestratorError> {
        self.0.submit(task)
    }

    fn schedule_cron(&self, task: Task, spec: CronSpec) -> Result<TaskHandle, OrchestratorError> {
        self.0.schedule_cron(task, spec)
    }

    fn shutdown(&self) {
        self.0.shutdown();
    }
}

fn routes() -> RouterBuilder {
    let mut router = Router::builder();
    router.get("/hello", sync_handler(|_req: Request| "Hello World!")).unwrap();
    router
        .get("/users/:id", async_handler(|req: Request| async move { Json(json!({ "id": req.param("id") })) }))
        .unwrap();
    router
        .post(
            "/echo",
            async_handler(|req: Request| async move {
                let body = req.json::<serde_json::Value>().map_err(|e| HandlerError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
                Ok::<_, HandlerError>((StatusCode::CREATED, body))
            }),
        )
        .unwrap();
    router
        .post(
            "/jobs",
            async_handler(|req: Request| async move {
                let handle = req.submit_task(|| {})?;
                Ok::<_, OrchestratorError>(json!({ "task": handle.0 }))
            }),
        )
        .unwrap();
    router
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), nimble_web::ServerError>>,
}

async fn spawn(server: Server) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));
    Running { addr, stop, handle }
}

async fn exchange(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = vec![];
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn serves_plain_text() {
    let running = spawn(Server::builder().router(routes()).build().unwrap()).await;

    let response = exchange(running.addr, "GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-type: text/plain; charset=utf-8\r\n"));
    assert!(response.contains("content-length: 12\r\n"));
    assert!(response.contains("connection: close\r\n"));
    assert!(response.contains("date: "));
    assert!(response.ends_with("\r\n\r\nHello World!"));

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn serves_pipelined_requests_in_order() {
    let running = spawn(Server::builder().router(routes()).build().unwrap()).await;

    let raw = indoc! {"
        GET /users/1 HTTP/1.1\r
        Host: localhost\r
        \r
        POST /echo HTTP/1.1\r
        Content-Type: application/json\r
        Content-Length: 11\r
        \r
        {\"a\": true}GET /users/2 HTTP/1.1\r
        Connection: close\r
        \r
    "};
    let response = exchange(running.addr, raw).await;

    let first = response.find(r#"{"id":"1"}"#).unwrap();
    let second = response.find(r#"{"a":true}"#).unwrap();
    let third = response.find(r#"{"id":"2"}"#).unwrap();
    assert!(first < second && second < third);
    assert_eq!(response.matches("HTTP/1.1 ").count(), 3);
    assert!(response.contains("HTTP/1.1 201 Created\r\n"));
}

#[tokio::test]
async fn routing_errors() {
    let running = spawn(Server::builder().router(routes()).build().unwrap()).await;

    let response = exchange(running.addr, "GET /missing HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));

    let response = exchange(running.addr, "DELETE /hello HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(response.contains("allow: GET\r\n"));

    let response = exchange(running.addr, "OPTIONS /users/9 HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(response.contains("allow: GET\r\n"));
}

#[tokio::test]
async fn head_omits_body() {
    let running = spawn(Server::builder().router(routes()).build().unwrap()).await;

    let response = exchange(running.addr, "HEAD /hello HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-length: 12\r\n"));
    assert!(response.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn handler_error_and_malformed_request() {
    let running = spawn(Server::builder().router(routes()).build().unwrap()).await;

    let response = exchange(
        running.addr,
        "POST /echo HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 3\r\nConnection: close\r\n\r\n{{{",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    let response = exchange(running.addr, "NOT A REQUEST\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("connection: close\r\n"));
}

#[tokio::test]
async fn orchestrator_lifecycle() {
    let orchestrator = Arc::new(InlineOrchestrator::default());
    let server = Server::builder().router(routes()).orchestrator(Shared(Arc::clone(&orchestrator))).build().unwrap();
    let running = spawn(server).await;

    let response = exchange(running.addr, "POST /jobs HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.ends_with(r#"{"task":0}"#));
    assert!(orchestrator.started.load(Ordering::SeqCst));
    assert!(!orchestrator.stopped.load(Ordering::SeqCst));

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
    assert!(orchestrator.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn admission_gate_limits_connections() {
    let config = ServerConfig { max_connections: Some(1), keep_alive_timeout: Duration::from_secs(30), ..ServerConfig::default() };
    let running = spawn(Server::builder().router(routes()).config(config).build().unwrap()).await;

    let mut first = TcpStream::connect(running.addr).await.unwrap();
    first.write_all(b"GET /hello HTTP/1.1\r\n\r\n").await.unwrap();
    let mut buf = [0u8; 512];
    let n = first.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200 OK"));

    let mut second = TcpStream::connect(running.addr).await.unwrap();
    second.write_all(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut response = vec![];
    let waited = tokio::time::timeout(Duration::from_millis(200), second.read_to_end(&mut response)).await;
    assert!(waited.is_err(), "second connection must wait for a free slot");

    drop(first);
    tokio::time::timeout(Duration::from_secs(5), second.read_to_end(&mut response)).await.unwrap().unwrap();
    assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 200 OK"));
}
