use std::sync::Arc;
use std::time::Instant;

use http::{HeaderName, HeaderValue, StatusCode};
use nimble_http::handler::BoxError;
use nimble_http::protocol::{ParsedBody, Request};
use nimble_web::components::LogLevel;
use nimble_web::handler::{async_handler, sync_handler};
use nimble_web::middleware::BoxMiddleware;
use nimble_web::router::{Routable, Router};
use nimble_web::{HandlerError, Html, Json, Next, RequestExt, Server, middleware_fn};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    name: String,
    zip: String,
}

// curl -v http://127.0.0.1:8080/
fn index(_req: Request) -> Html<&'static str> {
    Html("<h1>nimble</h1>")
}

// curl -v http://127.0.0.1:8080/hello?name=world
async fn hello(req: Request) -> String {
    format!("hello, {}\r\n", req.query_param("name").unwrap_or("stranger"))
}

// curl -v -d "name=hello&zip=world" http://127.0.0.1:8080/api/users
// curl -v -H 'Content-Type: application/json' -d '{"name":"hello","zip":"world"}' http://127.0.0.1:8080/api/users
async fn create_user(req: Request) -> Result<(StatusCode, Json<User>), HandlerError> {
    let user = match req.parsed_body() {
        Some(ParsedBody::Json(_)) => req.json::<User>().map_err(|e| HandlerError::new(StatusCode::BAD_REQUEST, e.to_string()))?,
        Some(ParsedBody::Form(_)) => req.form::<User>().map_err(|e| HandlerError::new(StatusCode::BAD_REQUEST, e.to_string()))?,
        _ => return Err(HandlerError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expecting a json or form body")),
    };
    req.log(LogLevel::Info, &format!("created user {}", user.name));
    Ok((StatusCode::CREATED, Json(user)))
}

// curl -v -H 'Authorization: token' http://127.0.0.1:8080/api/users/42
async fn show_user(req: Request) -> Option<serde_json::Value> {
    let id: u32 = req.param("id")?.parse().ok()?;
    Some(json!({ "id": id, "name": format!("user-{id}") }))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let require_auth: BoxMiddleware = Arc::new(middleware_fn(|req: Request, next: Next| async move {
        if req.header("authorization").is_none() {
            return Ok(HandlerError::from_status(StatusCode::UNAUTHORIZED).to_response());
        }
        next.run(req).await
    }));

    let mut router = Router::builder();
    router.wrap(middleware_fn(|req: Request, next: Next| async move {
        let started = Instant::now();
        let mut response = next.run(req).await?;
        let elapsed = HeaderValue::from_str(&started.elapsed().as_micros().to_string())?;
        response.set_header(HeaderName::from_static("x-elapsed-micros"), elapsed);
        Ok(response)
    }));

    router.get("/", sync_handler(index))?;
    router.get("/hello", async_handler(hello))?;

    let mut api = router.group("/api", vec![]);
    api.post("/users", async_handler(create_user))?;
    api.register("/users/:id", ["GET"], async_handler(show_user), vec![require_auth])?;

    let server = Server::builder().router(router).host("127.0.0.1").port(8080).sync_workers(2).build()?;
    server.start().await?;
    Ok(())
}
