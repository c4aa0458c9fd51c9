//! Collaborators injected into every request.
//!
//! A server owns one [`Components`] value holding the application [`Logger`]
//! and the optional [`Orchestrator`] and [`TemplateEngine`]. It is shared with
//! each request through the request extensions, and handlers reach it with the
//! [`RequestExt`] methods:
//!
//! ```no_run
//! use nimble_web::components::{LogLevel, RequestExt};
//! use nimble_http::protocol::Request;
//! use serde_json::json;
//!
//! async fn profile(req: Request) -> nimble_web::handler::HandlerResult {
//!     req.log(LogLevel::Info, "rendering profile");
//!     Ok(req.render_template("profile.html", &json!({"name": "jane"}))?)
//! }
//! ```

mod logger;
mod orchestrator;
mod template;

pub use logger::{LogLevel, Logger, TracingLogger};
pub use orchestrator::{CronField, CronSpec, Orchestrator, OrchestratorError, Task, TaskHandle};
pub use template::{TemplateEngine, TemplateError};

pub(crate) use logger::log_guarded;

#[cfg(test)]
pub use logger::MockLogger;
#[cfg(test)]
pub use orchestrator::MockOrchestrator;
#[cfg(test)]
pub use template::MockTemplateEngine;

use std::fmt;
use std::sync::Arc;

use nimble_http::protocol::{Request, Response};
use serde_json::Value;

/// The collaborators of a server.
#[derive(Clone)]
pub struct Components {
    logger: Arc<dyn Logger>,
    orchestrator: Option<Arc<dyn Orchestrator>>,
    engine: Option<Arc<dyn TemplateEngine>>,
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("orchestrator", &self.orchestrator.is_some())
            .field("engine", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Components {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

impl Components {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger, orchestrator: None, engine: None }
    }

    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: Arc<dyn Orchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn orchestrator(&self) -> Option<&dyn Orchestrator> {
        self.orchestrator.as_deref()
    }

    pub fn engine(&self) -> Option<&dyn TemplateEngine> {
        self.engine.as_deref()
    }

    pub(crate) fn orchestrator_arc(&self) -> Option<Arc<dyn Orchestrator>> {
        self.orchestrator.as_ref().map(Arc::clone)
    }

    /// Logs through the application logger, never panicking.
    pub fn log(&self, level: LogLevel, message: &str) {
        log_guarded(self.logger(), level, message);
    }
}

/// Collaborator access for handlers and middlewares.
pub trait RequestExt {
    /// The server's collaborators, absent on a request not dispatched by a server.
    fn components(&self) -> Option<&Components>;

    /// Renders `name` with the configured engine as an html response.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NoEngine`] when the server has no engine, otherwise the engine's failure.
    fn render_template(&self, name: &str, context: &Value) -> Result<Response, TemplateError> {
        let engine = self.components().and_then(Components::engine).ok_or(TemplateError::NoEngine)?;
        let html = engine.render(name, context).map_err(|source| TemplateError::Render { name: name.to_owned(), source })?;
        Ok(Response::html(html))
    }

    /// Hands `task` to the orchestrator.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Unavailable`] when the server has no orchestrator,
    /// otherwise whatever the orchestrator reports.
    fn submit_task<F>(&self, task: F) -> Result<TaskHandle, OrchestratorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let orchestrator = self.components().and_then(Components::orchestrator).ok_or(OrchestratorError::Unavailable)?;
        orchestrator.submit(Box::new(task))
    }

    /// Logs through the application logger, or `tracing` when there is none.
    fn log(&self, level: LogLevel, message: &str) {
        match self.components() {
            Some(components) => components.log(level, message),
            None => TracingLogger.log(level, message),
        }
    }
}

impl RequestExt for Request {
    fn components(&self) -> Option<&Components> {
        self.extensions().get::<Arc<Components>>().map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use mockall::predicate::{always, eq};
    use nimble_http::protocol::ResponseBody;
    use serde_json::json;

    fn request_with(components: Components) -> Request {
        let mut req = Request::new(Method::GET, "/");
        req.extensions_mut().insert(Arc::new(components));
        req
    }

    #[test]
    fn render_template_as_html() {
        let mut engine = MockTemplateEngine::new();
        engine
            .expect_render()
            .with(eq("hello.html"), eq(json!({"name": "jane"})))
            .times(1)
            .returning(|_, ctx| Ok(format!("hello {}", ctx["name"].as_str().unwrap_or_default())));

        let req = request_with(Components::default().with_engine(Arc::new(engine)));
        let response = req.render_template("hello.html", &json!({"name": "jane"})).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &ResponseBody::Text("hello jane".into()));
        assert_eq!(response.resolved_content_type().unwrap(), "text/html; charset=utf-8");
    }

    #[test]
    fn render_template_without_engine() {
        let req = request_with(Components::default());
        assert!(matches!(req.render_template("x", &Value::Null), Err(TemplateError::NoEngine)));

        let bare = Request::new(Method::GET, "/");
        assert!(matches!(bare.render_template("x", &Value::Null), Err(TemplateError::NoEngine)));
    }

    #[test]
    fn render_failure_keeps_template_name() {
        let mut engine = MockTemplateEngine::new();
        engine.expect_render().with(eq("missing.html"), always()).returning(|_, _| Err("not found".into()));

        let req = request_with(Components::default().with_engine(Arc::new(engine)));
        let error = req.render_template("missing.html", &Value::Null).unwrap_err();
        assert_eq!(error.to_string(), "render template 'missing.html' error: not found");
    }

    #[test]
    fn submit_task_goes_to_orchestrator() {
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_submit().times(1).returning(|_| Ok(TaskHandle(9)));

        let req = request_with(Components::default().with_orchestrator(Arc::new(orchestrator)));
        assert_eq!(req.submit_task(|| {}).unwrap(), TaskHandle(9));
    }

    #[test]
    fn submit_task_without_orchestrator() {
        let req = request_with(Components::default());
        assert_eq!(req.submit_task(|| {}).unwrap_err(), OrchestratorError::Unavailable);
    }

    #[test]
    fn log_reaches_application_logger() {
        let mut logger = MockLogger::new();
        logger.expect_log().with(eq(LogLevel::Warning), eq("disk almost full")).times(1).return_const(());

        let req = request_with(Components::new(Arc::new(logger)));
        req.log(LogLevel::Warning, "disk almost full");
    }
}
