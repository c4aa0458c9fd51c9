use nimble_http::handler::BoxError;
use serde_json::Value;
use thiserror::Error;

/// Renders named templates against a JSON context.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEngine: Send + Sync {
    /// # Errors
    ///
    /// Whatever the engine reports: unknown template, bad context, etc.
    fn render(&self, name: &str, context: &Value) -> Result<String, BoxError>;
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("no template engine configured")]
    NoEngine,

    #[error("render template '{name}' error: {source}")]
    Render { name: String, source: BoxError },
}
