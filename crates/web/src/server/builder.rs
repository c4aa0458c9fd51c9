use std::fmt;
use std::sync::Arc;

use crate::components::{Components, LogLevel, Logger, Orchestrator, TemplateEngine, TracingLogger};
use crate::error::ServerError;
use crate::handler::WorkerPool;
use crate::router::RouterBuilder;

use super::{Server, ServerConfig};

pub struct ServerBuilder {
    router: Option<RouterBuilder>,
    logger: Option<Arc<dyn Logger>>,
    orchestrator: Option<Arc<dyn Orchestrator>>,
    engine: Option<Arc<dyn TemplateEngine>>,
    config: ServerConfig,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("router", &self.router).field("config", &self.config).finish_non_exhaustive()
    }
}

impl ServerBuilder {
    pub(super) fn new() -> Self {
        Self { router: None, logger: None, orchestrator: None, engine: None, config: ServerConfig::default() }
    }

    pub fn router(mut self, router: RouterBuilder) -> Self {
        self.router = Some(router);
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn orchestrator(mut self, orchestrator: impl Orchestrator + 'static) -> Self {
        self.orchestrator = Some(Arc::new(orchestrator));
        self
    }

    pub fn engine(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.config.max_connections = Some(max_connections);
        self
    }

    pub fn sync_workers(mut self, sync_workers: usize) -> Self {
        self.config.sync_workers = sync_workers;
        self
    }

    /// Replaces every setting at once; later `host`, `port`, etc. still apply on top.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the settings and freezes the router.
    ///
    /// # Errors
    ///
    /// [`ServerError::MissingRouter`] without a router, [`ServerError::InvalidConfig`]
    /// when [`ServerConfig::validate`] fails.
    pub fn build(self) -> Result<Server, ServerError> {
        let router = self.router.ok_or(ServerError::MissingRouter)?;
        self.config.validate()?;

        let logger = self.logger.unwrap_or_else(|| {
            let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
            logger.log(LogLevel::Info, "Logger missing, defaulting to tracing logger");
            logger
        });

        let mut components = Components::new(logger);
        if let Some(orchestrator) = self.orchestrator {
            components = components.with_orchestrator(orchestrator);
        }
        if let Some(engine) = self.engine {
            components = components.with_engine(engine);
        }

        let router = router.freeze(&WorkerPool::new(self.config.sync_workers));
        Ok(Server { router, components: Arc::new(components), config: self.config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::async_handler;
    use crate::router::{Routable, Router};
    use nimble_http::protocol::Request;

    fn router() -> RouterBuilder {
        let mut builder = Router::builder();
        builder.get("/", async_handler(|_req: Request| async { "ok" })).unwrap();
        builder
    }

    #[test]
    fn router_is_required() {
        assert!(matches!(Server::builder().build(), Err(ServerError::MissingRouter)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Server::builder().router(router()).sync_workers(0).build();
        assert!(matches!(result, Err(ServerError::InvalidConfig { .. })));
    }

    #[test]
    fn fluent_settings() {
        let server = Server::builder().router(router()).host("0.0.0.0").port(3000).max_connections(8).build().unwrap();
        assert_eq!(server.config().address(), "0.0.0.0:3000");
        assert_eq!(server.config().max_connections, Some(8));
        assert!(server.components().orchestrator().is_none());
    }
}
