use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::error::RouteError;
use crate::handler::{RouteHandler, WorkerPool};
use crate::middleware::{BoxMiddleware, Middleware, compose};

use super::node::Node;
use super::{Endpoint, Router};

/// Methods a route may be registered for.
const ROUTABLE_METHODS: [Method; 5] = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// A registered but not yet composed endpoint.
pub(crate) struct RouteSpec {
    handler: RouteHandler,
    middlewares: Vec<BoxMiddleware>,
}

/// Anything routes can be registered on: the router builder itself or one of its groups.
pub trait Routable {
    /// Registers `handler` at `path` for every method in `methods`.
    ///
    /// Methods are case insensitive; names outside GET, POST, PUT, DELETE and
    /// PATCH are dropped. A path segment `:name` binds a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRoute`] when no valid method remains or a
    /// parameter segment has no name.
    fn register<I, M>(
        &mut self,
        path: &str,
        methods: I,
        handler: RouteHandler,
        middlewares: Vec<BoxMiddleware>,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>;

    fn get(&mut self, path: &str, handler: RouteHandler) -> Result<&mut Self, RouteError> {
        self.register(path, ["GET"], handler, vec![])
    }

    fn post(&mut self, path: &str, handler: RouteHandler) -> Result<&mut Self, RouteError> {
        self.register(path, ["POST"], handler, vec![])
    }

    fn put(&mut self, path: &str, handler: RouteHandler) -> Result<&mut Self, RouteError> {
        self.register(path, ["PUT"], handler, vec![])
    }

    fn delete(&mut self, path: &str, handler: RouteHandler) -> Result<&mut Self, RouteError> {
        self.register(path, ["DELETE"], handler, vec![])
    }

    fn patch(&mut self, path: &str, handler: RouteHandler) -> Result<&mut Self, RouteError> {
        self.register(path, ["PATCH"], handler, vec![])
    }
}

fn routable_methods<I, M>(path: &str, methods: I) -> Result<Vec<Method>, RouteError>
where
    I: IntoIterator<Item = M>,
    M: AsRef<str>,
{
    let mut accepted = vec![];
    for name in methods {
        let upper = name.as_ref().to_ascii_uppercase();
        match ROUTABLE_METHODS.iter().find(|m| m.as_str() == upper) {
            Some(method) if !accepted.contains(method) => accepted.push(method.clone()),
            Some(_) => {}
            None => debug!(path, method = %upper, "ignoring unroutable method"),
        }
    }

    if accepted.is_empty() {
        return Err(RouteError::invalid_route(path, "no valid HTTP method"));
    }
    Ok(accepted)
}

/// Collects routes and middlewares until the router is frozen.
#[derive(Default)]
pub struct RouterBuilder {
    root: Node<RouteSpec>,
    global: Vec<BoxMiddleware>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("global_middlewares", &self.global.len()).finish_non_exhaustive()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware around every route, outside of the route's own middlewares.
    pub fn wrap(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.global.push(Arc::new(middleware));
        self
    }

    /// Opens a group of routes sharing the `base` prefix and `middlewares`.
    pub fn group(&mut self, base: &str, middlewares: Vec<BoxMiddleware>) -> RouterGroup<'_> {
        RouterGroup { builder: self, base: base.to_owned(), middlewares }
    }

    /// Composes every endpoint with its middlewares and returns the immutable router.
    ///
    /// Synchronous endpoints will run on `pool`.
    pub fn freeze(self, pool: &WorkerPool) -> Router {
        let RouterBuilder { root, global } = self;

        let root = root.map(&mut |_method, spec: RouteSpec| {
            let is_async = spec.handler.is_async();
            let chain: Vec<BoxMiddleware> = global.iter().map(Arc::clone).chain(spec.middlewares).collect();
            Endpoint { next: compose(&chain, spec.handler.into_next(pool)), is_async }
        });

        Router { root: Arc::new(root) }
    }

    /// Freezes the router with a default sized worker pool.
    pub fn build(self) -> Router {
        self.freeze(&WorkerPool::default())
    }
}

impl Routable for RouterBuilder {
    fn register<I, M>(
        &mut self,
        path: &str,
        methods: I,
        handler: RouteHandler,
        middlewares: Vec<BoxMiddleware>,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let methods = routable_methods(path, methods)?;
        let node = self.root.descend(path)?;
        for method in methods {
            debug!(%method, path, "registering route");
            node.insert(method, RouteSpec { handler: handler.clone(), middlewares: middlewares.clone() });
        }
        Ok(self)
    }
}

/// Routes registered under a common prefix with common middlewares.
///
/// Group middlewares run before the middlewares of the route itself.
pub struct RouterGroup<'a> {
    builder: &'a mut RouterBuilder,
    base: String,
    middlewares: Vec<BoxMiddleware>,
}

impl fmt::Debug for RouterGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterGroup").field("base", &self.base).finish_non_exhaustive()
    }
}

fn join(base: &str, sub: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), sub.trim_start_matches('/'))
}

impl RouterGroup<'_> {
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Opens a nested group below this one.
    pub fn group(&mut self, sub: &str, middlewares: Vec<BoxMiddleware>) -> RouterGroup<'_> {
        let mut combined = self.middlewares.clone();
        combined.extend(middlewares);
        RouterGroup { builder: &mut *self.builder, base: join(&self.base, sub), middlewares: combined }
    }
}

impl Routable for RouterGroup<'_> {
    fn register<I, M>(
        &mut self,
        path: &str,
        methods: I,
        handler: RouteHandler,
        middlewares: Vec<BoxMiddleware>,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let full_path = join(&self.base, path);
        let mut combined = self.middlewares.clone();
        combined.extend(middlewares);

        self.builder.register(&full_path, methods, handler, combined)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_normalized() {
        assert_eq!(routable_methods("/", ["get", "Post", "get"]).unwrap(), vec![Method::GET, Method::POST]);
        assert_eq!(routable_methods("/", ["TRACE", "patch"]).unwrap(), vec![Method::PATCH]);
    }

    #[test]
    fn no_valid_method_is_rejected() {
        let error = routable_methods("/x", ["HEAD", "OPTIONS"]).unwrap_err();
        assert_eq!(error, RouteError::invalid_route("/x", "no valid HTTP method"));
    }

    #[test]
    fn join_paths() {
        assert_eq!(join("/api/", "/users"), "/api/users");
        assert_eq!(join("/api", "users"), "/api/users");
        assert_eq!(join("/api", "/"), "/api/");
    }
}
