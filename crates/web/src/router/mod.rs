//! Request routing.
//!
//! Routes are collected by a [`RouterBuilder`] and frozen into a [`Router`]: a
//! trie keyed by path segment whose endpoints are already composed with their
//! middlewares. A frozen router is immutable and cheap to clone, so every
//! connection resolves against it concurrently without locking.
//!
//! # Example
//!
//! ```
//! use nimble_web::handler::async_handler;
//! use nimble_web::router::{Routable, Router};
//! use nimble_http::protocol::Request;
//! use http::Method;
//!
//! let mut builder = Router::builder();
//! builder.get("/users/:id", async_handler(|req: Request| async move {
//!     format!("user {}", req.param("id").unwrap_or_default())
//! })).unwrap();
//!
//! let router = builder.build();
//! let matched = router.resolve(&Method::GET, "/users/42").unwrap();
//! assert_eq!(matched.params().get("id"), Some("42"));
//! ```

mod builder;
mod node;

pub use builder::{Routable, RouterBuilder, RouterGroup};

use std::fmt;
use std::sync::Arc;

use http::Method;
use nimble_http::protocol::PathParams;

use crate::error::RouteError;
use crate::middleware::Next;
use node::Node;

/// A composed endpoint stored in a frozen trie.
#[derive(Debug)]
pub(crate) struct Endpoint {
    next: Next,
    is_async: bool,
}

/// Main router structure that resolves requests to composed handlers
#[derive(Clone)]
pub struct Router {
    root: Arc<Node<Endpoint>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes()).finish()
    }
}

/// A successful resolution: the handler chain and the parameters bound on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    handler: Next,
    is_async: bool,
    params: PathParams,
}

impl RouteMatch {
    /// The endpoint wrapped by all of its middlewares
    pub fn handler(&self) -> &Next {
        &self.handler
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_parts(self) -> (Next, PathParams) {
        (self.handler, self.params)
    }
}

impl Router {
    /// Creates a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves `method` and the percent-encoded `path` to a handler chain.
    ///
    /// # Errors
    ///
    /// - [`RouteError::NotFound`] if no node matches `path`, or the matching node has no handlers
    /// - [`RouteError::MethodNotAllowed`] if the node has handlers, but not for `method`
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        let (node, params) = self.root.lookup(path).ok_or(RouteError::NotFound)?;

        match node.get(method) {
            Some(endpoint) => Ok(RouteMatch { handler: endpoint.next.clone(), is_async: endpoint.is_async, params }),
            None if node.has_methods() => Err(RouteError::MethodNotAllowed { allow: node.allowed() }),
            None => Err(RouteError::NotFound),
        }
    }

    /// Methods registered for `path`, `None` when nothing is routed there.
    pub fn allowed_methods(&self, path: &str) -> Option<Vec<Method>> {
        self.root.lookup(path).map(|(node, _)| node.allowed()).filter(|allowed| !allowed.is_empty())
    }

    /// Every route as `"METHOD /path"`.
    pub fn routes(&self) -> Vec<String> {
        let mut routes = vec![];
        self.root.walk("", &mut routes);
        routes
    }
}
