use std::collections::HashMap;

use http::Method;
use nimble_http::protocol::PathParams;
use percent_encoding::percent_decode_str;
use tracing::warn;

use crate::error::RouteError;

/// A node of the routing trie.
///
/// Literal segments live in a map, parameters share a single dynamic branch.
/// Each node keeps its handlers per method, in registration order.
#[derive(Debug)]
pub(crate) struct Node<T> {
    literal: HashMap<String, Node<T>>,
    dynamic: Option<Box<Dynamic<T>>>,
    methods: Vec<(Method, T)>,
}

#[derive(Debug)]
struct Dynamic<T> {
    name: String,
    node: Node<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self { literal: HashMap::new(), dynamic: None, methods: vec![] }
    }
}

/// Non empty segments of a path, so `/a//b/` walks like `/a/b`.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl<T> Node<T> {
    /// Walks `path` down from this node, creating missing children.
    pub(crate) fn descend(&mut self, path: &str) -> Result<&mut Node<T>, RouteError> {
        let mut node = self;
        for segment in segments(path) {
            node = node.child_mut(segment, path)?;
        }
        Ok(node)
    }

    fn child_mut(&mut self, segment: &str, path: &str) -> Result<&mut Node<T>, RouteError> {
        let Some(name) = segment.strip_prefix(':') else {
            return Ok(self.literal.entry(segment.to_owned()).or_default());
        };

        if name.is_empty() {
            return Err(RouteError::invalid_route(path, "parameter segment without a name"));
        }

        let dynamic = self.dynamic.get_or_insert_with(|| Box::new(Dynamic { name: name.to_owned(), node: Node::default() }));
        if dynamic.name != name {
            warn!(path, existing = %dynamic.name, ignored = name, "parameter name differs from an earlier route, keeping the first one");
        }
        Ok(&mut dynamic.node)
    }

    /// Stores `value` for `method`, replacing an earlier registration.
    pub(crate) fn insert(&mut self, method: Method, value: T) {
        match self.methods.iter_mut().find(|(m, _)| *m == method) {
            Some((_, old)) => *old = value,
            None => self.methods.push((method, value)),
        }
    }

    /// Finds the node for the percent-encoded `path`, binding the dynamic
    /// segments on the way.
    ///
    /// Each segment is decoded after splitting. A literal child always wins
    /// over the dynamic branch; there is no backtracking once a literal child
    /// has been taken.
    pub(crate) fn lookup(&self, path: &str) -> Option<(&Node<T>, PathParams)> {
        let mut node = self;
        let mut params = PathParams::empty();

        for segment in segments(path) {
            let segment = percent_decode_str(segment).decode_utf8_lossy();
            node = match node.literal.get(segment.as_ref()) {
                Some(child) => child,
                None => {
                    let dynamic = node.dynamic.as_deref()?;
                    params.insert(dynamic.name.as_str(), segment);
                    &dynamic.node
                }
            };
        }

        Some((node, params))
    }

    pub(crate) fn get(&self, method: &Method) -> Option<&T> {
        self.methods.iter().find(|(m, _)| m == method).map(|(_, value)| value)
    }

    pub(crate) fn allowed(&self) -> Vec<Method> {
        self.methods.iter().map(|(m, _)| m.clone()).collect()
    }

    pub(crate) fn has_methods(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Converts every stored value, keeping the shape of the trie.
    pub(crate) fn map<U, F>(self, f: &mut F) -> Node<U>
    where
        F: FnMut(&Method, T) -> U,
    {
        let literal = self.literal.into_iter().map(|(segment, child)| (segment, child.map(f))).collect();
        let dynamic = self.dynamic.map(|dynamic| {
            let Dynamic { name, node } = *dynamic;
            Box::new(Dynamic { name, node: node.map(f) })
        });
        let methods = self.methods.into_iter().map(|(method, value)| {
            let value = f(&method, value);
            (method, value)
        });

        Node { literal, dynamic, methods: methods.collect() }
    }

    /// Collects `"METHOD /path"` for every registered route, sorted by path.
    pub(crate) fn walk(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() { "/" } else { prefix };
        out.extend(self.methods.iter().map(|(method, _)| format!("{method} {path}")));

        let mut literal: Vec<_> = self.literal.iter().collect();
        literal.sort_by(|a, b| a.0.cmp(b.0));
        for (segment, child) in literal {
            child.walk(&format!("{prefix}/{segment}"), out);
        }

        if let Some(dynamic) = &self.dynamic {
            dynamic.node.walk(&format!("{prefix}/:{}", dynamic.name), out);
        }
    }
}
