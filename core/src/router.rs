//! # Route tree
//!
//! A radix-like tree over path segments. Three segment kinds exist:
//! static literals, `:name` parameters binding one segment, and `*name`
//! wildcards binding the joined remainder. Matching preference at every
//! level is static, then parameter, then wildcard, which makes the walk
//! deterministic without backtracking.
//!
//! The tree is built during single-threaded setup and read-only while
//! serving; see [`crate::app::App`] for the freeze discipline.

use std::collections::HashMap;

use http::Method;
use thiserror::Error;

use crate::group::Group;
use crate::handler::{DynHandler, DynMiddleware, Handler};

/// Registration-time faults. These are programming errors; callers are
/// expected to abort startup on them.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route conflict: param ':{attempted}' conflicts with existing param ':{existing}' in path '{path}'")]
    ParamConflict {
        existing: String,
        attempted: String,
        path: String,
    },
    #[error("route conflict: wildcard '*{attempted}' conflicts with existing wildcard '*{existing}' in path '{path}'")]
    WildcardConflict {
        existing: String,
        attempted: String,
        path: String,
    },
    #[error("wildcard '*{name}' must be the final segment of path '{path}'")]
    WildcardNotLast { name: String, path: String },
    #[error("empty parameter name in path '{path}'")]
    EmptyName { path: String },
}

/// How a request path's trailing slash is reconciled against the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingSlash {
    /// `/users` and `/users/` are the same route.
    #[default]
    Ignore,
    /// `/users/` answers 301 to `/users` when the trimmed path matches.
    Redirect,
    /// `/users/` never matches a route registered as `/users`.
    Strict,
}

/// A registered route, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
}

pub(crate) struct Endpoint {
    pub(crate) handler: DynHandler,
    pub(crate) middleware: Vec<DynMiddleware>,
}

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    wildcard: Option<(String, Box<Node>)>,
    handlers: HashMap<Method, Endpoint>,
}

/// Outcome of a tree walk plus trailing-slash policy.
pub(crate) enum Resolution<'r> {
    Route(&'r Endpoint),
    MethodNotAllowed(Vec<Method>),
    Redirect(String),
    NotFound,
}

enum Found<'r> {
    Endpoint(&'r Endpoint),
    MethodMiss(Vec<Method>),
    Nothing,
}

pub struct Router {
    root: Node,
    pub(crate) middleware: Vec<DynMiddleware>,
    pub(crate) not_found: DynHandler,
    trailing_slash: TrailingSlash,
}

/// The stock 404 handler.
struct DefaultNotFound;

#[async_trait::async_trait]
impl Handler for DefaultNotFound {
    async fn call(&self, ctx: &mut crate::context::Context) -> crate::handler::HandlerResult {
        ctx.text(http::StatusCode::NOT_FOUND, "Not Found")
    }
}

impl Router {
    pub fn new() -> Self {
        Router {
            root: Node::default(),
            middleware: Vec::new(),
            not_found: std::sync::Arc::new(DefaultNotFound),
            trailing_slash: TrailingSlash::default(),
        }
    }

    /// Append global middleware, outermost first in declaration order.
    pub fn layer(&mut self, mw: impl crate::handler::Middleware + 'static) {
        self.middleware.push(std::sync::Arc::new(mw));
    }

    /// Replace the 404 handler.
    pub fn not_found(&mut self, h: impl Handler + 'static) {
        self.not_found = std::sync::Arc::new(h);
    }

    pub fn set_trailing_slash(&mut self, mode: TrailingSlash) {
        self.trailing_slash = mode;
    }

    /// Register `handler` under `(method, path)`.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.handle_with(method, path, handler, Vec::new())
    }

    /// Register with route-local middleware, applied inside the global set.
    pub fn handle_with(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler + 'static,
        middleware: Vec<DynMiddleware>,
    ) -> Result<(), RouteError> {
        self.register(method, path, std::sync::Arc::new(handler), middleware)
    }

    pub fn get(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::GET, path, h)
    }

    pub fn post(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::POST, path, h)
    }

    pub fn put(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::PUT, path, h)
    }

    pub fn delete(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::DELETE, path, h)
    }

    pub fn patch(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::PATCH, path, h)
    }

    pub fn head(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::HEAD, path, h)
    }

    pub fn options(&mut self, path: &str, h: impl Handler + 'static) -> Result<(), RouteError> {
        self.handle(Method::OPTIONS, path, h)
    }

    /// A registration view rooted at `prefix`.
    pub fn group(&mut self, prefix: impl Into<String>) -> Group<'_> {
        Group::new(self, prefix.into(), Vec::new())
    }

    /// A registration view rooted at `prefix`, carrying middleware.
    pub fn group_with(&mut self, prefix: impl Into<String>, mw: Vec<DynMiddleware>) -> Group<'_> {
        Group::new(self, prefix.into(), mw)
    }

    pub(crate) fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: DynHandler,
        middleware: Vec<DynMiddleware>,
    ) -> Result<(), RouteError> {
        let segments = split_path(path);
        let last = segments.len().saturating_sub(1);
        let mut current = &mut self.root;

        for (i, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix('*') {
                if name.is_empty() {
                    return Err(RouteError::EmptyName { path: path.to_string() });
                }
                if i != last {
                    return Err(RouteError::WildcardNotLast {
                        name: name.to_string(),
                        path: path.to_string(),
                    });
                }
                if let Some((existing, _)) = &current.wildcard {
                    if existing != name {
                        return Err(RouteError::WildcardConflict {
                            existing: existing.clone(),
                            attempted: name.to_string(),
                            path: path.to_string(),
                        });
                    }
                }
                let (_, node) = current
                    .wildcard
                    .get_or_insert_with(|| (name.to_string(), Box::new(Node::default())));
                current = &mut **node;
            } else if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteError::EmptyName { path: path.to_string() });
                }
                if let Some((existing, _)) = &current.param {
                    if existing != name {
                        return Err(RouteError::ParamConflict {
                            existing: existing.clone(),
                            attempted: name.to_string(),
                            path: path.to_string(),
                        });
                    }
                }
                let (_, node) = current
                    .param
                    .get_or_insert_with(|| (name.to_string(), Box::new(Node::default())));
                current = &mut **node;
            } else {
                current = current
                    .children
                    .entry((*segment).to_string())
                    .or_default();
            }
        }

        // Method-level last write wins.
        current.handlers.insert(method, Endpoint { handler, middleware });
        Ok(())
    }

    /// Walk the tree for `path`, binding parameters into `params`.
    fn lookup<'r>(
        &'r self,
        method: &Method,
        path: &str,
        params: &mut HashMap<String, String>,
    ) -> Found<'r> {
        let segments = split_path(path);
        let mut current = &self.root;

        let mut i = 0;
        while i < segments.len() {
            let segment = segments[i];
            if let Some(child) = current.children.get(segment) {
                current = child;
                i += 1;
            } else if let Some((name, node)) = &current.param {
                params.insert(name.clone(), segment.to_string());
                current = &**node;
                i += 1;
            } else if let Some((name, node)) = &current.wildcard {
                params.insert(name.clone(), segments[i..].join("/"));
                current = &**node;
                break;
            } else {
                return Found::Nothing;
            }
        }

        if let Some(endpoint) = current.handlers.get(method) {
            return Found::Endpoint(endpoint);
        }

        // A wildcard child also covers the empty remainder.
        if let Some((name, node)) = &current.wildcard {
            params.insert(name.clone(), String::new());
            if let Some(endpoint) = node.handlers.get(method) {
                return Found::Endpoint(endpoint);
            }
            if !node.handlers.is_empty() {
                return Found::MethodMiss(sorted_methods(&node.handlers));
            }
        }

        if !current.handlers.is_empty() {
            return Found::MethodMiss(sorted_methods(&current.handlers));
        }

        Found::Nothing
    }

    /// Lookup under the configured trailing-slash policy.
    pub(crate) fn resolve<'r>(
        &'r self,
        method: &Method,
        path: &str,
        params: &mut HashMap<String, String>,
    ) -> Resolution<'r> {
        let has_trailing = path.len() > 1 && path.ends_with('/');

        if self.trailing_slash == TrailingSlash::Strict && has_trailing {
            return Resolution::NotFound;
        }

        let redirecting = self.trailing_slash == TrailingSlash::Redirect && has_trailing;
        match self.lookup(method, path, params) {
            Found::Endpoint(endpoint) => {
                if redirecting {
                    Resolution::Redirect(trim_trailing(path))
                } else {
                    Resolution::Route(endpoint)
                }
            }
            Found::MethodMiss(allowed) => {
                if redirecting {
                    Resolution::Redirect(trim_trailing(path))
                } else {
                    Resolution::MethodNotAllowed(allowed)
                }
            }
            Found::Nothing => Resolution::NotFound,
        }
    }

    /// All registered `(method, path)` tuples, via an explicit work list.
    pub fn routes(&self) -> Vec<Route> {
        let mut out = Vec::new();
        let mut stack: Vec<(&Node, String)> = vec![(&self.root, String::new())];

        while let Some((node, path)) = stack.pop() {
            for method in node.handlers.keys() {
                let rendered = if path.is_empty() { "/".to_string() } else { path.clone() };
                out.push(Route {
                    method: method.clone(),
                    path: rendered,
                });
            }
            for (segment, child) in &node.children {
                stack.push((child, format!("{path}/{segment}")));
            }
            if let Some((name, child)) = &node.param {
                stack.push((&**child, format!("{path}/:{name}")));
            }
            if let Some((name, child)) = &node.wildcard {
                stack.push((&**child, format!("{path}/*{name}")));
            }
        }

        out
    }
}

/// Strip one leading and one trailing `/`, then split. The empty path is
/// the root and yields no segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').collect()
}

fn trim_trailing(path: &str) -> String {
    path.strip_suffix('/').unwrap_or(path).to_string()
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_methods(handlers: &HashMap<Method, Endpoint>) -> Vec<Method> {
    let mut methods: Vec<Method> = handlers.keys().cloned().collect();
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods
}
