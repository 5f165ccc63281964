//! Route groups: a prefix plus an accumulated middleware list.
//!
//! A group is a registration view over the router. Every forwarded
//! registration composes a fresh middleware list, so routes registered
//! earlier never observe middleware added to the group later, and nested
//! groups carry independent copies of their parent's list.
//!
//! Prefix joins are naive concatenation; `group("/api/")` followed by
//! `get("/users", …)` registers `/api//users`.

use std::sync::Arc;

use http::Method;

use crate::handler::{DynMiddleware, Handler, Middleware};
use crate::router::{RouteError, Router};

pub struct Group<'a> {
    prefix: String,
    middleware: Vec<DynMiddleware>,
    router: &'a mut Router,
}

impl<'a> Group<'a> {
    pub(crate) fn new(router: &'a mut Router, prefix: String, middleware: Vec<DynMiddleware>) -> Self {
        Group {
            prefix,
            middleware,
            router,
        }
    }

    /// Append middleware to this group. Only registrations made after this
    /// call see it.
    pub fn layer(&mut self, mw: impl Middleware + 'static) {
        self.middleware.push(Arc::new(mw));
    }

    /// A nested group. The child owns an independent copy of the parent's
    /// middleware list.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            prefix: format!("{}{}", self.prefix, prefix),
            middleware: self.middleware.clone(),
            router: &mut *self.router,
        }
    }

    /// Register under the group prefix with the group's middleware.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.handle_with(method, path, handler, Vec::new())
    }

    /// Register with extra route-local middleware appended after the
    /// group's own list.
    pub fn handle_with(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler + 'static,
        extra: Vec<DynMiddleware>,
    ) -> Result<(), RouteError> {
        let mut combined = self.middleware.clone();
        combined.extend(extra);
        let full_path = format!("{}{}", self.prefix, path);
        self.router
            .register(method, &full_path, Arc::new(handler), combined)
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
}
