//! # sable-core
//!
//! The routing and dispatch core of the sable web framework.
//!
//! An incoming request is matched against a radix-like route tree, path
//! parameters are extracted, the route's middleware is composed inside the
//! application's global middleware, and the resulting chain runs against a
//! pooled per-request [`Context`].
//!
//! This crate is protocol-plumbing free: it speaks `http` types only.
//! The hyper server loop lives in `sable-http`.

pub mod app;
pub mod body;
pub mod context;
pub mod group;
pub mod handler;
pub mod router;

mod pool;

pub use app::App;
pub use context::{BindError, Context, PeerAddr};
pub use handler::{
    chain, handler_fn, middleware_fn, BoxFuture, DynHandler, DynMiddleware, FnHandler,
    FnMiddleware, Handler, HandlerError, HandlerResult, Middleware,
};
pub use router::{Route, RouteError, Router, TrailingSlash};

pub mod prelude {
    pub use crate::app::App;
    pub use crate::context::Context;
    pub use crate::group::Group;
    pub use crate::handler::{handler_fn, BoxFuture, Handler, HandlerResult, Middleware};
    pub use crate::router::{RouteError, TrailingSlash};
    pub use http::{Method, StatusCode};
}
