//! sable facade crate.
//!
//! Re-exports the core, the HTTP ingress, and the standard middleware
//! behind a single entry point.

pub use sable_core as core;
pub use sable_http as http;
pub use sable_middleware as middleware;

pub use sable_core::{
    body, chain, handler_fn, middleware_fn, App, BindError, BoxFuture, Context, DynHandler,
    DynMiddleware, Handler, HandlerError, HandlerResult, Middleware, PeerAddr, Route, RouteError,
    Router, TrailingSlash,
};
pub use sable_http::{Ingress, SableService};

pub mod prelude {
    pub use sable_core::prelude::*;
    pub use sable_http::prelude::*;
}
