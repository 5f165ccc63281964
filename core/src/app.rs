//! # App: the per-request dispatcher
//!
//! [`App`] glues the pieces together: it acquires a [`Context`] from the
//! pool, resolves the request against the route tree under the configured
//! trailing-slash policy, composes route middleware inside the global
//! middleware, invokes the chain, routes a returned error through the
//! error handler, and recycles the context.
//!
//! Registration takes `&mut self`; dispatch takes `&self`. Freezing the
//! finished app behind an `Arc` is what makes the tree effectively
//! immutable while serving, so no lock guards the hot path.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use tracing::Instrument;

use crate::body::BoxBody;
use crate::context::Context;
use crate::handler::{chain, DynHandler, Handler, HandlerError, HandlerResult};
use crate::pool::ContextPool;
use crate::router::{Resolution, Router};

type ErrorHandler = Arc<dyn Fn(&mut Context, HandlerError) + Send + Sync>;
type LifecycleHook = Box<dyn Fn() + Send + Sync>;

/// Synthetic terminal for paths that exist under other methods.
struct MethodNotAllowed {
    allow: String,
}

#[async_trait]
impl Handler for MethodNotAllowed {
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        ctx.set_header(header::ALLOW, &self.allow);
        ctx.text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }
}

fn default_error_handler(ctx: &mut Context, err: HandlerError) {
    tracing::error!(error = %err, "handler error");
    if !ctx.written() {
        let _ = ctx.text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
}

pub struct App {
    router: Router,
    pool: ContextPool,
    on_error: ErrorHandler,
    on_start: Vec<LifecycleHook>,
    on_shutdown: Vec<LifecycleHook>,
}

impl App {
    pub fn new() -> Self {
        App {
            router: Router::new(),
            pool: ContextPool::new(),
            on_error: Arc::new(default_error_handler),
            on_start: Vec::new(),
            on_shutdown: Vec::new(),
        }
    }

    /// Replace the error handler invoked when a chain returns an error.
    pub fn on_error(&mut self, f: impl Fn(&mut Context, HandlerError) + Send + Sync + 'static) {
        self.on_error = Arc::new(f);
    }

    /// Run `f` right before the server starts listening.
    pub fn on_start(&mut self, f: impl Fn() + Send + Sync + 'static) {
        self.on_start.push(Box::new(f));
    }

    /// Run `f` once a shutdown signal is received.
    pub fn on_shutdown(&mut self, f: impl Fn() + Send + Sync + 'static) {
        self.on_shutdown.push(Box::new(f));
    }

    /// Fire the start callbacks in registration order.
    pub fn notify_start(&self) {
        for hook in &self.on_start {
            hook();
        }
    }

    /// Fire the shutdown callbacks in registration order.
    pub fn notify_shutdown(&self) {
        for hook in &self.on_shutdown {
            hook();
        }
    }

    /// Handle one request end to end.
    pub async fn dispatch(&self, req: Request<BoxBody>) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let mut ctx = self.pool.acquire();
        ctx.reset(req);

        let (handler, route_mw) = match self.router.resolve(&method, &path, ctx.params_mut()) {
            Resolution::Redirect(location) => {
                // The redirect is emitted directly, outside the chain.
                self.pool.release(ctx);
                return redirect_response(&location);
            }
            Resolution::Route(endpoint) => (endpoint.handler.clone(), endpoint.middleware.clone()),
            Resolution::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                (Arc::new(MethodNotAllowed { allow }) as DynHandler, Vec::new())
            }
            Resolution::NotFound => (self.router.not_found.clone(), Vec::new()),
        };

        let composed = chain(&self.router.middleware, chain(&route_mw, handler));

        let span = tracing::debug_span!(
            "request",
            sable.http.method = %method,
            sable.http.path = %path,
        );
        if let Err(err) = composed.call(&mut ctx).instrument(span).await {
            (self.on_error)(&mut ctx, err);
        }

        let response = ctx.take_response();
        self.pool.release(ctx);
        response
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for App {
    type Target = Router;

    fn deref(&self) -> &Self::Target {
        &self.router
    }
}

impl DerefMut for App {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.router
    }
}

fn redirect_response(location: &str) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::MOVED_PERMANENTLY;
    if let Ok(value) = HeaderValue::from_str(location) {
        res.headers_mut().insert(header::LOCATION, value);
    }
    res
}
