//! # Handlers and middleware
//!
//! A handler consumes a mutable [`Context`] and reports success or a boxed
//! error. A middleware sits between the dispatcher and the handler and is
//! handed the `next` link of the chain explicitly.
//!
//! Composition is an explicit reverse loop over the middleware list that
//! produces nested [`Next`] links, so the onion is built once per dispatch
//! without closure capture: `chain([m1, m2], h)` runs `m1` outermost.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;

/// Boxed future used by handler adapters.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The error a handler or middleware may bubble to the error handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a handler: `Ok(())` means the response is considered
/// complete, even when nothing was written (e.g. a 204).
pub type HandlerResult = Result<(), HandlerError>;

/// A request handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &mut Context) -> HandlerResult;
}

/// A middleware: runs around `next`, may short-circuit by not calling it.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult;
}

/// Shared handler reference as stored in the route tree.
pub type DynHandler = Arc<dyn Handler>;

/// Shared middleware reference as stored in the route tree.
pub type DynMiddleware = Arc<dyn Middleware>;

/// Adapter turning a plain async function into a [`Handler`].
///
/// Works for function items of the shape
/// `fn(&mut Context) -> BoxFuture<'_, HandlerResult>`.
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.0)(ctx).await
    }
}

/// Wrap a plain async function as a handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    FnHandler(f)
}

/// Adapter turning a plain async function into a [`Middleware`].
pub struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, &'a dyn Handler) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        (self.0)(ctx, next).await
    }
}

/// Wrap a plain async function as a middleware.
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, &'a dyn Handler) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    FnMiddleware(f)
}

/// One link of a composed chain: a middleware plus everything inside it.
struct Next {
    mw: DynMiddleware,
    inner: DynHandler,
}

#[async_trait]
impl Handler for Next {
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        self.mw.handle(ctx, self.inner.as_ref()).await
    }
}

/// Compose `middleware` around `terminal`.
///
/// The first element of the list ends up outermost: its before-work runs
/// first and its after-work runs last.
pub fn chain(middleware: &[DynMiddleware], terminal: DynHandler) -> DynHandler {
    let mut wrapped = terminal;
    for mw in middleware.iter().rev() {
        wrapped = Arc::new(Next {
            mw: mw.clone(),
            inner: wrapped,
        });
    }
    wrapped
}
