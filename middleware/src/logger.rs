//! Request logging.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

type SkipFn = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Logs method, path, status, duration, and client IP for every request
/// once the inner chain returns. A status is reported as 200 when the
/// handler finished without committing one, matching what the client sees.
pub struct Logger {
    skip: Option<SkipFn>,
}

impl Logger {
    pub fn new() -> Self {
        Logger { skip: None }
    }

    /// Skip logging for requests matching the predicate.
    pub fn skip(mut self, predicate: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        self.skip = Some(Arc::new(predicate));
        self
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        if let Some(skip) = &self.skip {
            if skip(ctx) {
                return next.call(ctx).await;
            }
        }

        let start = Instant::now();
        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let out = next.call(ctx).await;

        let status = ctx.status_code().unwrap_or(StatusCode::OK);
        tracing::info!(
            http.method = %method,
            http.path = %path,
            http.status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            client_ip = %ctx.client_ip(),
            "request completed"
        );

        out
    }
}
