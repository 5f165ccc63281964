//! Request deadlines.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

/// Bounds the inner chain with a deadline. On elapse the inner future is
/// dropped, which cancels the handler at its next await point, and a 504
/// error envelope is written.
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Timeout { duration }
    }
}

#[async_trait]
impl Middleware for Timeout {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        match tokio::time::timeout(self.duration, next.call(ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => ctx.json(
                StatusCode::GATEWAY_TIMEOUT,
                &serde_json::json!({ "error": "request timeout" }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request};
    use sable_core::handler::{handler_fn, BoxFuture};
    use sable_core::{body, App};

    fn slow(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ctx.text(StatusCode::OK, "too late")
        })
    }

    fn fast(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { ctx.text(StatusCode::OK, "fast") })
    }

    #[tokio::test]
    async fn test_timeout_cuts_off_slow_handlers() {
        let mut app = App::new();
        app.layer(Timeout::new(Duration::from_millis(20)));
        app.get("/slow", handler_fn(slow)).unwrap();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/slow")
            .body(body::empty())
            .unwrap();
        let res = app.dispatch(req).await;
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_timeout_leaves_fast_handlers_alone() {
        let mut app = App::new();
        app.layer(Timeout::new(Duration::from_secs(5)));
        app.get("/fast", handler_fn(fast)).unwrap();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/fast")
            .body(body::empty())
            .unwrap();
        let res = app.dispatch(req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
