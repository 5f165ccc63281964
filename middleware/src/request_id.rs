//! Request-id propagation.

use async_trait::async_trait;
use http::header::HeaderName;

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Mirrors the request's id into the `X-Request-ID` response header.
/// The id is the incoming header when present, otherwise generated.
pub struct RequestId;

#[async_trait]
impl Middleware for RequestId {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        let id = ctx.request_id().to_string();
        ctx.set_header(X_REQUEST_ID, &id);
        next.call(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request, StatusCode};
    use sable_core::handler::{handler_fn, BoxFuture};
    use sable_core::{body, App};

    fn ok(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { ctx.text(StatusCode::OK, "ok") })
    }

    #[tokio::test]
    async fn test_request_id_echoes_incoming_header() {
        let mut app = App::new();
        app.layer(RequestId);
        app.get("/", handler_fn(ok)).unwrap();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header("X-Request-ID", "trace-42")
            .body(body::empty())
            .unwrap();
        let res = app.dispatch(req).await;
        assert_eq!(
            res.headers().get("x-request-id").unwrap().to_str().unwrap(),
            "trace-42"
        );
    }

    #[tokio::test]
    async fn test_request_id_generates_when_absent() {
        let mut app = App::new();
        app.layer(RequestId);
        app.get("/", handler_fn(ok)).unwrap();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(body::empty())
            .unwrap();
        let res = app.dispatch(req).await;
        let id = res.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
