//! Declared-body-size guard.

use async_trait::async_trait;
use http::{header, StatusCode};

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

/// Rejects requests whose `Content-Length` exceeds `max_bytes` before the
/// handler runs. Requests without a declared length pass through.
pub struct BodyLimit {
    max_bytes: u64,
}

impl BodyLimit {
    pub fn new(max_bytes: u64) -> Self {
        BodyLimit { max_bytes }
    }
}

#[async_trait]
impl Middleware for BodyLimit {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        let declared = ctx
            .header(header::CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok());

        if let Some(length) = declared {
            if length > self.max_bytes {
                return ctx.json(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    &serde_json::json!({ "error": "request body too large" }),
                );
            }
        }

        next.call(ctx).await
    }
}
