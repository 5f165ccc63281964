//! HTTP basic authentication.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::header;
use http::StatusCode;

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

type Validator = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Challenges requests without valid `Authorization: Basic` credentials.
/// The authenticated user name is stored under the `"user"` key for
/// downstream handlers.
pub struct BasicAuth {
    realm: String,
    validate: Validator,
}

impl BasicAuth {
    pub fn new(validate: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        BasicAuth {
            realm: "Restricted".to_string(),
            validate: Arc::new(validate),
        }
    }

    /// A single fixed credential pair.
    pub fn single(user: impl Into<String>, pass: impl Into<String>) -> Self {
        let user = user.into();
        let pass = pass.into();
        Self::new(move |u, p| u == user && p == pass)
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    fn challenge(&self, ctx: &mut Context) -> HandlerResult {
        let value = format!("Basic realm=\"{}\"", self.realm);
        ctx.set_header(header::WWW_AUTHENTICATE, &value);
        ctx.json(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({ "error": "unauthorized" }),
        )
    }
}

#[async_trait]
impl Middleware for BasicAuth {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        let Some(encoded) = ctx
            .header(header::AUTHORIZATION)
            .and_then(|auth| auth.strip_prefix("Basic "))
        else {
            return self.challenge(ctx);
        };

        let Ok(decoded) = BASE64.decode(encoded) else {
            return self.challenge(ctx);
        };
        let Ok(payload) = String::from_utf8(decoded) else {
            return self.challenge(ctx);
        };
        let Some((user, pass)) = payload.split_once(':') else {
            return self.challenge(ctx);
        };

        if !(self.validate)(user, pass) {
            return self.challenge(ctx);
        }

        ctx.set("user", user.to_string());
        next.call(ctx).await
    }
}
