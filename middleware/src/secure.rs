//! Security response headers.

use async_trait::async_trait;
use http::header::HeaderName;

use sable_core::handler::{Handler, HandlerResult, Middleware};
use sable_core::Context;

const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");
const X_CONTENT_TYPE_OPTIONS: HeaderName = HeaderName::from_static("x-content-type-options");
const X_FRAME_OPTIONS: HeaderName = HeaderName::from_static("x-frame-options");

/// Which headers [`Secure`] emits. Empty strings and a zero HSTS max-age
/// suppress the corresponding header.
#[derive(Clone)]
pub struct SecureConfig {
    pub xss_protection: String,
    pub content_type_nosniff: String,
    pub x_frame_options: String,
    pub hsts_max_age: u64,
    pub hsts_include_subdomains: bool,
    pub content_security_policy: String,
    pub referrer_policy: String,
}

impl Default for SecureConfig {
    fn default() -> Self {
        SecureConfig {
            xss_protection: "1; mode=block".to_string(),
            content_type_nosniff: "nosniff".to_string(),
            x_frame_options: "SAMEORIGIN".to_string(),
            hsts_max_age: 0,
            hsts_include_subdomains: false,
            content_security_policy: String::new(),
            referrer_policy: "strict-origin-when-cross-origin".to_string(),
        }
    }
}

/// Sets the configured security headers before handing off to `next`.
pub struct Secure {
    config: SecureConfig,
}

impl Secure {
    pub fn new() -> Self {
        Secure {
            config: SecureConfig::default(),
        }
    }

    pub fn with_config(config: SecureConfig) -> Self {
        Secure { config }
    }
}

impl Default for Secure {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for Secure {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        let cfg = &self.config;
        if !cfg.xss_protection.is_empty() {
            ctx.set_header(X_XSS_PROTECTION, &cfg.xss_protection);
        }
        if !cfg.content_type_nosniff.is_empty() {
            ctx.set_header(X_CONTENT_TYPE_OPTIONS, &cfg.content_type_nosniff);
        }
        if !cfg.x_frame_options.is_empty() {
            ctx.set_header(X_FRAME_OPTIONS, &cfg.x_frame_options);
        }
        if cfg.hsts_max_age > 0 {
            let mut value = format!("max-age={}", cfg.hsts_max_age);
            if cfg.hsts_include_subdomains {
                value.push_str("; includeSubDomains");
            }
            ctx.set_header(http::header::STRICT_TRANSPORT_SECURITY, &value);
        }
        if !cfg.content_security_policy.is_empty() {
            ctx.set_header(
                http::header::CONTENT_SECURITY_POLICY,
                &cfg.content_security_policy,
            );
        }
        if !cfg.referrer_policy.is_empty() {
            ctx.set_header(http::header::REFERRER_POLICY, &cfg.referrer_policy);
        }
        next.call(ctx).await
    }
}
