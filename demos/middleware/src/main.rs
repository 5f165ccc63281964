//! Middleware composition on display: global timeout and security
//! headers, a protected admin group, and a per-route body limit.

use std::time::Duration;

use sable::middleware::{BasicAuth, BodyLimit, Logger, Secure, Timeout};
use sable::prelude::*;
use sable::{DynMiddleware, HandlerError};

fn public(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { ctx.text(StatusCode::OK, "public\n") })
}

fn admin_home(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let user = ctx.get_string("user");
        ctx.ok(&serde_json::json!({ "admin": user }))
    })
}

fn upload(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let note: serde_json::Value = ctx.bind().await?;
        ctx.created(&note)
    })
}

fn slow(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        ctx.text(StatusCode::OK, "you will not see this\n")
    })
}

#[tokio::main]
async fn main() -> Result<(), HandlerError> {
    tracing_subscriber::fmt::init();

    let mut app = App::new();
    app.layer(Logger::new());
    app.layer(Secure::new());
    app.layer(Timeout::new(Duration::from_secs(2)));

    app.get("/", handler_fn(public))?;
    app.get("/slow", handler_fn(slow))?;
    app.handle_with(
        Method::POST,
        "/notes",
        handler_fn(upload),
        vec![std::sync::Arc::new(BodyLimit::new(64 * 1024)) as DynMiddleware],
    )?;

    let mut admin = app.group("/admin");
    admin.layer(BasicAuth::single("admin", "hunter2"));
    admin.get("", handler_fn(admin_home))?;

    Ingress::new(app).bind("127.0.0.1:3000").run_graceful().await
}
