//! A small JSON API over the sable stack: routes, params, a wildcard,
//! a versioned group, and the logger/request-id middleware.

use serde::Serialize;

use sable::middleware::{Logger, RequestId};
use sable::prelude::*;
use sable::HandlerError;

#[derive(Serialize)]
struct User {
    id: i64,
    name: String,
}

fn home(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { ctx.text(StatusCode::OK, "sable up\n") })
}

fn get_user(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let user = User {
            id: ctx.param_i64("id"),
            name: format!("user-{}", ctx.param("id")),
        };
        ctx.ok(&user)
    })
}

fn list_users(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let page = ctx.query_default("page", "1");
        ctx.ok(&serde_json::json!({ "users": [], "page": page }))
    })
}

fn echo_path(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let rest = ctx.param("path").to_string();
        ctx.text(StatusCode::OK, rest)
    })
}

#[tokio::main]
async fn main() -> Result<(), HandlerError> {
    tracing_subscriber::fmt::init();

    let mut app = App::new();
    app.layer(Logger::new());
    app.layer(RequestId);

    app.get("/", handler_fn(home))?;
    app.get("/echo/*path", handler_fn(echo_path))?;

    let mut api = app.group("/api/v1");
    api.get("/users", handler_fn(list_users))?;
    api.get("/users/:id", handler_fn(get_user))?;

    app.on_start(|| tracing::info!("basic demo starting"));
    app.on_shutdown(|| tracing::info!("basic demo stopping"));

    for route in app.routes() {
        tracing::info!(method = %route.method, path = %route.path, "route");
    }

    Ingress::new(app).bind("127.0.0.1:3000").run_graceful().await
}
