//! Middleware composition, ordering, and error routing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};

use sable_core::body::{self, BoxBody};
use sable_core::handler::{
    handler_fn, BoxFuture, DynMiddleware, Handler, HandlerResult, Middleware,
};
use sable_core::{App, Context};

type Log = Arc<Mutex<Vec<String>>>;

struct Tag {
    name: &'static str,
    log: Log,
}

impl Tag {
    fn new(name: &'static str, log: &Log) -> Self {
        Tag {
            name,
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Middleware for Tag {
    async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
        self.log.lock().unwrap().push(format!("{}:before", self.name));
        let out = next.call(ctx).await;
        self.log.lock().unwrap().push(format!("{}:after", self.name));
        out
    }
}

struct Record {
    log: Log,
}

#[async_trait]
impl Handler for Record {
    async fn call(&self, ctx: &mut Context) -> HandlerResult {
        self.log.lock().unwrap().push("handler".to_string());
        ctx.text(StatusCode::OK, "ok")
    }
}

fn request(method: Method, path: &str) -> Request<BoxBody> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(body::empty())
        .unwrap()
}

async fn body_text(res: Response<Full<Bytes>>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[tokio::test]
async fn test_route_middleware_runs_inside_global_middleware() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    app.layer(Tag::new("g1", &log));
    app.layer(Tag::new("g2", &log));
    app.handle_with(
        Method::GET,
        "/",
        Record { log: log.clone() },
        vec![
            Arc::new(Tag::new("r1", &log)) as DynMiddleware,
            Arc::new(Tag::new("r2", &log)),
        ],
    )
    .unwrap();

    let res = app.dispatch(request(Method::GET, "/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        drain(&log),
        vec![
            "g1:before", "g2:before", "r1:before", "r2:before", "handler", "r2:after",
            "r1:after", "g2:after", "g1:after",
        ]
    );
}

#[tokio::test]
async fn test_group_middleware_snapshot_per_registration() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    let mut api = app.group("/api");
    api.layer(Tag::new("m1", &log));
    api.handle_with(
        Method::GET,
        "/a",
        Record { log: log.clone() },
        vec![Arc::new(Tag::new("m2", &log)) as DynMiddleware],
    )
    .unwrap();

    api.layer(Tag::new("m3", &log));
    api.handle(Method::GET, "/b", Record { log: log.clone() })
        .unwrap();

    let res = app.dispatch(request(Method::GET, "/api/a")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        drain(&log),
        vec!["m1:before", "m2:before", "handler", "m2:after", "m1:after"]
    );

    let res = app.dispatch(request(Method::GET, "/api/b")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        drain(&log),
        vec!["m1:before", "m3:before", "handler", "m3:after", "m1:after"]
    );
}

#[tokio::test]
async fn test_nested_groups_compose_prefixes_and_middleware() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    let mut api = app.group("/api");
    api.layer(Tag::new("api", &log));
    {
        let mut v1 = api.group("/v1");
        v1.layer(Tag::new("v1", &log));
        v1.handle(Method::GET, "/users", Record { log: log.clone() })
            .unwrap();
    }
    // Middleware accumulated on the child never leaks back.
    api.handle(Method::GET, "/ping", Record { log: log.clone() })
        .unwrap();

    let res = app.dispatch(request(Method::GET, "/api/v1/users")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        drain(&log),
        vec!["api:before", "v1:before", "handler", "v1:after", "api:after"]
    );

    let res = app.dispatch(request(Method::GET, "/api/ping")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(drain(&log), vec!["api:before", "handler", "api:after"]);
}

#[tokio::test]
async fn test_group_prefix_join_is_naive() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    let mut api = app.group("/api/");
    api.handle(Method::GET, "/users", Record { log: log.clone() })
        .unwrap();

    // The route lives at /api//users, with an empty segment in between.
    let res = app.dispatch(request(Method::GET, "/api/users")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.dispatch(request(Method::GET, "/api//users")).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_global_middleware_brackets_not_found_and_method_miss() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    app.layer(Tag::new("g", &log));
    app.handle(Method::POST, "/only-post", Record { log: log.clone() })
        .unwrap();

    let res = app.dispatch(request(Method::GET, "/missing")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(drain(&log), vec!["g:before", "g:after"]);

    let res = app.dispatch(request(Method::GET, "/only-post")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(drain(&log), vec!["g:before", "g:after"]);
}

#[tokio::test]
async fn test_middleware_can_short_circuit() {
    struct Deny;

    #[async_trait]
    impl Middleware for Deny {
        async fn handle(&self, ctx: &mut Context, _next: &dyn Handler) -> HandlerResult {
            ctx.text(StatusCode::FORBIDDEN, "denied")
        }
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    app.layer(Deny);
    app.handle(Method::GET, "/", Record { log: log.clone() })
        .unwrap();

    let res = app.dispatch(request(Method::GET, "/")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(res).await, "denied");
    assert!(drain(&log).is_empty(), "handler must not run");
}

fn failing(_ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { Err("boom".into()) })
}

#[tokio::test]
async fn test_default_error_handler_writes_500() {
    let mut app = App::new();
    app.get("/fail", handler_fn(failing)).unwrap();

    let res = app.dispatch(request(Method::GET, "/fail")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(res).await, "Internal Server Error");
}

#[tokio::test]
async fn test_custom_error_handler() {
    let mut app = App::new();
    app.on_error(|ctx, err| {
        let _ = ctx.text(StatusCode::BAD_GATEWAY, format!("wrapped: {err}"));
    });
    app.get("/fail", handler_fn(failing)).unwrap();

    let res = app.dispatch(request(Method::GET, "/fail")).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_text(res).await, "wrapped: boom");
}

#[tokio::test]
async fn test_error_after_write_keeps_committed_status() {
    fn partial(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            ctx.text(StatusCode::OK, "partial")?;
            Err("late failure".into())
        })
    }

    let mut app = App::new();
    app.get("/partial", handler_fn(partial)).unwrap();

    let res = app.dispatch(request(Method::GET, "/partial")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "partial");
}

#[tokio::test]
async fn test_middleware_observes_handler_error() {
    struct Observe {
        log: Log,
    }

    #[async_trait]
    impl Middleware for Observe {
        async fn handle(&self, ctx: &mut Context, next: &dyn Handler) -> HandlerResult {
            let out = next.call(ctx).await;
            if out.is_err() {
                self.log.lock().unwrap().push("saw error".to_string());
            }
            out
        }
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    app.layer(Observe { log: log.clone() });
    app.get("/fail", handler_fn(failing)).unwrap();

    let res = app.dispatch(request(Method::GET, "/fail")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(drain(&log), vec!["saw error"]);
}
