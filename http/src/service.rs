//! Tower `Service` adapter.
//!
//! [`SableService`] lets a frozen [`App`] sit inside any Tower-compatible
//! stack: `poll_ready` is always ready, the future is boxed, and the
//! error is `Infallible` because the dispatcher converts every failure
//! into a response.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use tower::Service;

use sable_core::handler::HandlerError;
use sable_core::App;

#[derive(Clone)]
pub struct SableService {
    app: Arc<App>,
}

impl SableService {
    pub fn new(app: Arc<App>) -> Self {
        SableService { app }
    }
}

impl<B> Service<Request<B>> for SableService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<HandlerError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let app = self.app.clone();
        let req = req.map(|body| body.map_err(Into::into).boxed_unsync());

        Box::pin(async move { Ok(app.dispatch(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::handler::{handler_fn, BoxFuture, HandlerResult};
    use sable_core::Context;

    fn pong(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { ctx.text(http::StatusCode::OK, "pong") })
    }

    #[tokio::test]
    async fn test_service_dispatches() {
        let mut app = App::new();
        app.get("/ping", handler_fn(pong)).unwrap();

        let mut service = SableService::new(Arc::new(app));
        let req = Request::builder()
            .method(http::Method::GET)
            .uri("/ping")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let res = service.call(req).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::OK);
    }
}
