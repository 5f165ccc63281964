//! Accept loop over the core dispatcher.
//!
//! One spawned task per connection, hyper http1 on top of `TokioIo`.
//! Incoming bodies are boxed into the core's body type and the peer
//! address is attached as a request extension before dispatch.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper::Request;
use http_body_util::BodyExt;
use tokio::net::TcpListener;

use sable_core::handler::HandlerError;
use sable_core::{App, PeerAddr};

/// Builder for serving an [`App`] over HTTP/1.1.
pub struct Ingress {
    addr: String,
    app: Arc<App>,
}

impl Ingress {
    /// Freeze `app` for serving. Route registration is complete at this
    /// point; the `Arc` shares the tree read-only across connections.
    pub fn new(app: App) -> Self {
        Ingress {
            addr: "127.0.0.1:3000".to_string(),
            app: Arc::new(app),
        }
    }

    /// Set the bind address.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Serve until the listener fails. Start callbacks fire right before
    /// the listener binds.
    pub async fn run(self) -> Result<(), HandlerError> {
        let addr: SocketAddr = self.addr.parse()?;
        self.app.notify_start();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("sable ingress listening on http://{}", addr);

        loop {
            let (stream, peer) = listener.accept().await?;
            serve_connection(self.app.clone(), stream, peer);
        }
    }

    /// Serve until ctrl-c. Shutdown callbacks fire when the signal
    /// arrives, before this returns.
    pub async fn run_graceful(self) -> Result<(), HandlerError> {
        let addr: SocketAddr = self.addr.parse()?;
        self.app.notify_start();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("sable ingress listening on http://{}", addr);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    serve_connection(self.app.clone(), stream, peer);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    self.app.notify_shutdown();
                    return Ok(());
                }
            }
        }
    }
}

fn serve_connection(app: Arc<App>, stream: tokio::net::TcpStream, peer: SocketAddr) {
    let io = TokioIo::new(stream);

    tokio::task::spawn(async move {
        let service = service_fn(move |mut req: Request<Incoming>| {
            let app = app.clone();
            req.extensions_mut().insert(PeerAddr(peer));
            let req =
                req.map(|body| body.map_err(|e| Box::new(e) as HandlerError).boxed_unsync());
            async move { Ok::<_, Infallible>(app.dispatch(req).await) }
        });

        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
            tracing::error!("error serving connection: {:?}", err);
        }
    });
}
