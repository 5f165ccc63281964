//! # Context: per-request state
//!
//! A [`Context`] owns the request it was dispatched with (`Parts` plus a
//! boxed body) and buffers the response it is building. Handlers get it by
//! mutable reference for exactly one request; afterwards the dispatcher
//! recycles the object through the pool.
//!
//! Response writes follow a single-write discipline: the first call that
//! commits a status line wins, later status writes are dropped silently,
//! and body writes keep appending to the buffered response.

use std::any::Any;
use std::collections::HashMap;
use std::io::Read;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::body::BoxBody;
use crate::handler::{HandlerError, HandlerResult};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Peer address of the connection, injected into request extensions by the
/// ingress so [`Context::client_ip`] has a fallback behind proxies.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub SocketAddr);

/// Failure decoding a request body with [`Context::bind`].
#[derive(Debug, Error)]
pub enum BindError {
    #[error("empty request body")]
    EmptyBody,
    #[error("failed to read request body: {0}")]
    Read(String),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

pub struct Context {
    parts: http::request::Parts,
    req_body: Option<BoxBody>,
    params: HashMap<String, String>,
    store: HashMap<String, Box<dyn Any + Send + Sync>>,
    written: bool,
    status: Option<StatusCode>,
    request_id: String,
    res_headers: HeaderMap,
    res_body: BytesMut,
}

impl Context {
    /// A context not yet bound to any request. The pool hands these out;
    /// the dispatcher binds one with [`Context::reset`] before use.
    pub(crate) fn detached() -> Self {
        let (parts, ()) = Request::new(()).into_parts();
        Context {
            parts,
            req_body: None,
            params: HashMap::new(),
            store: HashMap::new(),
            written: false,
            status: None,
            request_id: String::new(),
            res_headers: HeaderMap::new(),
            res_body: BytesMut::new(),
        }
    }

    /// Rebind to a fresh request, clearing all per-request state.
    /// Map and buffer capacity is retained across requests.
    pub(crate) fn reset(&mut self, req: Request<BoxBody>) {
        let (parts, body) = req.into_parts();
        self.parts = parts;
        self.req_body = Some(body);
        self.params.clear();
        self.store.clear();
        self.written = false;
        self.status = None;
        self.request_id.clear();
        self.res_headers.clear();
        self.res_body.clear();
    }

    /// Detach from the finished request before the object re-enters the
    /// pool, so no request memory is pinned while idle.
    pub(crate) fn recycle(&mut self) {
        let (parts, ()) = Request::new(()).into_parts();
        self.parts = parts;
        self.req_body = None;
        self.params.clear();
        self.store.clear();
        self.written = false;
        self.status = None;
        self.request_id.clear();
        self.res_headers.clear();
        self.res_body.clear();
    }

    /// Hand the buffered response to the dispatcher.
    /// An untouched context yields an empty 200.
    pub(crate) fn take_response(&mut self) -> Response<Full<Bytes>> {
        let status = self.status.unwrap_or(StatusCode::OK);
        let mut res = Response::new(Full::new(self.res_body.split().freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = std::mem::take(&mut self.res_headers);
        res
    }

    pub(crate) fn params_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.params
    }

    // ---- request side -----------------------------------------------------

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// A request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request extensions, e.g. the host's cancellation or deadline token.
    pub fn extensions(&self) -> &http::Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.parts.extensions
    }

    /// A path parameter bound by the matcher. Empty string when missing.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    /// A path parameter parsed as `i64`, `0` when missing or invalid.
    pub fn param_i64(&self, name: &str) -> i64 {
        self.param(name).parse().unwrap_or(0)
    }

    /// A decoded query parameter.
    pub fn query(&self, name: &str) -> Option<String> {
        let raw = self.parts.uri.query()?;
        url::form_urlencoded::parse(raw.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// A decoded query parameter, or `default` when missing or empty.
    pub fn query_default(&self, name: &str, default: &str) -> String {
        match self.query(name) {
            Some(v) if !v.is_empty() => v,
            _ => default.to_string(),
        }
    }

    /// Decode the JSON request body into `T`. Consumes the body; a second
    /// call reports an empty body.
    pub async fn bind<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        let body = self.req_body.take().ok_or(BindError::EmptyBody)?;
        let collected = body
            .collect()
            .await
            .map_err(|e| BindError::Read(e.to_string()))?;
        let bytes = collected.to_bytes();
        if bytes.is_empty() {
            return Err(BindError::EmptyBody);
        }
        serde_json::from_slice(&bytes).map_err(|e| BindError::InvalidJson(e.to_string()))
    }

    /// Client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
    /// peer address the ingress recorded. Empty string when unknown.
    pub fn client_ip(&self) -> String {
        if let Some(xff) = self.header(HeaderName::from_static("x-forwarded-for")) {
            let first = xff.split(',').next().unwrap_or(xff).trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
        if let Some(xri) = self.header(HeaderName::from_static("x-real-ip")) {
            return xri.to_string();
        }
        if let Some(peer) = self.parts.extensions.get::<PeerAddr>() {
            return peer.0.ip().to_string();
        }
        String::new()
    }

    /// The `Authorization: Bearer` token, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.header(header::AUTHORIZATION)?.strip_prefix("Bearer ")
    }

    /// A unique identifier for this request: the incoming `X-Request-ID`
    /// header when present, otherwise 16 random hex characters. Cached for
    /// the rest of the request.
    pub fn request_id(&mut self) -> &str {
        if self.request_id.is_empty() {
            if let Some(id) = self.parts.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
            {
                if !id.is_empty() {
                    self.request_id = id.to_string();
                }
            }
            if self.request_id.is_empty() {
                self.request_id = format!("{:016x}", rand::random::<u64>());
            }
        }
        &self.request_id
    }

    // ---- key/value store --------------------------------------------------

    /// Store a request-scoped value under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.store.insert(key.into(), Box::new(value));
    }

    /// Read a stored value by type. `None` on miss or type mismatch.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.store.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// A stored `String`, or `""` on miss or mismatch.
    pub fn get_string(&self, key: &str) -> String {
        self.get::<String>(key).cloned().unwrap_or_default()
    }

    /// A stored `i64`, or `0` on miss or mismatch.
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get::<i64>(key).copied().unwrap_or(0)
    }

    /// A stored `bool`, or `false` on miss or mismatch.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get::<bool>(key).copied().unwrap_or(false)
    }

    // ---- response side ----------------------------------------------------

    /// Whether a status line has been committed.
    pub fn written(&self) -> bool {
        self.written
    }

    /// The committed status code, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Set a response header. Invalid values are dropped silently.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> &mut Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.res_headers.insert(name, v);
        }
        self
    }

    /// Commit the status line. A no-op once the response is written.
    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        if !self.written {
            self.written = true;
            self.status = Some(code);
        }
        self
    }

    /// Write a plain-text response. Repeated calls append to the body
    /// without touching the committed status line.
    pub fn text(&mut self, code: StatusCode, body: impl AsRef<str>) -> HandlerResult {
        if !self.written {
            self.res_headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            self.written = true;
            self.status = Some(code);
        }
        self.res_body.extend_from_slice(body.as_ref().as_bytes());
        Ok(())
    }

    /// Write a JSON response. Serialization failure is reported before
    /// anything is written.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, value: &T) -> HandlerResult {
        let payload = serde_json::to_vec(value).map_err(|e| Box::new(e) as HandlerError)?;
        if !self.written {
            self.res_headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            self.written = true;
            self.status = Some(code);
        }
        self.res_body.extend_from_slice(&payload);
        Ok(())
    }

    /// 200 with a JSON body.
    pub fn ok<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        self.json(StatusCode::OK, value)
    }

    /// 201 with a JSON body.
    pub fn created<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        self.json(StatusCode::CREATED, value)
    }

    /// 204, no body.
    pub fn no_content(&mut self) -> HandlerResult {
        self.status(StatusCode::NO_CONTENT);
        Ok(())
    }

    /// 400 with a JSON error envelope.
    pub fn bad_request(&mut self, message: &str) -> HandlerResult {
        self.json(StatusCode::BAD_REQUEST, &serde_json::json!({ "error": message }))
    }

    /// 401 with a JSON error envelope.
    pub fn unauthorized(&mut self, message: &str) -> HandlerResult {
        self.json(StatusCode::UNAUTHORIZED, &serde_json::json!({ "error": message }))
    }

    /// Redirect: sets `Location` and commits `code`.
    pub fn redirect(&mut self, code: StatusCode, location: &str) -> HandlerResult {
        self.set_header(header::LOCATION, location);
        self.status(code);
        Ok(())
    }

    /// Emit headers, then drain an opaque byte source into the response.
    /// `None` yields a valid empty-body response.
    pub fn stream(
        &mut self,
        code: StatusCode,
        content_type: &str,
        source: Option<&mut dyn Read>,
    ) -> HandlerResult {
        if !self.written {
            self.set_header(header::CONTENT_TYPE, content_type);
            self.written = true;
            self.status = Some(code);
        }
        if let Some(reader) = source {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| Box::new(e) as HandlerError)?;
            self.res_body.extend_from_slice(&buf);
        }
        Ok(())
    }
}
