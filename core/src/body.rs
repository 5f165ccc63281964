//! Request body plumbing shared by the core, the ingress, and tests.
//!
//! The dispatcher accepts `http::Request<BoxBody>`, a boxed body whose
//! error type is the same boxed error handlers return. The ingress maps
//! hyper's `Incoming` into it; tests build one from in-memory bytes.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::handler::HandlerError;

/// The request body type the dispatcher consumes. `Send` but not `Sync`,
/// matching hyper's incoming body.
pub type BoxBody = UnsyncBoxBody<Bytes, HandlerError>;

/// Box an in-memory chunk as a request body.
pub fn from_bytes(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// An empty request body.
pub fn empty() -> BoxBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}
