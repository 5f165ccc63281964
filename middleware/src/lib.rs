//! # sable-middleware
//!
//! Standard middleware built on the `sable-core` middleware contract.
//! Each type wraps the chain-terminal handler it is handed: before-work,
//! `next.call(ctx)`, after-work, with the option to short-circuit by not
//! calling `next` at all.

pub mod basic_auth;
pub mod body_limit;
pub mod logger;
pub mod request_id;
pub mod secure;
pub mod timeout;

pub use basic_auth::BasicAuth;
pub use body_limit::BodyLimit;
pub use logger::Logger;
pub use request_id::RequestId;
pub use secure::{Secure, SecureConfig};
pub use timeout::Timeout;
