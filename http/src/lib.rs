//! # sable-http - HTTP ingress for sable
//!
//! The boundary layer between hyper and the `sable-core` dispatcher.
//!
//! ## Key components
//!
//! - [`Ingress`] - binds an address and drives the accept loop
//! - [`SableService`] - Tower `Service` adapter over a frozen [`sable_core::App`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sable_core::prelude::*;
//! use sable_http::Ingress;
//!
//! let mut app = App::new();
//! app.get("/", handler_fn(home))?;
//!
//! Ingress::new(app)
//!     .bind("127.0.0.1:3000")
//!     .run_graceful()
//!     .await?;
//! ```

pub mod ingress;
pub mod service;

pub use ingress::Ingress;
pub use service::SableService;

pub mod prelude {
    pub use crate::ingress::Ingress;
    pub use crate::service::SableService;
}
