//! Credential providers: service identity (2-legged) and delegated user (3-legged).
//!
//! Both providers implement [`Authenticator`](crate::auth::Authenticator), so the request
//! executor never needs to know which flow produced the bearer token it attaches.

pub mod common;
pub mod delegated;
pub mod refresh;
pub mod service_identity;

pub use common::*;
pub use delegated::*;
pub use refresh::*;
pub use service_identity::*;
