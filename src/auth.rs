//! Scope sets, bearer tokens, client credentials, and the authenticator capability.

pub mod authenticator;
pub mod credentials;
pub mod scope;
pub mod token;

pub use authenticator::*;
pub use credentials::*;
pub use scope::*;
pub use token::{bearer::*, secret::*};
