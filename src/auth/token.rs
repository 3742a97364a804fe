//! Token snapshots and secret wrappers.

pub mod bearer;
pub mod secret;
