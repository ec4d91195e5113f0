//! Base types and error handling.
//!
//! - [`SnapError`](snaperror::SnapError): the error taxonomy shared by every mirror and orchestrator
//! - [`BackendResultExt`](context::BackendResultExt): context helpers for foreign errors

pub mod context;
pub mod snaperror;

pub use snaperror::{ErrorKind, SnapError};

/// Result alias used throughout the crate.
pub type SnapResult<T> = Result<T, SnapError>;

#[cfg(test)]
mod tests;
