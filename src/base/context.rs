//! Ergonomic error context helpers.
//!
//! Provides an extension trait for turning foreign errors coming out of a
//! mirror backend into context-rich `SnapError` variants.

use crate::base::snaperror::SnapError;
use std::fmt::Display;

/// Extension trait for adding context to backend results.
pub trait BackendResultExt<T> {
    /// Wrap the error as [`SnapError::Backend`], naming the operation.
    ///
    /// # Example
    /// ```ignore
    /// use originsnap::base::context::BackendResultExt;
    ///
    /// let raw = std::fs::read_to_string(path).backend_context("reading snapshot file")?;
    /// // Error: "Backend error while reading snapshot file: No such file or directory"
    /// ```
    fn backend_context(self, operation: &str) -> Result<T, SnapError>;

    /// Wrap the error as [`SnapError::InvalidSnapshot`].
    fn snapshot_context(self, what: &str) -> Result<T, SnapError>;
}

impl<T, E: Display> BackendResultExt<T> for Result<T, E> {
    fn backend_context(self, operation: &str) -> Result<T, SnapError> {
        self.map_err(|e| SnapError::backend(operation, e))
    }

    fn snapshot_context(self, what: &str) -> Result<T, SnapError> {
        self.map_err(|e| SnapError::invalid_snapshot(format!("{what}: {e}")))
    }
}
