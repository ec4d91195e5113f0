use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Coarse error category, used when aggregating per-item failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Backend,
    Quota,
    Persistence,
    Timeout,
    Target,
    Busy,
    Format,
    Gate,
    Cancelled,
}

#[derive(Debug, Error, Clone)]
pub enum SnapError {
    // Record-level errors (recoverable, the record is skipped)
    #[error("Validation failed: {reason}")]
    Validation { reason: String },
    #[error("Not found: {what}")]
    NotFound { what: String },

    // Mirror and catalog I/O
    #[error("Backend error while {operation}: {message}")]
    Backend {
        operation: String,
        message: String,
        retryable: bool,
    },
    #[error("Storage quota exceeded ({bytes} bytes, limit {limit} bytes)")]
    QuotaExceeded { bytes: usize, limit: usize },
    #[error("Snapshot could not be persisted even without optional data ({bytes} bytes)")]
    PersistenceExhausted { bytes: usize },
    #[error("Timed out after {after:?} during {stage}")]
    Timeout { stage: String, after: Duration },

    // Target context
    #[error("Target context unavailable: {reason}")]
    TargetUnavailable { reason: String },
    #[error("Another capture or restore is already running on target {target}")]
    Busy { target: String },
    #[error("Domain decision was cancelled")]
    DecisionCancelled,

    // Import / export
    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },
    #[error("Export blocked by credential gate")]
    ExportBlocked,

    #[error("IO error: {source}")]
    Io {
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("JSON error: {source}")]
    Json {
        #[source]
        source: Arc<serde_json::Error>,
    },
}

impl SnapError {
    pub fn validation(reason: impl Into<String>) -> Self {
        SnapError::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SnapError::NotFound { what: what.into() }
    }

    pub fn backend(operation: impl Into<String>, message: impl ToString) -> Self {
        SnapError::Backend {
            operation: operation.into(),
            message: message.to_string(),
            retryable: false,
        }
    }

    pub fn target_unavailable(reason: impl Into<String>) -> Self {
        SnapError::TargetUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_snapshot(reason: impl Into<String>) -> Self {
        SnapError::InvalidSnapshot {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapError::Validation { .. } => ErrorKind::Validation,
            SnapError::NotFound { .. } => ErrorKind::NotFound,
            SnapError::Backend { .. } | SnapError::Io { .. } => ErrorKind::Backend,
            SnapError::QuotaExceeded { .. } => ErrorKind::Quota,
            SnapError::PersistenceExhausted { .. } => ErrorKind::Persistence,
            SnapError::Timeout { .. } => ErrorKind::Timeout,
            SnapError::TargetUnavailable { .. } => ErrorKind::Target,
            SnapError::Busy { .. } => ErrorKind::Busy,
            SnapError::InvalidSnapshot { .. } | SnapError::Json { .. } => ErrorKind::Format,
            SnapError::ExportBlocked => ErrorKind::Gate,
            SnapError::DecisionCancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error must abort the whole operation.
    ///
    /// Per-record validation, not-found and mirror backend failures are
    /// counted and skipped; a lost target or an exhausted catalog is not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SnapError::PersistenceExhausted { .. } | SnapError::TargetUnavailable { .. }
        )
    }

    /// Whether the failed call may succeed if simply retried (locked database, busy backend).
    pub fn is_retryable(&self) -> bool {
        matches!(self, SnapError::Backend { retryable: true, .. })
    }
}

impl From<std::io::Error> for SnapError {
    fn from(err: std::io::Error) -> Self {
        SnapError::Io {
            source: Arc::new(err),
        }
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::Json {
            source: Arc::new(err),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SnapError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ffi::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ffi::ErrorCode::DatabaseLocked =>
            {
                SnapError::Backend {
                    operation: "accessing snapshot catalog".to_string(),
                    message: "database is locked".to_string(),
                    retryable: true,
                }
            }
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ffi::ErrorCode::DiskFull => {
                SnapError::QuotaExceeded { bytes: 0, limit: 0 }
            }
            _ => SnapError::backend("accessing snapshot catalog", err),
        }
    }
}
