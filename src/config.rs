//! Engine configuration.

use crate::base::context::BackendResultExt;
use crate::base::SnapResult;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Default persisted snapshot ceiling (4 MiB).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 4 * 1024 * 1024;

/// Default recursion limit for value normalization.
pub const DEFAULT_MAX_NORMALIZE_DEPTH: usize = 10;

/// Capture and restore tuning.
///
/// Durations are read and written as integer milliseconds so that a config
/// file stays readable: `{"databaseReplayTimeout": 2000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Ceiling on the serialized size of a persisted snapshot
    pub max_snapshot_bytes: usize,
    /// Depth at which nested values are elided
    pub max_normalize_depth: usize,
    /// Fallback timer armed when database replay begins
    #[serde(with = "millis")]
    pub database_replay_timeout: Duration,
    /// Wait after database replay completes, before finalize
    #[serde(with = "millis")]
    pub database_settle_delay: Duration,
    /// Wait before finalize when no database was replayed
    #[serde(with = "millis")]
    pub finalize_delay: Duration,
    /// Reject cookie records whose domain is a public suffix
    pub validate_public_suffix: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            max_normalize_depth: DEFAULT_MAX_NORMALIZE_DEPTH,
            database_replay_timeout: Duration::from_secs(2),
            database_settle_delay: Duration::from_millis(500),
            finalize_delay: Duration::ZERO,
            validate_public_suffix: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> SnapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> SnapResult<Self> {
        let json = std::fs::read_to_string(path).backend_context("reading engine config")?;
        Self::from_json_str(&json)
    }

    /// Set the snapshot size ceiling.
    pub fn max_snapshot_bytes(mut self, bytes: usize) -> Self {
        self.max_snapshot_bytes = bytes;
        self
    }

    /// Set the normalization depth limit.
    pub fn max_normalize_depth(mut self, depth: usize) -> Self {
        self.max_normalize_depth = depth;
        self
    }

    /// Set the database replay fallback timer.
    pub fn database_replay_timeout(mut self, timeout: Duration) -> Self {
        self.database_replay_timeout = timeout;
        self
    }

    /// Set the settle delay after a completed database replay.
    pub fn database_settle_delay(mut self, delay: Duration) -> Self {
        self.database_settle_delay = delay;
        self
    }

    /// Set the delay before finalize when no databases are replayed.
    pub fn finalize_delay(mut self, delay: Duration) -> Self {
        self.finalize_delay = delay;
        self
    }

    /// Enable or disable public suffix validation of cookie domains.
    pub fn validate_public_suffix(mut self, enabled: bool) -> Self {
        self.validate_public_suffix = enabled;
        self
    }
}

mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
