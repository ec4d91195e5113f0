//! Size-bounded persistence with graceful degradation.
//!
//! A capture is written at the richest level that fits. Each rung drops a
//! less important category; cookies and both key-value stores are never
//! dropped.
//!
//! | Level | Keeps |
//! |---|---|
//! | `Full` | everything |
//! | `WithoutDatabases` | everything but embedded databases |
//! | `Minimal` | cookies and key-value stores only |

use crate::base::{SnapError, SnapResult};
use crate::snapshot::{SnapshotCatalog, SnapshotRecord};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DegradeLevel {
    Full,
    WithoutDatabases,
    Minimal,
}

/// A category of captured data left out of the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DroppedCategory {
    EmbeddedDatabases,
    Summary,
    CookiePartition,
}

impl DegradeLevel {
    pub const LADDER: [DegradeLevel; 3] = [
        DegradeLevel::Full,
        DegradeLevel::WithoutDatabases,
        DegradeLevel::Minimal,
    ];

    /// The record as it would be persisted at this level.
    pub fn apply(&self, record: &SnapshotRecord) -> SnapshotRecord {
        let mut degraded = record.clone();
        match self {
            DegradeLevel::Full => degraded.refresh_summary(),
            DegradeLevel::WithoutDatabases => {
                degraded.embedded_databases.clear();
                degraded.refresh_summary();
            }
            DegradeLevel::Minimal => {
                degraded.embedded_databases.clear();
                degraded.summary = None;
                degraded.cookie_store_id = None;
            }
        }
        degraded
    }

    /// Categories present in `record` that this level leaves out.
    pub fn dropped(&self, record: &SnapshotRecord) -> Vec<DroppedCategory> {
        let mut dropped = Vec::new();
        if *self >= DegradeLevel::WithoutDatabases && !record.embedded_databases.is_empty() {
            dropped.push(DroppedCategory::EmbeddedDatabases);
        }
        if *self == DegradeLevel::Minimal {
            dropped.push(DroppedCategory::Summary);
            if record.cookie_store_id.is_some() {
                dropped.push(DroppedCategory::CookiePartition);
            }
        }
        dropped
    }
}

impl fmt::Display for DegradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DegradeLevel::Full => "full",
            DegradeLevel::WithoutDatabases => "without-databases",
            DegradeLevel::Minimal => "minimal",
        };
        f.write_str(s)
    }
}

/// Where a record ended up after walking the ladder.
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub level: DegradeLevel,
    pub dropped: Vec<DroppedCategory>,
    /// Serialized size of the persisted record
    pub bytes: usize,
    /// The record exactly as persisted
    pub record: SnapshotRecord,
}

impl PersistOutcome {
    pub fn is_degraded(&self) -> bool {
        self.level != DegradeLevel::Full
    }
}

/// Persist `record` at the richest level that fits.
///
/// Each rung is measured against `ceiling` before writing, and oversized
/// rungs are skipped without touching the catalog. A
/// [`SnapError::QuotaExceeded`] from the catalog also moves down one rung.
/// Any other catalog error aborts.
pub async fn persist_with_ladder(
    catalog: &dyn SnapshotCatalog,
    record: &SnapshotRecord,
    ceiling: usize,
) -> SnapResult<PersistOutcome> {
    let mut last_size = 0;

    for level in DegradeLevel::LADDER {
        let candidate = level.apply(record);
        let body = candidate.to_json_bytes()?;
        let bytes = body.len();
        last_size = bytes;

        if bytes > ceiling {
            tracing::info!(level = %level, bytes, ceiling, "snapshot over size ceiling, degrading");
            continue;
        }

        match catalog.set(&candidate.id, body).await {
            Ok(()) => {
                let dropped = level.dropped(record);
                if level != DegradeLevel::Full {
                    tracing::warn!(level = %level, ?dropped, bytes, "snapshot persisted degraded");
                } else {
                    tracing::debug!(bytes, "snapshot persisted");
                }
                return Ok(PersistOutcome {
                    level,
                    dropped,
                    bytes,
                    record: candidate,
                });
            }
            Err(SnapError::QuotaExceeded { bytes, limit }) => {
                tracing::info!(level = %level, bytes, limit, "catalog quota exceeded, degrading");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::error!(bytes = last_size, ceiling, "snapshot could not be persisted at any level");
    Err(SnapError::PersistenceExhausted { bytes: last_size })
}
