//! Capture: read every category of an origin's state into one snapshot.
//!
//! The four reads (cookies, two key-value stores, databases) run
//! concurrently. A category that cannot be read is captured empty and
//! reported as a warning; only losing the target context aborts.

pub mod ladder;

use crate::base::{SnapError, SnapResult};
use crate::config::EngineConfig;
use crate::context::TargetContext;
use crate::cookies::CookieMirror;
use crate::database::DatabaseMirror;
use crate::snapshot::{SnapshotCatalog, SnapshotRecord, SnapshotSummary};
use crate::storage::{KeyValueMirror, StoreScope};
use crate::value::Normalizer;
use serde::Serialize;

pub use ladder::{persist_with_ladder, DegradeLevel, DroppedCategory, PersistOutcome};

/// A category that could not be captured completely.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureWarning {
    /// `cookies`, `localStorage`, `sessionStorage` or `database:<name>[/<collection>]`
    pub source: String,
    pub message: String,
}

/// An in-memory capture, not yet persisted.
#[derive(Debug, Clone)]
pub struct Capture {
    pub record: SnapshotRecord,
    pub warnings: Vec<CaptureWarning>,
}

/// What a caller shows the user after a capture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReport {
    pub snapshot_id: String,
    pub level: DegradeLevel,
    pub dropped: Vec<DroppedCategory>,
    pub bytes: usize,
    pub summary: SnapshotSummary,
    pub warnings: Vec<CaptureWarning>,
}

impl CaptureReport {
    pub fn is_degraded(&self) -> bool {
        self.level != DegradeLevel::Full
    }

    /// True when everything read was persisted without loss.
    pub fn is_complete(&self) -> bool {
        !self.is_degraded() && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOrchestrator {
    config: EngineConfig,
}

impl CaptureOrchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read the current state of `ctx` into a new snapshot named `name`.
    pub async fn capture(&self, ctx: &dyn TargetContext, name: &str) -> SnapResult<Capture> {
        let url = ctx.url().await?;
        let mut record = SnapshotRecord::new(name, &url);
        record.cookie_store_id = ctx.cookie_partition();

        let cookies = CookieMirror::new(ctx.cookie_jar(), url.clone())
            .with_partition(ctx.cookie_partition());
        let local = KeyValueMirror::new(ctx.storage(StoreScope::Local), StoreScope::Local);
        let session = KeyValueMirror::new(ctx.storage(StoreScope::Session), StoreScope::Session);
        let databases = DatabaseMirror::new(
            ctx.databases(),
            Normalizer::new(self.config.max_normalize_depth),
        );

        let (cookie_result, local_result, session_result, database_result) = tokio::join!(
            cookies.list_all(),
            local.list_all(),
            session.list_all(),
            databases.export_every(),
        );

        let mut warnings = Vec::new();

        match cookie_result {
            Ok(list) => record.cookies = list.into_iter().map(|c| c.normalized()).collect(),
            Err(e) => note_failure(&mut warnings, "cookies", e)?,
        }
        match local_result {
            Ok(items) => record.key_value_store_a = items,
            Err(e) => note_failure(&mut warnings, StoreScope::Local.as_str(), e)?,
        }
        match session_result {
            Ok(items) => record.key_value_store_b = items,
            Err(e) => note_failure(&mut warnings, StoreScope::Session.as_str(), e)?,
        }
        match database_result {
            Ok((set, failures)) => {
                record.embedded_databases = set;
                for (database, list) in failures {
                    for failure in list {
                        let source = if failure.collection.is_empty() {
                            format!("database:{database}")
                        } else {
                            format!("database:{database}/{}", failure.collection)
                        };
                        warnings.push(CaptureWarning {
                            source,
                            message: failure.error.to_string(),
                        });
                    }
                }
            }
            Err(e) => note_failure(&mut warnings, "databases", e)?,
        }

        record.refresh_summary();
        tracing::info!(
            domain = %record.domain,
            cookies = record.cookies.len(),
            local_items = record.key_value_store_a.len(),
            session_items = record.key_value_store_b.len(),
            databases = record.embedded_databases.len(),
            warnings = warnings.len(),
            "captured snapshot"
        );

        Ok(Capture { record, warnings })
    }

    /// Persist a capture through the degrade ladder.
    pub async fn persist(
        &self,
        capture: Capture,
        catalog: &dyn SnapshotCatalog,
    ) -> SnapResult<CaptureReport> {
        let outcome =
            persist_with_ladder(catalog, &capture.record, self.config.max_snapshot_bytes).await?;
        Ok(CaptureReport {
            snapshot_id: outcome.record.id.clone(),
            summary: outcome.record.compute_summary(),
            level: outcome.level,
            dropped: outcome.dropped,
            bytes: outcome.bytes,
            warnings: capture.warnings,
        })
    }

    pub async fn capture_and_persist(
        &self,
        ctx: &dyn TargetContext,
        name: &str,
        catalog: &dyn SnapshotCatalog,
    ) -> SnapResult<CaptureReport> {
        let capture = self.capture(ctx, name).await?;
        self.persist(capture, catalog).await
    }
}

fn note_failure(warnings: &mut Vec<CaptureWarning>, source: &str, error: SnapError) -> SnapResult<()> {
    if error.is_fatal() {
        return Err(error);
    }
    tracing::warn!(source, error = %error, "capture read failed, category left empty");
    warnings.push(CaptureWarning {
        source: source.to_string(),
        message: error.to_string(),
    });
    Ok(())
}
