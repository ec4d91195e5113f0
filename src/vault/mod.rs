//! Session-scoped snapshot manager.
//!
//! [`SnapshotVault`] owns the catalog handle for one UI session and is the
//! entry point for everything a user does with snapshots: capture, restore,
//! list, search, rename, delete, import and export. It also enforces that only
//! one capture or restore runs per target context at a time.

pub mod gate;
pub mod transfer;

use crate::base::{SnapError, SnapResult};
use crate::capture::{CaptureOrchestrator, CaptureReport, PersistOutcome};
use crate::config::EngineConfig;
use crate::context::TargetContext;
use crate::restore::{RestoreOrchestrator, RestoreReport};
use crate::snapshot::{SnapshotCatalog, SnapshotRecord};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use gate::{CredentialGate, OpenGate, PredicateGate};
pub use transfer::{ImportReport, ImportSource, SnapshotExport};

type InFlight = Arc<DashMap<String, Arc<Mutex<()>>>>;

pub struct SnapshotVault {
    catalog: Arc<dyn SnapshotCatalog>,
    capture: CaptureOrchestrator,
    gate: Arc<dyn CredentialGate>,
    in_flight: InFlight,
}

/// Exclusive hold on one target; the lock entry is dropped with the last holder.
struct TargetClaim {
    in_flight: InFlight,
    target: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TargetClaim {
    fn drop(&mut self) {
        self.guard.take();
        self.in_flight
            .remove_if(&self.target, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl SnapshotVault {
    pub fn new(catalog: Arc<dyn SnapshotCatalog>, config: EngineConfig) -> Self {
        Self {
            catalog,
            capture: CaptureOrchestrator::new(config),
            gate: Arc::new(OpenGate),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn CredentialGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.capture.config()
    }

    /// Claim `target` for one capture or restore.
    fn begin(&self, target: &str) -> SnapResult<TargetClaim> {
        let lock = self
            .in_flight
            .entry(target.to_string())
            .or_default()
            .clone();
        let guard = lock.try_lock_owned().map_err(|_| {
            tracing::warn!(context = target, "operation already running on target");
            SnapError::Busy {
                target: target.to_string(),
            }
        })?;
        Ok(TargetClaim {
            in_flight: self.in_flight.clone(),
            target: target.to_string(),
            guard: Some(guard),
        })
    }

    pub async fn capture(&self, ctx: &dyn TargetContext, name: &str) -> SnapResult<CaptureReport> {
        let _guard = self.begin(ctx.id())?;
        self.capture
            .capture_and_persist(ctx, name, self.catalog.as_ref())
            .await
    }

    pub async fn restore(
        &self,
        orchestrator: &RestoreOrchestrator,
        ctx: &dyn TargetContext,
        id: &str,
    ) -> SnapResult<RestoreReport> {
        let _guard = self.begin(ctx.id())?;
        let snapshot = self.get(id).await?;
        orchestrator.restore(ctx, &snapshot).await
    }

    pub async fn get(&self, id: &str) -> SnapResult<SnapshotRecord> {
        let body = self
            .catalog
            .get(id)
            .await?
            .ok_or_else(|| SnapError::not_found(format!("snapshot {id}")))?;
        SnapshotRecord::from_json_slice(&body)
    }

    /// Every readable snapshot, newest first.
    ///
    /// Entries that no longer decode are logged and skipped.
    pub async fn list(&self) -> SnapResult<Vec<SnapshotRecord>> {
        let mut records = Vec::new();
        for id in self.catalog.keys().await? {
            match self.get(&id).await {
                Ok(record) => records.push(record),
                Err(SnapError::NotFound { .. }) => {}
                Err(e @ SnapError::InvalidSnapshot { .. }) => {
                    tracing::warn!(id = %id, error = %e, "skipping unreadable snapshot");
                }
                Err(e) => return Err(e),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Snapshots whose name or domain contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> SnapResult<Vec<SnapshotRecord>> {
        let query = query.trim().to_lowercase();
        let records = self.list().await?;
        if query.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&query) || r.domain.to_lowercase().contains(&query)
            })
            .collect())
    }

    pub async fn rename(&self, id: &str, name: &str) -> SnapResult<SnapshotRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SnapError::validation("snapshot name cannot be empty"));
        }
        let mut record = self.get(id).await?;
        record.name = name.to_string();
        self.catalog.set(id, record.to_json_bytes()?).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> SnapResult<()> {
        if self.catalog.get(id).await?.is_none() {
            return Err(SnapError::not_found(format!("snapshot {id}")));
        }
        self.catalog.remove(id).await?;
        tracing::info!(id, "deleted snapshot");
        Ok(())
    }

    /// Import one snapshot file, storing it under a fresh id.
    ///
    /// An oversized import goes through the same degrade ladder as a capture.
    pub async fn import(&self, bytes: &[u8]) -> SnapResult<PersistOutcome> {
        let record = SnapshotRecord::parse_import(bytes)?;
        let outcome = crate::capture::persist_with_ladder(
            self.catalog.as_ref(),
            &record,
            self.config().max_snapshot_bytes,
        )
        .await?;
        tracing::info!(id = %outcome.record.id, name = %outcome.record.name, level = %outcome.level, "imported snapshot");
        Ok(outcome)
    }

    pub async fn import_file(&self, path: &Path) -> SnapResult<PersistOutcome> {
        let source = ImportSource::read(path).await?;
        self.import(&source.bytes).await
    }

    /// Import several files, skipping and reporting the ones that fail.
    pub async fn import_many(&self, sources: Vec<ImportSource>) -> ImportReport {
        let mut report = ImportReport::default();
        for source in sources {
            match self.import(&source.bytes).await {
                Ok(outcome) => {
                    if outcome.is_degraded() {
                        report.degraded.push(outcome.record.id.clone());
                    }
                    report.imported.push(outcome.record.id);
                }
                Err(e) => {
                    tracing::warn!(file = %source.label, error = %e, "skipping import");
                    report.failed.push((source.label, e));
                }
            }
        }
        report
    }

    /// Serialize a snapshot for download.
    ///
    /// Fails with [`SnapError::ExportBlocked`] until the credential gate allows it.
    pub async fn export(&self, id: &str) -> SnapResult<SnapshotExport> {
        if !self.gate.allows_export().await {
            return Err(SnapError::ExportBlocked);
        }
        SnapshotExport::from_record(&self.get(id).await?)
    }

    /// Run the gate's verification, then export.
    pub async fn export_with_credential(&self, id: &str, credential: &str) -> SnapResult<SnapshotExport> {
        if !self.gate.verify(credential).await? {
            return Err(SnapError::ExportBlocked);
        }
        self.export(id).await
    }

    pub async fn export_to_dir(&self, id: &str, dir: &Path) -> SnapResult<std::path::PathBuf> {
        self.export(id).await?.write_to_dir(dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryContext;
    use crate::snapshot::MemoryCatalog;
    use url::Url;

    fn vault() -> SnapshotVault {
        SnapshotVault::new(Arc::new(MemoryCatalog::new()), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_finished_operations_leave_no_lock_entries() {
        let vault = vault();
        for i in 0..5 {
            let ctx = MemoryContext::new(format!("tab-{i}"), Url::parse("https://x.com/").unwrap());
            vault.capture(&ctx, "s").await.unwrap();
        }
        assert!(vault.in_flight.is_empty());
    }

    #[test]
    fn test_claim_held_until_dropped() {
        let vault = vault();
        let claim = vault.begin("tab").unwrap();
        assert!(matches!(vault.begin("tab"), Err(SnapError::Busy { .. })));
        assert_eq!(vault.in_flight.len(), 1);

        drop(claim);
        assert!(vault.in_flight.is_empty());
        let _again = vault.begin("tab").unwrap();
    }
}
