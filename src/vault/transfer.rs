//! Snapshot files moving in and out of the vault.

use crate::base::context::BackendResultExt;
use crate::base::{SnapError, SnapResult};
use crate::snapshot::SnapshotRecord;
use std::path::{Path, PathBuf};

/// A snapshot serialized for download.
#[derive(Debug, Clone)]
pub struct SnapshotExport {
    /// Suggested name, `session_<name>_<id>.json`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SnapshotExport {
    pub fn from_record(record: &SnapshotRecord) -> SnapResult<Self> {
        Ok(Self {
            file_name: record.export_file_name(),
            bytes: record.to_json_pretty()?.into_bytes(),
        })
    }

    /// Write into `dir` under the suggested name.
    pub async fn write_to_dir(&self, dir: &Path) -> SnapResult<PathBuf> {
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "exported snapshot");
        Ok(path)
    }
}

/// One file handed to a multi-file import.
#[derive(Debug, Clone)]
pub struct ImportSource {
    /// File name or other label used in the report
    pub label: String,
    pub bytes: Vec<u8>,
}

impl ImportSource {
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: &Path) -> SnapResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .backend_context(&format!("reading {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

/// Outcome of a multi-file import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids of the stored snapshots, in input order
    pub imported: Vec<String>,
    /// Imports stored with data dropped to fit the size ceiling
    pub degraded: Vec<String>,
    /// `(label, error)` for every file that was skipped
    pub failed: Vec<(String, SnapError)>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.degraded.is_empty()
    }
}
