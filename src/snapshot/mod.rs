//! Snapshot records and the catalogs that persist them.

pub mod catalog;
pub mod record;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use catalog::{MemoryCatalog, SnapshotCatalog};
pub use record::{SnapshotRecord, SnapshotSummary};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalog;
