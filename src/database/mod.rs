//! Embedded structured-record databases.
//!
//! A database is copied opaquely, collection by collection. Records pass
//! through the [`Normalizer`](crate::value::Normalizer) on export and back
//! through its inverse on recreate; record keys are regenerated by the target.

pub mod memory;
pub mod mirror;

pub use memory::MemoryDatabases;
pub use mirror::{
    CollectionFailure, Collections, DatabaseBackend, DatabaseExport, DatabaseMirror, DatabaseSet,
    RecreateReport,
};
