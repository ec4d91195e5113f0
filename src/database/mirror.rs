use crate::base::{SnapError, SnapResult};
use crate::value::{NormalizedValue, Normalizer, RuntimeValue};
use futures::future::{join_all, BoxFuture};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collection name to its records, in insertion order.
pub type Collections = BTreeMap<String, Vec<NormalizedValue>>;

/// Database name to its collections, as stored in a snapshot.
pub type DatabaseSet = BTreeMap<String, Collections>;

/// Structured-record databases of one origin (IndexedDB and the like).
pub trait DatabaseBackend: Send + Sync {
    fn list_databases(&self) -> BoxFuture<'_, SnapResult<Vec<String>>>;

    fn list_collections<'a>(&'a self, database: &'a str) -> BoxFuture<'a, SnapResult<Vec<String>>>;

    /// Every record of one collection.
    fn read_collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, SnapResult<Vec<RuntimeValue>>>;

    /// Deleting a database that does not exist is not an error.
    fn delete_database<'a>(&'a self, database: &'a str) -> BoxFuture<'a, SnapResult<()>>;

    /// Create an empty database with the given collections. Record keys are
    /// generated by the backend in insertion order.
    fn create_database<'a>(
        &'a self,
        database: &'a str,
        collections: &'a [String],
    ) -> BoxFuture<'a, SnapResult<()>>;

    /// Append records to a collection, returning how many were stored.
    fn insert_records<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
        records: Vec<RuntimeValue>,
    ) -> BoxFuture<'a, SnapResult<usize>>;
}

/// Per-collection failure inside an export or recreate.
#[derive(Debug, Clone)]
pub struct CollectionFailure {
    pub collection: String,
    pub error: SnapError,
}

/// Result of reading one database.
#[derive(Debug, Default)]
pub struct DatabaseExport {
    pub collections: Collections,
    pub failures: Vec<CollectionFailure>,
}

/// Result of recreating one database from a snapshot.
#[derive(Debug, Default)]
pub struct RecreateReport {
    pub database: String,
    pub records_inserted: usize,
    /// Elided values (binary payloads, depth cut-offs) written as placeholders
    pub elided_values: usize,
    pub failures: Vec<CollectionFailure>,
}

impl RecreateReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct DatabaseMirror {
    backend: Arc<dyn DatabaseBackend>,
    normalizer: Normalizer,
}

impl DatabaseMirror {
    pub fn new(backend: Arc<dyn DatabaseBackend>, normalizer: Normalizer) -> Self {
        Self {
            backend,
            normalizer,
        }
    }

    pub async fn list_databases(&self) -> SnapResult<Vec<String>> {
        self.backend.list_databases().await
    }

    /// Read and normalize every collection of `name`.
    ///
    /// A collection that fails to read is reported and left out; the other
    /// collections are still exported.
    pub async fn export_all(&self, name: &str) -> SnapResult<DatabaseExport> {
        let collection_names = self.backend.list_collections(name).await?;
        let mut export = DatabaseExport::default();

        for collection in collection_names {
            match self.backend.read_collection(name, &collection).await {
                Ok(records) => {
                    let normalized: Vec<_> = records
                        .iter()
                        .map(|r| self.normalizer.normalize(r))
                        .collect();
                    tracing::debug!(
                        database = name,
                        collection = %collection,
                        records = normalized.len(),
                        "exported collection"
                    );
                    export.collections.insert(collection, normalized);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(error) => {
                    tracing::warn!(database = name, collection = %collection, error = %error, "failed to export collection");
                    export.failures.push(CollectionFailure { collection, error });
                }
            }
        }

        Ok(export)
    }

    /// Export every database of the origin.
    ///
    /// Returns the exported set and the failures, keyed by database. A
    /// database whose collections cannot even be listed is reported with an
    /// empty collection name.
    pub async fn export_every(&self) -> SnapResult<(DatabaseSet, BTreeMap<String, Vec<CollectionFailure>>)> {
        let mut set = DatabaseSet::new();
        let mut failures = BTreeMap::new();

        for name in self.list_databases().await? {
            match self.export_all(&name).await {
                Ok(export) => {
                    if !export.failures.is_empty() {
                        failures.insert(name.clone(), export.failures);
                    }
                    set.insert(name, export.collections);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(error) => {
                    tracing::warn!(database = %name, error = %error, "failed to export database");
                    failures.insert(
                        name,
                        vec![CollectionFailure {
                            collection: String::new(),
                            error,
                        }],
                    );
                }
            }
        }

        Ok((set, failures))
    }

    /// Destructively replace database `name` with the snapshot's collections.
    ///
    /// Deleting or creating the database is all-or-nothing; after that each
    /// collection is filled independently and concurrently, and a failed
    /// collection does not stop the others.
    pub async fn recreate(&self, name: &str, collections: &Collections) -> SnapResult<RecreateReport> {
        self.backend.delete_database(name).await?;
        let names: Vec<String> = collections.keys().cloned().collect();
        self.backend.create_database(name, &names).await?;

        let inserts = collections.iter().map(|(collection, records)| async move {
            let elided: usize = records.iter().map(NormalizedValue::elided_count).sum();
            let values: Vec<RuntimeValue> = records
                .iter()
                .map(|r| self.normalizer.denormalize(r))
                .collect();
            let result = self.backend.insert_records(name, collection, values).await;
            (collection, elided, result)
        });

        let mut report = RecreateReport {
            database: name.to_string(),
            ..Default::default()
        };
        for (collection, elided, result) in join_all(inserts).await {
            match result {
                Ok(count) => {
                    report.records_inserted += count;
                    report.elided_values += elided;
                }
                Err(error) => {
                    tracing::warn!(database = name, collection = %collection, error = %error, "failed to restore collection");
                    report.failures.push(CollectionFailure {
                        collection: collection.clone(),
                        error,
                    });
                }
            }
        }

        if report.elided_values > 0 {
            tracing::info!(
                database = name,
                elided = report.elided_values,
                "restored database contains placeholders for elided values"
            );
        }
        Ok(report)
    }
}
