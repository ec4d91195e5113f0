use crate::base::{SnapError, SnapResult};
use crate::database::mirror::DatabaseBackend;
use crate::value::RuntimeValue;
use dashmap::{DashMap, DashSet};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

type Database = BTreeMap<String, Vec<RuntimeValue>>;

/// In-memory database host for one origin.
///
/// Collections can be marked as failing, and inserts can be slowed down, to
/// exercise partial restores and the database replay timer.
#[derive(Clone, Default)]
pub struct MemoryDatabases {
    databases: Arc<DashMap<String, Database>>,
    failing: Arc<DashSet<(String, String)>>,
    insert_delay: Option<Duration>,
}

impl MemoryDatabases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection with the given records.
    pub fn put_collection(&self, database: &str, collection: &str, records: Vec<RuntimeValue>) {
        self.databases
            .entry(database.to_string())
            .or_default()
            .insert(collection.to_string(), records);
    }

    pub fn collection(&self, database: &str, collection: &str) -> Option<Vec<RuntimeValue>> {
        self.databases
            .get(database)
            .and_then(|db| db.get(collection).cloned())
    }

    pub fn contains(&self, database: &str) -> bool {
        self.databases.contains_key(database)
    }

    /// Reads of and inserts into this collection fail from now on.
    pub fn fail_collection(&self, database: &str, collection: &str) {
        self.failing
            .insert((database.to_string(), collection.to_string()));
    }

    /// Sleep this long before every insert.
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    fn check(&self, database: &str, collection: &str, operation: &str) -> SnapResult<()> {
        if self
            .failing
            .contains(&(database.to_string(), collection.to_string()))
        {
            return Err(SnapError::backend(
                format!("{operation} {database}/{collection}"),
                "collection is unavailable",
            ));
        }
        Ok(())
    }
}

impl DatabaseBackend for MemoryDatabases {
    fn list_databases(&self) -> BoxFuture<'_, SnapResult<Vec<String>>> {
        Box::pin(async move {
            let mut names: Vec<String> = self.databases.iter().map(|e| e.key().clone()).collect();
            names.sort();
            Ok(names)
        })
    }

    fn list_collections<'a>(&'a self, database: &'a str) -> BoxFuture<'a, SnapResult<Vec<String>>> {
        Box::pin(async move {
            self.databases
                .get(database)
                .map(|db| db.keys().cloned().collect())
                .ok_or_else(|| SnapError::not_found(format!("database {database}")))
        })
    }

    fn read_collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, SnapResult<Vec<RuntimeValue>>> {
        Box::pin(async move {
            self.check(database, collection, "reading")?;
            self.collection(database, collection)
                .ok_or_else(|| SnapError::not_found(format!("collection {database}/{collection}")))
        })
    }

    fn delete_database<'a>(&'a self, database: &'a str) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            self.databases.remove(database);
            Ok(())
        })
    }

    fn create_database<'a>(
        &'a self,
        database: &'a str,
        collections: &'a [String],
    ) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            let db = collections
                .iter()
                .map(|c| (c.clone(), Vec::new()))
                .collect();
            self.databases.insert(database.to_string(), db);
            Ok(())
        })
    }

    fn insert_records<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
        records: Vec<RuntimeValue>,
    ) -> BoxFuture<'a, SnapResult<usize>> {
        Box::pin(async move {
            if let Some(delay) = self.insert_delay {
                tokio::time::sleep(delay).await;
            }
            self.check(database, collection, "writing")?;

            let mut db = self
                .databases
                .get_mut(database)
                .ok_or_else(|| SnapError::not_found(format!("database {database}")))?;
            let target = db
                .get_mut(collection)
                .ok_or_else(|| SnapError::not_found(format!("collection {database}/{collection}")))?;
            let count = records.len();
            target.extend(records);
            Ok(count)
        })
    }
}
