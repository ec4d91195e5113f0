//! SQLite-backed snapshot catalog.

use crate::base::{SnapError, SnapResult};
use crate::snapshot::catalog::SnapshotCatalog;
use futures::future::BoxFuture;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS snapshots (
    id TEXT PRIMARY KEY NOT NULL,
    body BLOB NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Snapshot catalog stored in one SQLite table.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
    quota: Option<usize>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> SnapResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SnapResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SnapResult<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            quota: None,
        })
    }

    /// Reject writes that would grow the stored bodies past `bytes` in total.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    fn lock(&self) -> SnapResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SnapError::backend("locking snapshot catalog", "connection mutex poisoned"))
    }

    fn get_sync(&self, id: &str) -> SnapResult<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT body FROM snapshots WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn set_sync(&self, id: &str, body: &[u8]) -> SnapResult<()> {
        let conn = self.lock()?;
        if let Some(limit) = self.quota {
            let used: i64 = conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM snapshots WHERE id != ?1",
                params![id],
                |row| row.get(0),
            )?;
            let bytes = used as usize + body.len();
            if bytes > limit {
                return Err(SnapError::QuotaExceeded { bytes, limit });
            }
        }
        conn.execute(
            "INSERT INTO snapshots (id, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET body = ?2, updated_at = ?3",
            params![id, body, OffsetDateTime::now_utc().unix_timestamp()],
        )?;
        Ok(())
    }

    fn remove_sync(&self, id: &str) -> SnapResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn keys_sync(&self) -> SnapResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM snapshots ORDER BY updated_at DESC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

impl SnapshotCatalog for SqliteCatalog {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<Option<Vec<u8>>>> {
        Box::pin(async move { self.get_sync(id) })
    }

    fn set<'a>(&'a self, id: &'a str, body: Vec<u8>) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move { self.set_sync(id, &body) })
    }

    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move { self.remove_sync(id) })
    }

    fn keys(&self) -> BoxFuture<'_, SnapResult<Vec<String>>> {
        Box::pin(async move { self.keys_sync() })
    }
}
