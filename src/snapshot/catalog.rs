use crate::base::{SnapError, SnapResult};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Durable key-value catalog holding serialized snapshots by id.
///
/// The catalog is a single shared resource. Read-modify-write sequences
/// across keys are serialized by the caller.
pub trait SnapshotCatalog: Send + Sync {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<Option<Vec<u8>>>>;

    /// Store `body` under `id`.
    ///
    /// Fails with [`SnapError::QuotaExceeded`] when the catalog cannot hold it.
    fn set<'a>(&'a self, id: &'a str, body: Vec<u8>) -> BoxFuture<'a, SnapResult<()>>;

    /// Removing an absent id is not an error.
    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<()>>;

    fn keys(&self) -> BoxFuture<'_, SnapResult<Vec<String>>>;
}

/// In-memory catalog with an optional total byte quota.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    entries: Arc<DashMap<String, Vec<u8>>>,
    quota: Option<usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Bytes held, not counting the entry stored under `except`.
    fn used_bytes(&self, except: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key() != except)
            .map(|e| e.value().len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotCatalog for MemoryCatalog {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<Option<Vec<u8>>>> {
        Box::pin(async move { Ok(self.entries.get(id).map(|e| e.value().clone())) })
    }

    fn set<'a>(&'a self, id: &'a str, body: Vec<u8>) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            if let Some(limit) = self.quota {
                let bytes = self.used_bytes(id) + body.len();
                if bytes > limit {
                    return Err(SnapError::QuotaExceeded { bytes, limit });
                }
            }
            self.entries.insert(id.to_string(), body);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            self.entries.remove(id);
            Ok(())
        })
    }

    fn keys(&self) -> BoxFuture<'_, SnapResult<Vec<String>>> {
        Box::pin(async move { Ok(self.entries.iter().map(|e| e.key().clone()).collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_quota_counts_other_entries_only() {
        let catalog = MemoryCatalog::new().with_quota(10);
        catalog.set("a", vec![0; 6]).await.unwrap();
        // Replacing "a" frees its old bytes first.
        catalog.set("a", vec![0; 8]).await.unwrap();

        let err = catalog.set("b", vec![0; 3]).await.unwrap_err();
        assert!(matches!(err, SnapError::QuotaExceeded { bytes: 11, limit: 10 }));
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_get_remove() {
        let catalog = MemoryCatalog::new();
        catalog.set("id", b"{}".to_vec()).await.unwrap();
        assert_eq!(catalog.get("id").await.unwrap().as_deref(), Some(&b"{}"[..]));
        catalog.remove("id").await.unwrap();
        catalog.remove("id").await.unwrap();
        assert_eq!(catalog.get("id").await.unwrap(), None);
    }
}
