use crate::base::{SnapError, SnapResult};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Flat string-to-string map held by one store.
pub type KeyValueMap = BTreeMap<String, String>;

/// Which of the two origin-scoped stores a mirror addresses.
///
/// Store A persists across sessions (`localStorage`); store B lives for one
/// browsing session (`sessionStorage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreScope {
    Local,
    Session,
}

impl StoreScope {
    pub const ALL: [StoreScope; 2] = [StoreScope::Local, StoreScope::Session];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::Local => "localStorage",
            StoreScope::Session => "sessionStorage",
        }
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live key-value store inside a target context.
pub trait KeyValueBackend: Send + Sync {
    fn entries(&self) -> BoxFuture<'_, SnapResult<KeyValueMap>>;

    fn clear(&self) -> BoxFuture<'_, SnapResult<()>>;

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, SnapResult<()>>;

    /// Removing an absent key is not an error.
    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, SnapResult<()>>;
}

/// Outcome of clearing a store and writing a snapshot's items back.
#[derive(Debug, Default)]
pub struct StoreReplay {
    pub restored: usize,
    pub failed: usize,
    pub failures: Vec<(String, SnapError)>,
}

/// Mirror over one scoped store.
#[derive(Clone)]
pub struct KeyValueMirror {
    backend: Arc<dyn KeyValueBackend>,
    scope: StoreScope,
}

impl KeyValueMirror {
    pub fn new(backend: Arc<dyn KeyValueBackend>, scope: StoreScope) -> Self {
        Self { backend, scope }
    }

    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    pub async fn list_all(&self) -> SnapResult<KeyValueMap> {
        let items = self.backend.entries().await?;
        tracing::debug!(scope = %self.scope, count = items.len(), "listed store items");
        Ok(items)
    }

    pub async fn clear(&self) -> SnapResult<()> {
        self.backend.clear().await
    }

    pub async fn set_item(&self, key: &str, value: &str) -> SnapResult<()> {
        self.backend.set_item(key, value).await
    }

    pub async fn remove_item(&self, key: &str) -> SnapResult<()> {
        self.backend.remove_item(key).await
    }

    /// Write every item, returning how many were stored.
    ///
    /// A failed item is logged and skipped. Only a fatal error stops the loop.
    pub async fn set_many(&self, items: &KeyValueMap) -> SnapResult<usize> {
        Ok(self.write_items(items).await?.restored)
    }

    /// Clear the store, then write `items`.
    pub async fn replace_all(&self, items: &KeyValueMap) -> SnapResult<StoreReplay> {
        self.clear().await?;
        let replay = self.write_items(items).await?;
        tracing::info!(
            scope = %self.scope,
            restored = replay.restored,
            failed = replay.failed,
            "store replay complete"
        );
        Ok(replay)
    }

    async fn write_items(&self, items: &KeyValueMap) -> SnapResult<StoreReplay> {
        let mut replay = StoreReplay::default();
        for (key, value) in items {
            match self.backend.set_item(key, value).await {
                Ok(()) => replay.restored += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(scope = %self.scope, key = %key, error = %e, "failed to restore item");
                    replay.failed += 1;
                    replay.failures.push((key.clone(), e));
                }
            }
        }
        Ok(replay)
    }
}
