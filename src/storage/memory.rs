use crate::base::{SnapError, SnapResult};
use crate::storage::mirror::{KeyValueBackend, KeyValueMap};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;

/// In-memory key-value store.
///
/// An optional item quota makes `set_item` fail once the store holds that many
/// keys, which is how a full `localStorage` behaves.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<String, String>>,
    max_items: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueBackend for MemoryStore {
    fn entries(&self) -> BoxFuture<'_, SnapResult<KeyValueMap>> {
        Box::pin(async move {
            Ok(self
                .items
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect())
        })
    }

    fn clear(&self) -> BoxFuture<'_, SnapResult<()>> {
        Box::pin(async move {
            self.items.clear();
            Ok(())
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            if let Some(max) = self.max_items {
                if !self.items.contains_key(key) && self.items.len() >= max {
                    return Err(SnapError::backend(
                        format!("setting item {key}"),
                        "store quota exceeded",
                    ));
                }
            }
            self.items.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            self.items.remove(key);
            Ok(())
        })
    }
}
