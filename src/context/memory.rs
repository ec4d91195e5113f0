use crate::base::{SnapError, SnapResult};
use crate::context::TargetContext;
use crate::cookies::{CookieJar, MemoryCookieJar};
use crate::database::{DatabaseBackend, MemoryDatabases};
use crate::storage::{KeyValueBackend, MemoryStore, StoreScope};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use url::Url;

/// A browsing context held entirely in memory.
///
/// Used for headless capture pipelines and as the test double for the
/// engine. Closing it makes every later `url()` call fail, like a closed tab.
#[derive(Clone)]
pub struct MemoryContext {
    id: String,
    url: Arc<RwLock<Url>>,
    partition: Option<String>,
    jar: MemoryCookieJar,
    local: MemoryStore,
    session: MemoryStore,
    databases: MemoryDatabases,
    reloads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MemoryContext {
    pub fn new(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            url: Arc::new(RwLock::new(url)),
            partition: None,
            jar: MemoryCookieJar::new(),
            local: MemoryStore::new(),
            session: MemoryStore::new(),
            databases: MemoryDatabases::new(),
            reloads: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn with_databases(mut self, databases: MemoryDatabases) -> Self {
        self.databases = databases;
        self
    }

    pub fn with_store(mut self, scope: StoreScope, store: MemoryStore) -> Self {
        match scope {
            StoreScope::Local => self.local = store,
            StoreScope::Session => self.session = store,
        }
        self
    }

    pub fn jar(&self) -> &MemoryCookieJar {
        &self.jar
    }

    pub fn store(&self, scope: StoreScope) -> &MemoryStore {
        match scope {
            StoreScope::Local => &self.local,
            StoreScope::Session => &self.session,
        }
    }

    pub fn database_host(&self) -> &MemoryDatabases {
        &self.databases
    }

    pub fn current_url(&self) -> Url {
        self.url.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> SnapResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SnapError::target_unavailable(format!("context {} was closed", self.id)));
        }
        Ok(())
    }
}

impl TargetContext for MemoryContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self) -> BoxFuture<'_, SnapResult<Url>> {
        Box::pin(async move {
            self.ensure_open()?;
            Ok(self.current_url())
        })
    }

    fn cookie_partition(&self) -> Option<String> {
        self.partition.clone()
    }

    fn cookie_jar(&self) -> Arc<dyn CookieJar> {
        Arc::new(self.jar.clone())
    }

    fn storage(&self, scope: StoreScope) -> Arc<dyn KeyValueBackend> {
        Arc::new(self.store(scope).clone())
    }

    fn databases(&self) -> Arc<dyn DatabaseBackend> {
        Arc::new(self.databases.clone())
    }

    fn reload(&self) -> BoxFuture<'_, SnapResult<()>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.reloads.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(context = %self.id, "reloaded");
            Ok(())
        })
    }

    fn navigate<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, SnapResult<()>> {
        Box::pin(async move {
            self.ensure_open()?;
            *self.url.write().unwrap_or_else(|e| e.into_inner()) = url.clone();
            tracing::debug!(context = %self.id, url = %url, "navigated");
            Ok(())
        })
    }
}
