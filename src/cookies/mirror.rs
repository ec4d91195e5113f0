//! Cookie mirror: reads and rewrites the cookie jar of one target origin.

use crate::base::{SnapError, SnapResult};
use crate::cookies::canonical_cookie::CookieRecord;
use futures::future::BoxFuture;
use std::sync::Arc;
use url::Url;

/// Live cookie jar of a browsing context.
///
/// Implementations execute inside the target context (an extension API, a
/// devtools session, an embedded engine). Every write takes effect in the
/// live jar immediately.
pub trait CookieJar: Send + Sync {
    /// All cookies visible to `url`.
    fn get_all<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, SnapResult<Vec<CookieRecord>>>;

    /// Remove the cookie called `name` visible to `url`.
    ///
    /// Returns [`SnapError::NotFound`] if there is no such cookie.
    fn remove<'a>(&'a self, name: &'a str, url: &'a Url) -> BoxFuture<'a, SnapResult<()>>;

    /// Write `cookie` through `url`, returning the cookie as stored.
    fn set<'a>(&'a self, cookie: CookieRecord, url: &'a Url)
        -> BoxFuture<'a, SnapResult<CookieRecord>>;
}

/// Outcome of wiping and rewriting a jar.
#[derive(Debug, Default)]
pub struct CookieReplay {
    pub removed: usize,
    pub restored: usize,
    pub failed: usize,
    /// `(cookie name, error)` for every record that could not be written
    pub failures: Vec<(String, SnapError)>,
}

/// Cookie operations scoped to one target origin and cookie partition.
#[derive(Clone)]
pub struct CookieMirror {
    jar: Arc<dyn CookieJar>,
    target: Url,
    partition: Option<String>,
    check_public_suffix: bool,
}

impl CookieMirror {
    pub fn new(jar: Arc<dyn CookieJar>, target: Url) -> Self {
        Self {
            jar,
            target,
            partition: None,
            check_public_suffix: true,
        }
    }

    /// Re-point every written cookie to this partition (`None` is the default store).
    pub fn with_partition(mut self, partition: Option<String>) -> Self {
        self.partition = partition;
        self
    }

    /// Enable or disable public suffix screening on write.
    pub fn check_public_suffix(mut self, enabled: bool) -> Self {
        self.check_public_suffix = enabled;
        self
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub async fn list_all(&self) -> SnapResult<Vec<CookieRecord>> {
        let cookies = self.jar.get_all(&self.target).await?;
        tracing::debug!(url = %self.target, count = cookies.len(), "listed cookies");
        Ok(cookies)
    }

    pub async fn remove(&self, name: &str) -> SnapResult<()> {
        self.jar.remove(name, &self.target).await
    }

    /// Validate and write one record.
    ///
    /// The session/expiration invariant is enforced before validation, so a
    /// session cookie carrying an expiry is written without it.
    pub async fn write(&self, record: CookieRecord) -> SnapResult<CookieRecord> {
        let mut record = record.normalized();
        record.store_id = self.partition.clone();
        record.validate(self.check_public_suffix)?;
        self.jar.set(record, &self.target).await
    }

    /// Write an edited record that previously had `old_name` / `old_host_only`.
    ///
    /// A renamed cookie, or one that switched between host-only and domain
    /// scope, is removed first; the jar never renames on its own.
    pub async fn update(
        &self,
        old_name: &str,
        old_host_only: bool,
        record: CookieRecord,
    ) -> SnapResult<CookieRecord> {
        if old_name != record.name || old_host_only != record.host_only {
            match self.remove(old_name).await {
                Ok(()) | Err(SnapError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        self.write(record).await
    }

    /// Delete every cookie currently visible to the target.
    ///
    /// Returns how many were removed. A cookie that vanished in the meantime
    /// is ignored; any other failure is logged and skipped.
    pub async fn clear(&self) -> SnapResult<usize> {
        let current = self.list_all().await?;
        let mut removed = 0;
        for cookie in &current {
            match self.remove(&cookie.name).await {
                Ok(()) => removed += 1,
                Err(SnapError::NotFound { .. }) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(cookie = %cookie.name, error = %e, "failed to remove cookie"),
            }
        }
        Ok(removed)
    }

    /// Wipe the jar, then write every record, counting per-record outcomes.
    ///
    /// Only a fatal error (the target went away) aborts the loop.
    pub async fn replace_all(&self, records: &[CookieRecord]) -> SnapResult<CookieReplay> {
        let mut replay = CookieReplay {
            removed: self.clear().await?,
            ..Default::default()
        };

        for record in records {
            match self.write(record.clone()).await {
                Ok(_) => replay.restored += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(cookie = %record.name, error = %e, "failed to restore cookie");
                    replay.failed += 1;
                    replay.failures.push((record.name.clone(), e));
                }
            }
        }

        tracing::info!(
            removed = replay.removed,
            restored = replay.restored,
            failed = replay.failed,
            "cookie replay complete"
        );
        Ok(replay)
    }
}
