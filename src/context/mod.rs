//! The browsing context a snapshot is captured from or restored onto.
//!
//! The engine never touches browser state directly. A [`TargetContext`] hands
//! out backends that execute inside the context (an extension content script,
//! a devtools session, an embedded engine) and resolve asynchronously.

pub mod memory;

use crate::base::SnapResult;
use crate::cookies::CookieJar;
use crate::database::DatabaseBackend;
use crate::storage::{KeyValueBackend, StoreScope};
use futures::future::BoxFuture;
use std::sync::Arc;
use url::Url;

pub use memory::MemoryContext;

/// Target-context execution facility.
///
/// Backends returned by a context are bound to the origin the context shows
/// at the time they are used.
pub trait TargetContext: Send + Sync {
    /// Stable identifier, used to serialize captures and restores per target.
    fn id(&self) -> &str;

    /// URL currently shown.
    ///
    /// Fails with [`SnapError::TargetUnavailable`](crate::base::SnapError::TargetUnavailable)
    /// once the context is gone.
    fn url(&self) -> BoxFuture<'_, SnapResult<Url>>;

    /// Cookie partition (container / store id) the context writes into.
    fn cookie_partition(&self) -> Option<String> {
        None
    }

    fn cookie_jar(&self) -> Arc<dyn CookieJar>;

    fn storage(&self, scope: StoreScope) -> Arc<dyn KeyValueBackend>;

    fn databases(&self) -> Arc<dyn DatabaseBackend>;

    /// Reload the context so restored state is picked up.
    fn reload(&self) -> BoxFuture<'_, SnapResult<()>>;

    fn navigate<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, SnapResult<()>>;
}

/// Host (and port, if any) of `url`, the form snapshot domains are kept in.
pub fn domain_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
