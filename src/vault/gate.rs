use crate::base::SnapResult;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};

/// Yes/no predicate consulted before a snapshot may leave the system.
///
/// Credential storage and hashing live outside this crate; a gate only
/// reports whether export is currently allowed and runs the verification
/// that unlocks it.
pub trait CredentialGate: Send + Sync {
    fn allows_export(&self) -> BoxFuture<'_, bool>;

    /// Check `credential`, unlocking export on success.
    fn verify<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, SnapResult<bool>>;
}

/// No credential configured: export is always allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl CredentialGate for OpenGate {
    fn allows_export(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    fn verify<'a>(&'a self, _credential: &'a str) -> BoxFuture<'a, SnapResult<bool>> {
        Box::pin(async { Ok(true) })
    }
}

/// Locked until a credential passes `check`; stays unlocked afterwards.
pub struct PredicateGate<F> {
    check: F,
    unlocked: AtomicBool,
}

impl<F> PredicateGate<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self {
            check,
            unlocked: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }
}

impl<F> CredentialGate for PredicateGate<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows_export(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.unlocked.load(Ordering::SeqCst) })
    }

    fn verify<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, SnapResult<bool>> {
        Box::pin(async move {
            let ok = (self.check)(credential);
            if ok {
                self.unlocked.store(true, Ordering::SeqCst);
            } else {
                tracing::warn!("export credential rejected");
            }
            Ok(ok)
        })
    }
}
