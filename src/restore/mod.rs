//! Restore: replay a snapshot onto a live target context.
//!
//! ```text
//! Init -> DomainCheck -> CookieReplay -> StoreReplay -> DatabaseReplay -> Finalize -> Done
//!              |               \______________\_______________\
//!              v                                               v
//!           Aborted                                          Failed
//! ```
//!
//! `DomainCheck` is the only suspension point that can be cancelled. Once
//! replay starts it runs to completion: per-item failures are counted and
//! skipped, and only losing the target context moves to `Failed`.
//!
//! Database replay runs on a spawned task under a fallback timer. If the timer
//! fires first, the unfinished work is aborted and restore finalizes anyway, so
//! no database writes happen after `restore` returns.

pub mod decision;

use crate::base::{SnapError, SnapResult};
use crate::config::EngineConfig;
use crate::context::{domain_of, TargetContext};
use crate::cookies::psl;
use crate::cookies::CookieMirror;
use crate::database::DatabaseMirror;
use crate::snapshot::SnapshotRecord;
use crate::storage::{KeyValueMirror, StoreScope};
use crate::value::Normalizer;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub use decision::{
    ChannelDecider, DecisionRequest, DomainDecider, DomainDecision, DomainMismatch, FixedDecision,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RestoreState {
    Init,
    DomainCheck,
    CookieReplay,
    StoreReplay,
    DatabaseReplay,
    Finalize,
    Done,
    Aborted,
    Failed,
}

impl RestoreState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RestoreState::Done | RestoreState::Aborted | RestoreState::Failed
        )
    }
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counts and outcome of one restore.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub snapshot_id: String,
    pub cookies_removed: usize,
    pub cookies_restored: usize,
    pub cookies_failed: usize,
    pub key_value_items_restored: usize,
    pub key_value_items_failed: usize,
    pub databases_total: usize,
    /// Databases fully recreated before finalize
    pub databases_restored: usize,
    /// Placeholders written in place of elided values
    pub elided_values: usize,
    /// The database fallback timer fired
    pub timed_out: bool,
    /// Set when the user chose to navigate to the snapshot's origin instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
    pub final_state: Option<RestoreState>,
    pub transitions: Vec<RestoreState>,
    pub warnings: Vec<String>,
}

impl RestoreReport {
    /// Everything in the snapshot made it onto the target.
    pub fn is_complete(&self) -> bool {
        self.final_state == Some(RestoreState::Done)
            && !self.timed_out
            && self.cookies_failed == 0
            && self.key_value_items_failed == 0
            && self.databases_restored == self.databases_total
            && self.warnings.is_empty()
    }
}

/// Drives the restore state machine for one UI session.
///
/// State changes are published on a watch channel; see [`subscribe`](Self::subscribe).
pub struct RestoreOrchestrator {
    config: EngineConfig,
    decider: Arc<dyn DomainDecider>,
    state: watch::Sender<RestoreState>,
}

impl RestoreOrchestrator {
    pub fn new(config: EngineConfig, decider: Arc<dyn DomainDecider>) -> Self {
        let (state, _) = watch::channel(RestoreState::Init);
        Self {
            config,
            decider,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RestoreState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> RestoreState {
        *self.state.borrow()
    }

    fn transition(&self, report: &mut RestoreReport, next: RestoreState) {
        tracing::debug!(snapshot = %report.snapshot_id, state = %next, "restore state");
        report.transitions.push(next);
        if next.is_terminal() {
            report.final_state = Some(next);
        }
        self.state.send_replace(next);
    }

    /// Stop in `Failed` and hand the error back.
    fn fail(&self, report: &mut RestoreReport, error: SnapError) -> SnapError {
        tracing::error!(snapshot = %report.snapshot_id, error = %error, "restore failed");
        self.transition(report, RestoreState::Failed);
        error
    }

    /// Record a stage-level failure, or abort on a fatal one.
    fn absorb(&self, report: &mut RestoreReport, stage: &str, error: SnapError) -> SnapResult<()> {
        if error.is_fatal() {
            return Err(self.fail(report, error));
        }
        tracing::warn!(stage, error = %error, "restore stage partially failed");
        report.warnings.push(format!("{stage}: {error}"));
        Ok(())
    }

    /// Replay `snapshot` onto `ctx`.
    ///
    /// Returns the report on `Done` and on `Aborted` after navigating to the
    /// original origin. A cancelled domain decision ends in `Aborted` with
    /// [`SnapError::DecisionCancelled`].
    pub async fn restore(
        &self,
        ctx: &dyn TargetContext,
        snapshot: &SnapshotRecord,
    ) -> SnapResult<RestoreReport> {
        let mut report = RestoreReport {
            snapshot_id: snapshot.id.clone(),
            databases_total: snapshot.embedded_databases.len(),
            ..Default::default()
        };
        self.transition(&mut report, RestoreState::Init);

        // DomainCheck
        self.transition(&mut report, RestoreState::DomainCheck);
        let target_url = match ctx.url().await {
            Ok(url) => url,
            Err(e) => return Err(self.fail(&mut report, e)),
        };
        let target_domain = domain_of(&target_url);

        if !target_domain.eq_ignore_ascii_case(&snapshot.domain) {
            let mismatch = DomainMismatch {
                snapshot_id: snapshot.id.clone(),
                snapshot_domain: snapshot.domain.clone(),
                target_domain: target_domain.clone(),
                same_site: psl::same_site(
                    snapshot.domain.split(':').next().unwrap_or(""),
                    target_url.host_str().unwrap_or(""),
                ),
            };
            tracing::info!(
                snapshot_domain = %mismatch.snapshot_domain,
                target_domain = %mismatch.target_domain,
                same_site = mismatch.same_site,
                "domain mismatch, waiting for decision"
            );

            match self.decider.decide(&mismatch).await {
                DomainDecision::Proceed => {
                    tracing::info!("restoring onto a different domain");
                }
                DomainDecision::NavigateToOriginal => {
                    let original = match snapshot.original_url() {
                        Ok(url) => url,
                        Err(e) => return Err(self.fail(&mut report, e)),
                    };
                    if let Err(e) = ctx.navigate(&original).await {
                        return Err(self.fail(&mut report, e));
                    }
                    report.navigated_to = Some(original.to_string());
                    self.transition(&mut report, RestoreState::Aborted);
                    return Ok(report);
                }
                DomainDecision::Cancel => {
                    self.transition(&mut report, RestoreState::Aborted);
                    return Err(SnapError::DecisionCancelled);
                }
            }
        }

        // CookieReplay
        self.transition(&mut report, RestoreState::CookieReplay);
        let cookies = CookieMirror::new(ctx.cookie_jar(), target_url.clone())
            .with_partition(ctx.cookie_partition())
            .check_public_suffix(self.config.validate_public_suffix);
        match cookies.replace_all(&snapshot.cookies).await {
            Ok(replay) => {
                report.cookies_removed = replay.removed;
                report.cookies_restored = replay.restored;
                report.cookies_failed = replay.failed;
            }
            Err(e) => self.absorb(&mut report, "cookies", e)?,
        }

        // StoreReplay
        self.transition(&mut report, RestoreState::StoreReplay);
        for scope in StoreScope::ALL {
            let mirror = KeyValueMirror::new(ctx.storage(scope), scope);
            match mirror.replace_all(snapshot.store(scope)).await {
                Ok(replay) => {
                    report.key_value_items_restored += replay.restored;
                    report.key_value_items_failed += replay.failed;
                }
                Err(e) => self.absorb(&mut report, scope.as_str(), e)?,
            }
        }

        // DatabaseReplay, skipped entirely when there is nothing to replay
        if snapshot.embedded_databases.is_empty() {
            if !self.config.finalize_delay.is_zero() {
                tokio::time::sleep(self.config.finalize_delay).await;
            }
        } else {
            self.transition(&mut report, RestoreState::DatabaseReplay);
            self.replay_databases(ctx, snapshot, &mut report).await?;
        }

        // Finalize
        self.transition(&mut report, RestoreState::Finalize);
        if let Err(e) = ctx.reload().await {
            self.absorb(&mut report, "reload", e)?;
        }
        self.transition(&mut report, RestoreState::Done);

        tracing::info!(
            snapshot = %report.snapshot_id,
            cookies_restored = report.cookies_restored,
            cookies_failed = report.cookies_failed,
            key_value_items_restored = report.key_value_items_restored,
            databases_restored = report.databases_restored,
            databases_total = report.databases_total,
            timed_out = report.timed_out,
            "restore complete"
        );
        Ok(report)
    }

    async fn replay_databases(
        &self,
        ctx: &dyn TargetContext,
        snapshot: &SnapshotRecord,
        report: &mut RestoreReport,
    ) -> SnapResult<()> {
        let mirror = DatabaseMirror::new(
            ctx.databases(),
            Normalizer::new(self.config.max_normalize_depth),
        );
        let databases = snapshot.embedded_databases.clone();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let mut task = tokio::spawn(async move {
            let jobs = databases.iter().map(|(name, collections)| {
                let mirror = &mirror;
                let counter = &counter;
                async move {
                    let result = mirror.recreate(name, collections).await;
                    if let Ok(recreated) = &result {
                        if recreated.is_complete() {
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    (name.clone(), result)
                }
            });
            join_all(jobs).await
        });

        let timeout = self.config.database_replay_timeout;
        let outcome = tokio::time::timeout(timeout, &mut task).await;
        match outcome {
            Ok(Ok(results)) => {
                for (name, result) in results {
                    match result {
                        Ok(recreated) => {
                            report.elided_values += recreated.elided_values;
                            for failure in recreated.failures {
                                report.warnings.push(format!(
                                    "database {name}/{}: {}",
                                    failure.collection, failure.error
                                ));
                            }
                        }
                        Err(e) => self.absorb(report, &format!("database {name}"), e)?,
                    }
                }
                report.databases_restored = finished.load(Ordering::SeqCst);
                tokio::time::sleep(self.config.database_settle_delay).await;
            }
            Ok(Err(join_error)) => {
                report.databases_restored = finished.load(Ordering::SeqCst);
                report
                    .warnings
                    .push(format!("database replay task failed: {join_error}"));
            }
            Err(_) => {
                // No database writes may outlive the restore.
                task.abort();
                let _ = (&mut task).await;
                report.timed_out = true;
                report.databases_restored = finished.load(Ordering::SeqCst);
                tracing::warn!(
                    after = ?timeout,
                    restored = report.databases_restored,
                    total = report.databases_total,
                    "database replay timer fired, stopped replay and finalizing with partial databases"
                );
                report.warnings.push(
                    SnapError::Timeout {
                        stage: "database replay".to_string(),
                        after: timeout,
                    }
                    .to_string(),
                );
            }
        }
        Ok(())
    }
}
