//! Domain-safety decision channel.
//!
//! When a snapshot's domain differs from the target's, restore suspends until
//! the caller answers. The answer arrives through a [`DomainDecider`]; the
//! usual one is [`ChannelDecider`], which forwards each question to a UI task
//! over a tokio channel.

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// Details shown to the user when domains differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMismatch {
    pub snapshot_id: String,
    pub snapshot_domain: String,
    pub target_domain: String,
    /// Both domains share a registrable domain ("a.example.com" / "b.example.com")
    pub same_site: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainDecision {
    /// Restore onto the current target anyway.
    Proceed,
    /// Send the target to the snapshot's origin and stop.
    NavigateToOriginal,
    Cancel,
}

pub trait DomainDecider: Send + Sync {
    fn decide<'a>(&'a self, mismatch: &'a DomainMismatch) -> BoxFuture<'a, DomainDecision>;
}

/// Answers every mismatch with the same decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub DomainDecision);

impl DomainDecider for FixedDecision {
    fn decide<'a>(&'a self, _mismatch: &'a DomainMismatch) -> BoxFuture<'a, DomainDecision> {
        Box::pin(async move { self.0 })
    }
}

/// A pending question; answer it with [`DecisionRequest::respond`].
#[derive(Debug)]
pub struct DecisionRequest {
    pub mismatch: DomainMismatch,
    reply: oneshot::Sender<DomainDecision>,
}

impl DecisionRequest {
    pub fn respond(self, decision: DomainDecision) {
        // The restore may have been dropped meanwhile; nothing to do then.
        let _ = self.reply.send(decision);
    }
}

/// Forwards mismatches to a receiver owned by the UI.
///
/// Dropping the receiver, or dropping a request without answering, cancels
/// the restore.
#[derive(Debug, Clone)]
pub struct ChannelDecider {
    tx: mpsc::Sender<DecisionRequest>,
}

impl ChannelDecider {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DecisionRequest>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

impl DomainDecider for ChannelDecider {
    fn decide<'a>(&'a self, mismatch: &'a DomainMismatch) -> BoxFuture<'a, DomainDecision> {
        Box::pin(async move {
            let (reply, answer) = oneshot::channel();
            let request = DecisionRequest {
                mismatch: mismatch.clone(),
                reply,
            };
            if self.tx.send(request).await.is_err() {
                tracing::debug!("decision receiver gone, cancelling");
                return DomainDecision::Cancel;
            }
            answer.await.unwrap_or(DomainDecision::Cancel)
        })
    }
}
