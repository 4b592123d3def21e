use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::Connectivity;
use crate::db::QueueRepository;
use crate::models::{OperationKind, PendingOperation};
use crate::remote::{RemoteError, RemoteStore};
use crate::request::KeyFilter;

/// A queued operation that could not be applied remotely during a pass.
///
/// It stays in the queue and is retried verbatim on the next pass.
#[derive(Error, Debug)]
pub enum ReplayFailure {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("payload has no value for key column '{0}'")]
    MissingKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySyncing,
    Offline,
}

/// Counts for one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Operations in the snapshot taken at pass start.
    pub attempted: usize,
    /// Operations applied remotely and removed from the queue.
    pub replayed: usize,
    /// Operations left in the queue for the next pass.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Completed(SyncReport),
}

/// Replays pending operations against the remote store.
///
/// Clones share the same in-progress flag, so at most one pass runs per
/// process no matter which handle triggers it.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    queue: QueueRepository,
    connectivity: Connectivity,
    syncing: Arc<AtomicBool>,
}

/// Clears the in-progress flag when the pass ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: QueueRepository,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            remote,
            queue,
            connectivity,
            syncing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Run one reconciliation pass.
    ///
    /// The pass works on the queue as it was when it started; operations
    /// enqueued meanwhile wait for the next pass. A failed operation never
    /// stops the pass.
    pub async fn sync(&self) -> SyncOutcome {
        if !self.connectivity.is_online() {
            tracing::debug!("Skipping sync: offline");
            return SyncOutcome::Skipped(SkipReason::Offline);
        }

        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            tracing::debug!("Skipping sync: a pass is already running");
            return SyncOutcome::Skipped(SkipReason::AlreadySyncing);
        };

        let snapshot = match self.queue.list().await {
            Ok(ops) => ops,
            Err(e) => {
                tracing::error!("Failed to read pending operations: {}", e);
                return SyncOutcome::Completed(SyncReport::default());
            }
        };

        let mut report = SyncReport {
            attempted: snapshot.len(),
            ..SyncReport::default()
        };

        if !snapshot.is_empty() {
            tracing::info!("Syncing {} pending operation(s)", snapshot.len());
        }

        for op in &snapshot {
            if let Err(e) = self.replay(op).await {
                tracing::warn!("Failed to sync operation {} ({}): {}", op.id, op, e);
                report.failed += 1;
                continue;
            }

            // A failure here means the remote already applied the operation;
            // it will be sent again on the next pass.
            match self.queue.remove(&op.id).await {
                Ok(()) => report.replayed += 1,
                Err(e) => {
                    tracing::error!(
                        "Applied operation {} remotely but could not dequeue it: {}",
                        op.id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Sync pass finished: {} replayed, {} failed",
            report.replayed,
            report.failed
        );

        SyncOutcome::Completed(report)
    }

    async fn replay(&self, op: &PendingOperation) -> Result<(), ReplayFailure> {
        match op.kind {
            OperationKind::Insert => {
                self.remote.insert(&op.resource, &op.payload).await?;
            }
            OperationKind::Update => {
                let key = key_filter(op)?;
                self.remote.update(&op.resource, &op.payload, &key).await?;
            }
            OperationKind::Delete => {
                let key = key_filter(op)?;
                self.remote.delete(&op.resource, &key).await?;
            }
        }
        Ok(())
    }
}

fn key_filter(op: &PendingOperation) -> Result<KeyFilter, ReplayFailure> {
    op.key_value()
        .map(|value| KeyFilter::new(op.key_column.clone(), value.clone()))
        .ok_or_else(|| ReplayFailure::MissingKey(op.key_column.clone()))
}
