use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::{SyncEngine, SyncOutcome, SyncStatus};
use crate::db::QueueRepository;

/// Shared online/offline flag read by the gateway and the sync engine.
#[derive(Debug, Clone)]
pub struct Connectivity(Arc<AtomicBool>);

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, returning the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.0.swap(online, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

/// Reacts to connectivity transitions.
///
/// Coming back online triggers a sync pass and republishes the pending
/// count; going offline only flips the flag. Rapid flapping is absorbed by
/// the engine refusing overlapping passes.
pub struct ConnectivityMonitor {
    connectivity: Connectivity,
    engine: SyncEngine,
    queue: QueueRepository,
    status: watch::Sender<SyncStatus>,
}

impl ConnectivityMonitor {
    pub fn new(connectivity: Connectivity, engine: SyncEngine, queue: QueueRepository) -> Self {
        let (status, _) = watch::channel(SyncStatus {
            online: connectivity.is_online(),
            pending: 0,
        });
        Self {
            connectivity,
            engine,
            queue,
            status,
        }
    }

    /// Receiver for indicator updates.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Re-read the pending count and publish it with the current flag.
    pub async fn refresh(&self) -> SyncStatus {
        let online = self.connectivity.is_online();
        let pending = match self.queue.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Failed to count pending operations: {}", e);
                self.status().pending
            }
        };
        self.publish(SyncStatus { online, pending })
    }

    /// Apply one connectivity event. Returns the sync outcome when the event
    /// triggered a pass.
    pub async fn handle(&self, event: ConnectivityEvent) -> Option<SyncOutcome> {
        match event {
            ConnectivityEvent::BecameOnline => {
                self.connectivity.set_online(true);
                tracing::info!("Back online, syncing data");

                let outcome = self.engine.sync().await;
                let status = self.refresh().await;
                if status.pending == 0 {
                    tracing::info!("All data synced");
                } else {
                    tracing::info!("{} operation(s) still pending", status.pending);
                }
                Some(outcome)
            }
            ConnectivityEvent::BecameOffline => {
                self.connectivity.set_online(false);
                self.status.send_modify(|status| status.online = false);
                tracing::warn!("Offline: changes will sync when back online");
                None
            }
        }
    }

    /// Handle events until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<ConnectivityEvent>) {
        self.refresh().await;
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        tracing::debug!("Connectivity event channel closed");
    }

    fn publish(&self, status: SyncStatus) -> SyncStatus {
        self.status.send_replace(status);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::OperationKind;
    use crate::remote::mock::MockRemote;
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        monitor: ConnectivityMonitor,
        connectivity: Connectivity,
        queue: QueueRepository,
        remote: Arc<MockRemote>,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup(online: bool) -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let queue = QueueRepository::new(pool);
        let remote = Arc::new(MockRemote::new());
        let connectivity = Connectivity::new(online);
        let engine = SyncEngine::new(remote.clone(), queue.clone(), connectivity.clone());
        let monitor = ConnectivityMonitor::new(connectivity.clone(), engine, queue.clone());
        TestContext {
            monitor,
            connectivity,
            queue,
            remote,
            _temp_dir: temp_dir,
        }
    }

    async fn enqueue_note(queue: &QueueRepository) {
        let payload = json!({"title": "A"}).as_object().cloned().unwrap();
        queue
            .enqueue("notes", OperationKind::Insert, &payload)
            .await
            .unwrap();
    }

    #[test]
    fn test_connectivity_flag() {
        let flag = Connectivity::new(false);
        let shared = flag.clone();
        assert!(!flag.set_online(true));
        assert!(shared.is_online());
    }

    #[tokio::test]
    async fn test_became_online_syncs_and_publishes_count() {
        let ctx = setup(false).await;
        enqueue_note(&ctx.queue).await;
        let mut status = ctx.monitor.subscribe();

        let outcome = ctx.monitor.handle(ConnectivityEvent::BecameOnline).await;

        assert!(matches!(outcome, Some(SyncOutcome::Completed(r)) if r.replayed == 1));
        assert!(ctx.connectivity.is_online());
        assert!(status.has_changed().unwrap());
        assert_eq!(
            *status.borrow_and_update(),
            SyncStatus {
                online: true,
                pending: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_became_online_publishes_remaining_failures() {
        let ctx = setup(false).await;
        enqueue_note(&ctx.queue).await;
        ctx.remote.set_failing(true);

        ctx.monitor.handle(ConnectivityEvent::BecameOnline).await;

        assert_eq!(
            ctx.monitor.status(),
            SyncStatus {
                online: true,
                pending: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_became_offline_leaves_queue_alone() {
        let ctx = setup(true).await;
        enqueue_note(&ctx.queue).await;

        let outcome = ctx.monitor.handle(ConnectivityEvent::BecameOffline).await;

        assert_eq!(outcome, None);
        assert!(!ctx.connectivity.is_online());
        assert!(!ctx.monitor.status().online);
        assert!(ctx.remote.calls().is_empty());
        assert_eq!(ctx.queue.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_flapping_replays_each_operation_once() {
        let ctx = setup(false).await;
        enqueue_note(&ctx.queue).await;

        for event in [
            ConnectivityEvent::BecameOnline,
            ConnectivityEvent::BecameOffline,
            ConnectivityEvent::BecameOnline,
        ] {
            ctx.monitor.handle(event).await;
        }

        assert_eq!(ctx.remote.calls().len(), 1);
        assert_eq!(ctx.monitor.status().pending, 0);
    }

    #[tokio::test]
    async fn test_run_consumes_events_until_closed() {
        let ctx = setup(false).await;
        enqueue_note(&ctx.queue).await;
        let status = ctx.monitor.subscribe();
        let (tx, rx) = mpsc::channel(4);

        tx.send(ConnectivityEvent::BecameOnline).await.unwrap();
        drop(tx);
        ctx.monitor.run(rx).await;

        assert_eq!(ctx.remote.calls().len(), 1);
        assert_eq!(
            *status.borrow(),
            SyncStatus {
                online: true,
                pending: 0,
            }
        );
    }
}
