use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::ConnectivityEvent;
use crate::remote::RemoteStore;

/// Shortest polling period; `tokio::time::interval` rejects zero.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Connectivity signal source backed by remote health checks.
///
/// Emits an event for the first observation and afterwards only when
/// reachability changes.
pub struct ReachabilityProbe {
    remote: Arc<dyn RemoteStore>,
    interval: Duration,
    last: Option<bool>,
}

impl ReachabilityProbe {
    /// Intervals below [`MIN_PROBE_INTERVAL`] are raised to it.
    pub fn new(remote: Arc<dyn RemoteStore>, interval: Duration) -> Self {
        Self {
            remote,
            interval: interval.max(MIN_PROBE_INTERVAL),
            last: None,
        }
    }

    /// Check once; returns the transition, if any.
    pub async fn check(&mut self) -> Option<ConnectivityEvent> {
        let online = self.remote.health().await;
        let changed = self.last != Some(online);
        self.last = Some(online);

        if !changed {
            return None;
        }
        Some(if online {
            ConnectivityEvent::BecameOnline
        } else {
            ConnectivityEvent::BecameOffline
        })
    }

    /// Poll forever, forwarding transitions until the receiver goes away.
    pub async fn run(mut self, events: mpsc::Sender<ConnectivityEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Some(event) = self.check().await {
                tracing::debug!("Connectivity changed: {:?}", event);
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }
    }
}
