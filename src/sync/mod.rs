//! Reconciliation of locally queued writes with the remote store.
//!
//! - [`SyncEngine`] replays the pending-operation queue, one pass at a time.
//! - [`ConnectivityMonitor`] reacts to online/offline transitions and
//!   triggers a pass on recovery.
//! - [`ReachabilityProbe`] turns periodic remote health checks into those
//!   transitions when the host platform has no connectivity signal of its own.

mod connectivity;
mod engine;
mod probe;
mod status;

pub use connectivity::{Connectivity, ConnectivityEvent, ConnectivityMonitor};
pub use engine::{ReplayFailure, SkipReason, SyncEngine, SyncOutcome, SyncReport};
pub use probe::{ReachabilityProbe, MIN_PROBE_INTERVAL};
pub use status::SyncStatus;
