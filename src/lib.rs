//! Offline-first client for a remote record store.
//!
//! Reads and writes keep working without connectivity: reads fall back to
//! a local snapshot cache, writes are queued durably and replayed against
//! the remote store once connectivity returns.

pub mod client;
pub mod config;
pub mod db;
pub mod gateway;
pub mod models;
pub mod remote;
pub mod request;
pub mod sync;

pub use client::OfflineClient;
pub use config::{Config, ConfigError, RemoteConfig};
pub use db::{CacheRepository, QueueRepository, StorageError};
pub use gateway::{is_local_id, DataGateway, GatewayError, LOCAL_ID_PREFIX};
pub use models::{CacheEntry, OperationKind, PendingOperation, Record};
pub use remote::{Disconnected, RemoteError, RemoteStore, RestRemote};
pub use request::{Direction, Filter, FilterOp, KeyFilter, Order, Query, Request, Response};
pub use sync::{
    Connectivity, ConnectivityEvent, ConnectivityMonitor, ReachabilityProbe, ReplayFailure,
    SkipReason, SyncEngine, SyncOutcome, SyncReport, SyncStatus,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
