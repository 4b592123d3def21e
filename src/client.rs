use std::path::Path;
use std::sync::Arc;

use crate::db::{init_db, CacheRepository, QueueRepository, StorageError};
use crate::gateway::DataGateway;
use crate::remote::RemoteStore;
use crate::sync::{Connectivity, ConnectivityMonitor, SyncEngine};

/// Everything one application session needs for offline-aware access.
///
/// Built once and handed to whatever needs it; the parts share the same
/// database pool and connectivity flag.
pub struct OfflineClient {
    gateway: DataGateway,
    engine: SyncEngine,
    queue: QueueRepository,
    cache: CacheRepository,
    connectivity: Connectivity,
}

impl OfflineClient {
    /// Open (or create) the local store at `db_path`.
    pub async fn open(
        db_path: &Path,
        remote: Arc<dyn RemoteStore>,
        online: bool,
    ) -> Result<Self, StorageError> {
        let pool = init_db(db_path).await?;
        let queue = QueueRepository::new(pool.clone());
        let cache = CacheRepository::new(pool);
        let connectivity = Connectivity::new(online);

        let engine = SyncEngine::new(remote.clone(), queue.clone(), connectivity.clone());
        let gateway = DataGateway::new(remote, queue.clone(), cache.clone(), connectivity.clone());

        Ok(Self {
            gateway,
            engine,
            queue,
            cache,
            connectivity,
        })
    }

    pub fn gateway(&self) -> &DataGateway {
        &self.gateway
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn queue(&self) -> &QueueRepository {
        &self.queue
    }

    pub fn cache(&self) -> &CacheRepository {
        &self.cache
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// A monitor wired to this session's engine and flag.
    pub fn monitor(&self) -> ConnectivityMonitor {
        ConnectivityMonitor::new(
            self.connectivity.clone(),
            self.engine.clone(),
            self.queue.clone(),
        )
    }
}
