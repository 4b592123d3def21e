//! Offline-aware facade over the remote record store.
//!
//! Call sites issue the same requests whether or not the remote is
//! reachable:
//!
//! - reads go to the remote when online and fall back to the last cached
//!   snapshot otherwise, never failing;
//! - writes go straight to the remote when online; offline they are queued
//!   and answered immediately with an optimistic result.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{CacheRepository, QueueRepository, StorageError};
use crate::models::{OperationKind, Record};
use crate::remote::{RemoteError, RemoteStore};
use crate::request::{KeyFilter, Query, Request, Response};
use crate::sync::Connectivity;

/// Prefix marking identifiers synthesized for offline inserts.
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The offline queue could not record a write.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An online write was rejected or could not reach the remote.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Whether `id` was issued locally for an insert made while offline.
pub fn is_local_id(id: &Value) -> bool {
    id.as_str()
        .is_some_and(|s| s.starts_with(LOCAL_ID_PREFIX))
}

#[derive(Clone)]
pub struct DataGateway {
    remote: Arc<dyn RemoteStore>,
    queue: QueueRepository,
    cache: CacheRepository,
    connectivity: Connectivity,
}

impl DataGateway {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: QueueRepository,
        cache: CacheRepository,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            remote,
            queue,
            cache,
            connectivity,
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub async fn pending_count(&self) -> Result<u64, StorageError> {
        self.queue.count().await
    }

    /// Run any request through the online or offline path.
    pub async fn execute(&self, request: Request) -> Result<Response, GatewayError> {
        match request {
            Request::Select(query) => Ok(Response::Rows(self.select(&query).await)),
            Request::Insert { resource, record } => {
                let row = self.insert(&resource, record).await?;
                Ok(Response::Rows(vec![row]))
            }
            Request::Update {
                resource,
                patch,
                key,
            } => Ok(Response::Rows(self.update(&resource, patch, &key).await?)),
            Request::Delete { resource, key } => {
                self.delete(&resource, &key).await?;
                Ok(Response::Empty)
            }
        }
    }

    /// Read records. Falls back to the cached snapshot of the resource
    /// (possibly stale, possibly empty) when offline or when the remote
    /// read fails.
    pub async fn select(&self, query: &Query) -> Vec<Record> {
        if self.is_online() {
            match self.remote.select(query).await {
                Ok(rows) => {
                    let snapshot = Value::Array(rows.iter().cloned().map(Value::Object).collect());
                    if let Err(e) = self.cache.put(&query.resource, &snapshot).await {
                        tracing::warn!("Failed to cache {}: {}", query.resource, e);
                    }
                    return rows;
                }
                Err(e) => {
                    tracing::warn!(
                        "Remote read of {} failed, serving cached data: {}",
                        query.resource,
                        e
                    );
                }
            }
        }

        self.cached_rows(&query.resource).await
    }

    /// Insert a record. Offline, the returned record carries a local id
    /// unless the caller supplied one.
    pub async fn insert(&self, resource: &str, record: Record) -> Result<Record, GatewayError> {
        if self.is_online() {
            let rows = self.remote.insert(resource, &record).await?;
            return Ok(rows.into_iter().next().unwrap_or(record));
        }

        self.queue
            .enqueue(resource, OperationKind::Insert, &record)
            .await?;

        let mut optimistic = record;
        if optimistic.get("id").map_or(true, Value::is_null) {
            optimistic.insert(
                "id".to_string(),
                Value::String(format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4())),
            );
        }
        Ok(optimistic)
    }

    /// Update the records matching `key`. Offline, the queued payload and the
    /// optimistic result are the patch merged with the key.
    pub async fn update(
        &self,
        resource: &str,
        patch: Record,
        key: &KeyFilter,
    ) -> Result<Vec<Record>, GatewayError> {
        if self.is_online() {
            return Ok(self.remote.update(resource, &patch, key).await?);
        }

        let mut payload = patch;
        payload.insert(key.column.clone(), key.value.clone());
        self.queue
            .enqueue_keyed(resource, OperationKind::Update, &payload, &key.column)
            .await?;

        Ok(vec![payload])
    }

    pub async fn delete(&self, resource: &str, key: &KeyFilter) -> Result<(), GatewayError> {
        if self.is_online() {
            return Ok(self.remote.delete(resource, key).await?);
        }

        let mut payload = Record::new();
        payload.insert(key.column.clone(), key.value.clone());
        self.queue
            .enqueue_keyed(resource, OperationKind::Delete, &payload, &key.column)
            .await?;

        Ok(())
    }

    async fn cached_rows(&self, resource: &str) -> Vec<Record> {
        let cached = match self.cache.get(resource).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Failed to read cached {}: {}", resource, e);
                None
            }
        };

        match cached {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
            Some(other) => {
                tracing::warn!("Ignoring non-list cache entry for {}: {}", resource, other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}
