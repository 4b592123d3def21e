//! The remote record store.
//!
//! The offline layer only needs per-resource select/insert/update/delete with
//! simple filters, plus a cheap reachability check. [`RestRemote`] speaks the
//! PostgREST dialect over HTTP; tests substitute their own implementation.

#[cfg(test)]
pub(crate) mod mock;
mod rest;

pub use rest::RestRemote;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Record;
use crate::request::{KeyFilter, Query};

/// Errors from the remote store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Remote not configured. Add remote.url and remote.api_key to config.")]
    NotConfigured,

    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, RemoteError>;

    /// Insert one record; returns the stored representation.
    async fn insert(&self, resource: &str, record: &Record) -> Result<Vec<Record>, RemoteError>;

    /// Apply `patch` to the records matching `key`.
    async fn update(
        &self,
        resource: &str,
        patch: &Record,
        key: &KeyFilter,
    ) -> Result<Vec<Record>, RemoteError>;

    async fn delete(&self, resource: &str, key: &KeyFilter) -> Result<(), RemoteError>;

    /// Whether the remote answers at all.
    async fn health(&self) -> bool;
}

/// Stand-in used when no remote is configured: every call fails as
/// unreachable, so the gateway stays on its offline paths.
pub struct Disconnected;

#[async_trait]
impl RemoteStore for Disconnected {
    async fn select(&self, _query: &Query) -> Result<Vec<Record>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn insert(&self, _resource: &str, _record: &Record) -> Result<Vec<Record>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn update(
        &self,
        _resource: &str,
        _patch: &Record,
        _key: &KeyFilter,
    ) -> Result<Vec<Record>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn delete(&self, _resource: &str, _key: &KeyFilter) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn health(&self) -> bool {
        false
    }
}
