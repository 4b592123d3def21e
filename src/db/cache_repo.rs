use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

use super::StorageError;
use crate::models::CacheEntry;

/// Last-known-good snapshot of each resource, one entry per resource.
#[derive(Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    resource: String,
    data: String,
    cached_at: String,
}

impl CacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the snapshot stored for `resource`.
    pub async fn put(&self, resource: &str, data: &Value) -> Result<(), StorageError> {
        let data_json = serde_json::to_string(data)?;

        sqlx::query(
            r#"
            INSERT INTO offline_data (resource, data, cached_at)
            VALUES (?, ?, ?)
            ON CONFLICT(resource) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at
            "#,
        )
        .bind(resource)
        .bind(&data_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Snapshot for `resource`, or `None` when nothing usable is cached.
    pub async fn get(&self, resource: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.get_entry(resource).await?.map(|entry| entry.data))
    }

    /// Snapshot with its timestamp. An unreadable payload counts as a miss.
    pub async fn get_entry(&self, resource: &str) -> Result<Option<CacheEntry>, StorageError> {
        let row: Option<CacheRow> =
            sqlx::query_as("SELECT resource, data, cached_at FROM offline_data WHERE resource = ?")
                .bind(resource)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data = match serde_json::from_str(&row.data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry for {}: {}", resource, e);
                return Ok(None);
            }
        };
        let cached_at = DateTime::parse_from_rfc3339(&row.cached_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(CacheEntry {
            resource: row.resource,
            data,
            cached_at,
        }))
    }
}
