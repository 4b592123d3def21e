use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::StorageError;
use crate::models::{OperationKind, PendingOperation, Record};

/// Attempts at generating a fresh id before giving up on a collision.
const MAX_ID_ATTEMPTS: usize = 3;

/// Durable FIFO log of mutations waiting to be replayed.
///
/// Every call goes to storage; nothing is cached in memory, so the listing
/// always reflects what survived the last restart.
#[derive(Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PendingOperationRow {
    id: String,
    resource: String,
    kind: String,
    payload: String,
    key_column: String,
    enqueued_at: String,
}

impl QueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an operation keyed on the `id` column.
    pub async fn enqueue(
        &self,
        resource: &str,
        kind: OperationKind,
        payload: &Record,
    ) -> Result<String, StorageError> {
        self.enqueue_keyed(resource, kind, payload, "id").await
    }

    /// Append an operation whose replay filters on `key_column`.
    pub async fn enqueue_keyed(
        &self,
        resource: &str,
        kind: OperationKind,
        payload: &Record,
        key_column: &str,
    ) -> Result<String, StorageError> {
        let payload_json = serde_json::to_string(payload)?;
        let enqueued_at = Utc::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = operation_id(resource, kind, enqueued_at);

            let result = sqlx::query(
                r#"
                INSERT INTO pending_operations (id, resource, kind, payload, key_column, enqueued_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(resource)
            .bind(kind.as_str())
            .bind(&payload_json)
            .bind(key_column)
            .bind(enqueued_at.to_rfc3339())
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    tracing::debug!("Queued {} on {} as {}", kind, resource, id);
                    return Ok(id);
                }
                Err(sqlx::Error::Database(e))
                    if e.is_unique_violation() && attempt < MAX_ID_ATTEMPTS =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// All pending operations in insertion order.
    ///
    /// Rows that can no longer be decoded are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<PendingOperation>, StorageError> {
        let rows: Vec<PendingOperationRow> = sqlx::query_as(
            "SELECT id, resource, kind, payload, key_column, enqueued_at FROM pending_operations ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut operations = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match hydrate(row) {
                Ok(op) => operations.push(op),
                Err(e) => tracing::warn!("Skipping unreadable pending operation {}: {}", id, e),
            }
        }
        Ok(operations)
    }

    /// Delete one operation. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM pending_operations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_operations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

/// `<resource>-<kind>-<millis>-<random>`; the random term separates
/// operations enqueued within the same millisecond.
fn operation_id(resource: &str, kind: OperationKind, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}-{}",
        resource,
        kind,
        at.timestamp_millis(),
        rand::random::<u32>()
    )
}

fn hydrate(row: PendingOperationRow) -> Result<PendingOperation, String> {
    let kind = row.kind.parse::<OperationKind>()?;
    let payload: Record = serde_json::from_str(&row.payload).map_err(|e| e.to_string())?;
    let enqueued_at = DateTime::parse_from_rfc3339(&row.enqueued_at)
        .map_err(|e| e.to_string())?
        .with_timezone(&Utc);

    Ok(PendingOperation {
        id: row.id,
        resource: row.resource,
        kind,
        payload,
        key_column: row.key_column,
        enqueued_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        repo: QueueRepository,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(&db_path).await.unwrap();
        TestContext {
            repo: QueueRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_and_list() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let id = repo
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "A"})))
            .await
            .unwrap();

        assert!(id.starts_with("notes-insert-"));

        let ops = repo.list().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].id, id);
        assert_eq!(ops[0].resource, "notes");
        assert_eq!(ops[0].kind, OperationKind::Insert);
        assert_eq!(ops[0].payload, record(json!({"title": "A"})));
        assert_eq!(ops[0].key_column, "id");
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut ids = Vec::new();
        for i in 0..10 {
            let id = repo
                .enqueue("tasks", OperationKind::Insert, &record(json!({"n": i})))
                .await
                .unwrap();
            ids.push(id);
        }

        let listed: Vec<String> = repo.list().await.unwrap().into_iter().map(|op| op.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;
        let payload = record(json!({"id": "r1"}));

        let first = repo
            .enqueue("notes", OperationKind::Delete, &payload)
            .await
            .unwrap();
        let second = repo
            .enqueue("notes", OperationKind::Delete, &payload)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_keyed_records_key_column() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.enqueue_keyed(
            "profiles",
            OperationKind::Update,
            &record(json!({"user_id": "u1", "name": "Ada"})),
            "user_id",
        )
        .await
        .unwrap();

        let ops = repo.list().await.unwrap();
        assert_eq!(ops[0].key_column, "user_id");
        assert_eq!(ops[0].key_value(), Some(&json!("u1")));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let id = repo
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "A"})))
            .await
            .unwrap();

        repo.remove(&id).await.unwrap();
        repo.remove(&id).await.unwrap();
        repo.remove("never-existed").await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_only_targets_one_entry() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let first = repo
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "A"})))
            .await
            .unwrap();
        let second = repo
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "B"})))
            .await
            .unwrap();

        repo.remove(&first).await.unwrap();

        let ops = repo.list().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].id, second);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_rows() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        sqlx::query(
            "INSERT INTO pending_operations (id, resource, kind, payload, key_column, enqueued_at) VALUES ('bad', 'notes', 'insert', 'not json', 'id', '2024-01-01T00:00:00Z')",
        )
        .execute(&repo.pool)
        .await
        .unwrap();
        repo.enqueue("notes", OperationKind::Insert, &record(json!({"title": "ok"})))
            .await
            .unwrap();

        let ops = repo.list().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].payload["title"], "ok");
        // The unreadable row still counts as pending
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_queue_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(&db_path).await.unwrap();
        QueueRepository::new(pool.clone())
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "A"})))
            .await
            .unwrap();
        pool.close().await;

        let reopened = QueueRepository::new(init_db(&db_path).await.unwrap());
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_on_closed_pool_is_storage_error() {
        let ctx = setup_repo().await;
        ctx.repo.pool.close().await;

        let result = ctx
            .repo
            .enqueue("notes", OperationKind::Insert, &record(json!({"title": "A"})))
            .await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }
}
