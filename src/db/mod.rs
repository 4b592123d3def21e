mod cache_repo;
mod queue_repo;

pub use cache_repo::CacheRepository;
pub use queue_repo::QueueRepository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the local durable store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Local storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Failed to migrate local database: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to create database directory '{}': {}", .0.display(), .1)]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Open the local database, creating it if needed, and run migrations.
///
/// The database holds two collections: `pending_operations` and
/// `offline_data`. Schema changes ship as new files under `migrations/`.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| StorageError::CreateDir(parent.to_path_buf(), e))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Opened offline store at {}", path.display());

    Ok(pool)
}
