use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The last full read of a resource, kept for offline access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub resource: String,
    pub data: Value,
    pub cached_at: DateTime<Utc>,
}
