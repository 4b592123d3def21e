mod cache_entry;
mod operation_kind;
mod pending_operation;

pub use cache_entry::CacheEntry;
pub use operation_kind::OperationKind;
pub use pending_operation::PendingOperation;

/// A single record as exchanged with the remote store: a JSON object.
pub type Record = serde_json::Map<String, serde_json::Value>;
