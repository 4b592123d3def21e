use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{OperationKind, Record};

/// A mutation recorded while offline, waiting to be replayed against the
/// remote store.
///
/// Operations are immutable once enqueued. They leave the queue only after a
/// confirmed successful replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: String,
    pub resource: String,
    pub kind: OperationKind,
    pub payload: Record,
    /// Column the replayed update/delete filters on.
    pub key_column: String,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingOperation {
    /// Value of the key column inside the payload, if present.
    pub fn key_value(&self) -> Option<&Value> {
        self.payload
            .get(&self.key_column)
            .filter(|value| !value.is_null())
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.resource
        )?;
        if let Some(key) = self.key_value() {
            write!(f, " ({}={})", self.key_column, key)?;
        }
        Ok(())
    }
}
