use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use offsync::{KeyFilter, Query, Record, RemoteError, RemoteStore};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(String),
    Insert(String, Record),
    Update(String, Record, KeyFilter),
    Delete(String, KeyFilter),
}

/// Remote that records every call and fails the next `n` of them on demand.
#[derive(Default)]
pub struct RecordingRemote {
    calls: Mutex<Vec<Call>>,
    failures_left: AtomicUsize,
}

impl RecordingRemote {
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(RemoteError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, RemoteError> {
        self.record(Call::Select(query.resource.clone()))?;
        Ok(Vec::new())
    }

    async fn insert(&self, resource: &str, record: &Record) -> Result<Vec<Record>, RemoteError> {
        self.record(Call::Insert(resource.to_string(), record.clone()))?;
        Ok(vec![record.clone()])
    }

    async fn update(
        &self,
        resource: &str,
        patch: &Record,
        key: &KeyFilter,
    ) -> Result<Vec<Record>, RemoteError> {
        self.record(Call::Update(resource.to_string(), patch.clone(), key.clone()))?;
        Ok(vec![patch.clone()])
    }

    async fn delete(&self, resource: &str, key: &KeyFilter) -> Result<(), RemoteError> {
        self.record(Call::Delete(resource.to_string(), key.clone()))
    }

    async fn health(&self) -> bool {
        true
    }
}

pub fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}
