//! In-memory remote store for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{RemoteError, RemoteStore};
use crate::models::Record;
use crate::request::{KeyFilter, Query};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(String),
    Insert(String, Record),
    Update(String, Record, KeyFilter),
    Delete(String, KeyFilter),
}

/// Parks a mutation until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Resolves once a mutation is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

pub struct MockRemote {
    calls: Mutex<Vec<Call>>,
    rows: Mutex<HashMap<String, Vec<Record>>>,
    failing: AtomicBool,
    healthy: AtomicBool,
    gate: Option<Arc<Gate>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rows: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            gate: None,
        }
    }

    /// A remote whose mutations wait on the returned gate.
    pub fn gated() -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        let remote = Self {
            gate: Some(gate.clone()),
            ..Self::new()
        };
        (remote, gate)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_rows(&self, resource: &str, rows: Vec<Record>) {
        self.rows.lock().unwrap().insert(resource.to_string(), rows);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: Call) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Select(query.resource.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".to_string()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&query.resource).cloned().unwrap_or_default())
    }

    async fn insert(&self, resource: &str, record: &Record) -> Result<Vec<Record>, RemoteError> {
        self.record(Call::Insert(resource.to_string(), record.clone()))
            .await?;
        let mut stored = record.clone();
        stored
            .entry("id")
            .or_insert_with(|| serde_json::json!("srv-1"));
        Ok(vec![stored])
    }

    async fn update(
        &self,
        resource: &str,
        patch: &Record,
        key: &KeyFilter,
    ) -> Result<Vec<Record>, RemoteError> {
        self.record(Call::Update(
            resource.to_string(),
            patch.clone(),
            key.clone(),
        ))
        .await?;
        Ok(vec![patch.clone()])
    }

    async fn delete(&self, resource: &str, key: &KeyFilter) -> Result<(), RemoteError> {
        self.record(Call::Delete(resource.to_string(), key.clone()))
            .await
    }

    async fn health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
