use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::RngCore;
use serde_json::Value;

use webaudit_core::{AuditError, Report};

use crate::{SavedSnapshot, SnapshotStore};

/// Process-local snapshot store for tests and token-less deployments.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, report: &Report) -> Result<SavedSnapshot, AuditError> {
        let path = format!("audits/{:016x}.json", rand::thread_rng().next_u64());
        let payload =
            serde_json::to_value(report).map_err(|e| AuditError::Storage(e.to_string()))?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| AuditError::Storage("memory store poisoned".to_string()))?;
        objects.insert(path.clone(), payload);
        Ok(SavedSnapshot {
            url: format!("memory://{path}"),
            path,
        })
    }

    async fn load(&self, path_or_url: &str) -> Result<Option<Value>, AuditError> {
        let key = path_or_url.trim_start_matches("memory://");
        let objects = self
            .objects
            .lock()
            .map_err(|_| AuditError::Storage("memory store poisoned".to_string()))?;
        Ok(objects.get(key).cloned())
    }
}
