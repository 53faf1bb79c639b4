//! In-memory call record store

use crate::domain::call::{CallRecord, CallRecordPatch, CallRecordStore, NewCallRecord};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::CallId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Record store kept in process memory. Used by the `memory` backend and
/// by tests.
#[derive(Clone, Default)]
pub struct InMemoryCallRecordStore {
    records: Arc<RwLock<HashMap<CallId, CallRecord>>>,
}

impl InMemoryCallRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// All records linked to `call_id` (consult and replacement calls)
    pub async fn linked_to(&self, call_id: CallId) -> Vec<CallRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.linked_call_id() == Some(call_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallRecordStore {
    async fn get(&self, id: CallId) -> Result<Option<CallRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn create(&self, record: NewCallRecord) -> Result<CallRecord> {
        let record = CallRecord::from_new(CallId::new(), record);
        self.records.write().await.insert(record.id(), record.clone());
        debug!("Stored call record {}", record.id());
        Ok(record)
    }

    async fn update(&self, id: CallId, patch: CallRecordPatch) -> Result<CallRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("call {}", id)))?;
        record.apply(&patch)?;
        debug!("Updated call record {} -> {}", id, record.lifecycle_state());
        Ok(record.clone())
    }
}
