use async_trait::async_trait;
use std::sync::Mutex;

use super::{GestureRecord, GestureStore};
use crate::error::StoreError;

/// In-process gesture store. Records live as long as the store.
#[derive(Default)]
pub struct MemoryGestureStore {
    records: Mutex<Vec<GestureRecord>>,
}

impl MemoryGestureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<GestureRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl GestureStore for MemoryGestureStore {
    async fn insert(&self, record: &GestureRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::new("memory store poisoned"))?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::new(format!("duplicate gesture id {}", record.id)));
        }
        records.push(record.clone());
        Ok(())
    }
}
