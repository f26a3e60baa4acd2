use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{StoreError, ThreadStateStore};
use crate::threads::{ThreadKey, ThreadState};

/// Process local store. Nothing survives a restart; used for dry runs
/// and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<ThreadKey, ThreadState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing record.
    pub fn with_record(key: ThreadKey, state: ThreadState) -> Self {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, state);
        store
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ThreadStateStore for MemoryStore {
    async fn load(&self, key: &ThreadKey) -> Result<Option<ThreadState>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    async fn save(&self, key: &ThreadKey, state: &ThreadState) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.clone(), state.clone());
        Ok(())
    }
}
