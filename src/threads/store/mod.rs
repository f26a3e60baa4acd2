//! Durable key to thread state persistence.
//!
//! A missing record (`Ok(None)`) means the thread has never been seen,
//! which is distinct from a stored record that happens to be empty.
//! `save` writes the whole record or nothing.

mod file;
mod memory;
mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use super::key::ThreadKey;
use super::state::ThreadState;
use crate::core::{AppConfig, StoreBackend};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("thread store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("thread record is unreadable: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("thread store db error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}

#[async_trait]
pub trait ThreadStateStore: Send + Sync {
    async fn load(&self, key: &ThreadKey) -> Result<Option<ThreadState>, StoreError>;
    async fn save(&self, key: &ThreadKey, state: &ThreadState) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn ThreadStateStore>;

/// Open the store selected by the configuration.
pub async fn open_store(config: &AppConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.store_backend {
        StoreBackend::File => Arc::new(FileStore::new(config.threads_path())),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.db_path()).await?),
    };
    Ok(store)
}
