use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;

use super::{StoreError, ThreadStateStore};
use crate::core::db::{async_db, initialize_db};
use crate::threads::{ThreadKey, ThreadState};

/// One row per thread key in the `thread_state` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    /// Open (and migrate) the database under `db_dir`.
    pub async fn open(db_dir: &Path) -> Result<Self> {
        let db = async_db(db_dir).await?;
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await?;
        Ok(Self::new(db))
    }
}

#[async_trait]
impl ThreadStateStore for SqliteStore {
    async fn load(&self, key: &ThreadKey) -> Result<Option<ThreadState>, StoreError> {
        let key = key.to_string();
        let data: Option<String> = self
            .db
            .call(move |conn| {
                let data = conn
                    .query_row(
                        "SELECT data FROM thread_state WHERE key = ?1",
                        [&key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(data)
            })
            .await?;

        match data {
            Some(data) => Ok(Some(ThreadState::decode(data.as_bytes())?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &ThreadKey, state: &ThreadState) -> Result<(), StoreError> {
        let key = key.to_string();
        let status = state.status.as_str();
        let data = serde_json::to_string(state)?;

        // A single upsert statement so the row is replaced atomically
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO thread_state (key, status, data, updated_at)
                     VALUES (?1, ?2, ?3, datetime('now'))
                     ON CONFLICT(key) DO UPDATE SET
                       status = excluded.status,
                       data = excluded.data,
                       updated_at = excluded.updated_at",
                    params![key, status, data],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
