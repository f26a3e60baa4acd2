use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{StoreError, ThreadStateStore};
use crate::threads::{ThreadKey, ThreadState};

/// One JSON file per thread key. The directory is created on first
/// write.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &ThreadKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl ThreadStateStore for FileStore {
    async fn load(&self, key: &ThreadKey) -> Result<Option<ThreadState>, StoreError> {
        match fs::read(self.record_path(key)).await {
            Ok(bytes) => Ok(Some(ThreadState::decode(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &ThreadKey, state: &ThreadState) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(state)?;
        fs::create_dir_all(&self.dir).await?;

        // Write a sibling temp file and rename it over the record so a
        // reader never observes a partial write.
        let path = self.record_path(key);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        let mut file = fs::File::create(&tmp_path).await?;
        let written = match file.write_all(&data).await {
            Ok(()) => file.sync_all().await,
            Err(err) => Err(err),
        };
        drop(file);

        let result = match written {
            Ok(()) => fs::rename(&tmp_path, &path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        tracing::debug!("Saved thread {} to {}", key, path.display());
        Ok(())
    }
}
