//! JSON file persistence.
//!
//! The whole store lives in one pretty-printed JSON document. Records are
//! kept in a [`MemoryStore`] and the document is rewritten after every
//! write, through a temporary file renamed over the original.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codeshell_core::core::{
    FileRecord, FolderRecord, MemoryStore, PersistenceError, PersistenceStore, StoreSnapshot,
};

pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the document at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<StoreSnapshot>(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            path = %path.display(),
            folders = snapshot.folders.len(),
            files = snapshot.files.len(),
            "opened store"
        );
        Ok(Self {
            path,
            inner: MemoryStore::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids of sessions with a persisted command log.
    pub fn session_ids(&self) -> Vec<String> {
        self.inner.to_snapshot().command_logs.into_keys().collect()
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&self.inner.to_snapshot())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn get_file(&self, path: &str) -> Result<Option<FileRecord>, PersistenceError> {
        self.inner.get_file(path).await
    }

    async fn save_file(&self, record: &FileRecord) -> Result<(), PersistenceError> {
        self.inner.save_file(record).await?;
        self.flush().await
    }

    async fn delete_file(&self, path: &str) -> Result<(), PersistenceError> {
        self.inner.delete_file(path).await?;
        self.flush().await
    }

    async fn get_folder(&self, path: &str) -> Result<Option<FolderRecord>, PersistenceError> {
        self.inner.get_folder(path).await
    }

    async fn save_folder(&self, record: &FolderRecord) -> Result<(), PersistenceError> {
        self.inner.save_folder(record).await?;
        self.flush().await
    }

    async fn delete_folder(&self, id: &str) -> Result<(), PersistenceError> {
        self.inner.delete_folder(id).await?;
        self.flush().await
    }

    async fn list_all_folders(&self) -> Result<Vec<FolderRecord>, PersistenceError> {
        self.inner.list_all_folders().await
    }

    async fn list_all_files(&self) -> Result<Vec<FileRecord>, PersistenceError> {
        self.inner.list_all_files().await
    }

    async fn load_command_log(&self, session_id: &str) -> Result<Vec<String>, PersistenceError> {
        self.inner.load_command_log(session_id).await
    }

    async fn save_command_log(
        &self,
        session_id: &str,
        lines: &[String],
    ) -> Result<(), PersistenceError> {
        self.inner.save_command_log(session_id, lines).await?;
        self.flush().await
    }

    async fn delete_command_log(&self, session_id: &str) -> Result<(), PersistenceError> {
        self.inner.delete_command_log(session_id).await?;
        self.flush().await
    }
}
