//! Durable storage for the card's message identity.
//!
//! The reflector loads the identity once at startup and saves it after
//! every message creation, so a restart edits the existing card instead
//! of posting a duplicate. [`FileIdentityStore`] keeps it in a small JSON
//! file (`{"id": "<snowflake>"}`); [`MemoryIdentityStore`] keeps it in
//! process memory.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::update::MessageId;

/// Errors raised by an [`IdentityStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("identity store I/O error on {path}: {source}")]
    Io {
        /// The file that was being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file does not contain a valid identity record.
    #[error("identity store contains invalid JSON: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },
}

/// Load/save interface for the single tracked [`MessageId`].
pub trait IdentityStore: Send + Sync {
    /// Load the persisted identity, or `None` if nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<Option<MessageId>, StoreError>> + Send;

    /// Persist `id`, replacing any previous identity.
    fn save(&self, id: &MessageId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// On-disk shape of the identity file.
#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    id: MessageId,
}

/// Identity store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Create a store that reads and writes `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the identity file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Option<MessageId>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no identity file yet");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let record: IdentityRecord = serde_json::from_slice(&bytes)?;
        Ok(Some(record.id))
    }

    async fn save(&self, id: &MessageId) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        let record = IdentityRecord { id: id.clone() };
        let bytes = serde_json::to_vec(&record)?;

        // Write then rename so a crash never leaves a truncated file.
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), message_id = %id, "identity saved");
        Ok(())
    }
}

/// Identity store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    id: Mutex<Option<MessageId>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `id`.
    pub fn with_id(id: MessageId) -> Self {
        Self {
            id: Mutex::new(Some(id)),
        }
    }

    /// The currently stored identity.
    pub fn current(&self) -> Option<MessageId> {
        self.id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Option<MessageId>, StoreError> {
        Ok(self.current())
    }

    async fn save(&self, id: &MessageId) -> Result<(), StoreError> {
        *self.id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("message_id.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_identity_survives_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message_id.json");

        FileIdentityStore::new(&path)
            .save(&MessageId::new("42"))
            .await
            .unwrap();

        // A fresh store over the same file plays the part of a restart.
        let reloaded = FileIdentityStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, Some(MessageId::new("42")));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\"id\":\"42\"}");
    }

    #[tokio::test]
    async fn save_overwrites_previous_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("message_id.json"));

        store.save(&MessageId::new("1")).await.unwrap();
        store.save(&MessageId::new("2")).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(MessageId::new("2")));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("state").join("message_id.json"));

        store.save(&MessageId::new("7")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(MessageId::new("7")));
    }

    #[tokio::test]
    async fn numeric_identity_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message_id.json");
        std::fs::write(&path, "{\"id\": 1424811285542863000}").unwrap();

        let id = FileIdentityStore::new(&path).load().await.unwrap();
        assert_eq!(id, Some(MessageId::new("1424811285542863000")));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message_id.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileIdentityStore::new(&path).load().await;
        assert!(matches!(result, Err(StoreError::Json { .. })));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryIdentityStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store.save(&MessageId::new("9")).await.unwrap();
        assert_eq!(store.current(), Some(MessageId::new("9")));
    }
}
