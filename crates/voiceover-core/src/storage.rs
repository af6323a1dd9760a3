//! Durable key-value storage.
//!
//! Small JSON documents (the cached identity, voice settings) are kept under
//! string keys. [`FileStore`] writes each key to its own file and replaces it
//! atomically; [`MemoryStore`] keeps everything in process.

use crate::error::{VoiceoverError, VoiceoverResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Async string storage keyed by name
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read
    async fn get(&self, key: &str) -> VoiceoverResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be written
    async fn set(&self, key: &str, value: &str) -> VoiceoverResult<()>;

    /// Delete `key`; deleting a missing key succeeds
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be written
    async fn remove(&self, key: &str) -> VoiceoverResult<()>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> VoiceoverResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            VoiceoverError::storage(format!("Failed to create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    /// Root directory of the store
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> VoiceoverResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(VoiceoverError::invalid_input(format!(
                "Invalid storage key '{key}'"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> VoiceoverResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VoiceoverError::storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> VoiceoverResult<()> {
        let path = self.path_for(key)?;
        // Unique temp name so overlapping writers never share a partial file.
        let tmp = self
            .dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(VoiceoverError::storage(format!(
                "Failed to write {}: {e}",
                tmp.display()
            )));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(VoiceoverError::storage(format!(
                "Failed to replace {}: {e}",
                path.display()
            )));
        }

        debug!("Stored {} bytes under '{}'", value.len(), key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> VoiceoverResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VoiceoverError::storage(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> VoiceoverResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> VoiceoverResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> VoiceoverResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
