//! File-based Session Store Adapter
//!
//! Stores each key as its own file under a base directory, so the snapshot
//! stays a readable YAML document for debugging. The credential is the
//! exception: it is held in memory and never written to disk.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::ports::{SessionStore, SessionStoreError, StoreKey};

/// File-based storage for session state
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
    credential: Arc<RwLock<Option<Secret<String>>>>,
}

impl FileSessionStore {
    /// Create a new file store rooted at a directory
    ///
    /// # Example
    /// ```ignore
    /// let store = FileSessionStore::new("./data/sessions");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            credential: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed the in-memory credential
    pub fn with_credential(self, token: Secret<String>) -> Self {
        Self {
            credential: Arc::new(RwLock::new(Some(token))),
            ..self
        }
    }

    /// Get the file path for a key
    fn key_path(&self, key: StoreKey) -> PathBuf {
        match key {
            StoreKey::Snapshot => self.base_path.join("snapshot.yaml"),
            other => self.base_path.join(other.as_str()),
        }
    }

    /// Ensure the base directory exists
    async fn ensure_dir(&self) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, SessionStoreError> {
        if key == StoreKey::Credential {
            let credential = self.credential.read().await;
            return Ok(credential.as_ref().map(|t| t.expose_secret().clone()));
        }

        match fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionStoreError::IoError(e.to_string())),
        }
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionStoreError> {
        if key == StoreKey::Credential {
            *self.credential.write().await = Some(Secret::new(value.to_string()));
            return Ok(());
        }

        self.ensure_dir().await?;

        // Atomic replace via rename
        let path = self.key_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self, key: StoreKey) -> Result<(), SessionStoreError> {
        if key == StoreKey::Credential {
            *self.credential.write().await = None;
            return Ok(());
        }

        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::IoError(e.to_string())),
        }
    }
}
