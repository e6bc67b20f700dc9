//! In-Memory Session Store Adapter
//!
//! Keeps values in a map. Useful for testing and development; write failures
//! can be switched on to exercise storage error paths.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::ports::{SessionStore, SessionStoreError, StoreKey};

/// In-memory storage for session state
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    values: Arc<RwLock<HashMap<StoreKey, String>>>,
    fail_writes: Arc<AtomicBool>,
    failing_keys: Arc<Mutex<HashSet<StoreKey>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a credential
    pub fn with_credential(token: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(StoreKey::Credential, token.into());
        Self {
            values: Arc::new(RwLock::new(values)),
            ..Self::default()
        }
    }

    /// Make subsequent `set` calls fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `set` fail for one key only (or succeed again)
    pub fn set_fail_writes_for(&self, key: StoreKey, fail: bool) {
        let mut keys = self
            .failing_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if fail {
            keys.insert(key);
        } else {
            keys.remove(&key);
        }
    }

    fn write_fails(&self, key: StoreKey) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
            || self
                .failing_keys
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .contains(&key)
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get the number of stored keys
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, SessionStoreError> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionStoreError> {
        if self.write_fails(key) {
            return Err(SessionStoreError::IoError(format!(
                "simulated write failure for {}",
                key
            )));
        }
        self.values.write().await.insert(key, value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, key: StoreKey) -> Result<(), SessionStoreError> {
        self.values.write().await.remove(&key);
        Ok(())
    }
}
