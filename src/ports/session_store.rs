//! Session Store Port - Interface for persisting assessment state.
//!
//! The store holds three independent values: the gateway credential, the
//! assigned candidate id, and a serialized snapshot of the session. Values
//! are opaque strings; callers own the encoding.

use async_trait::async_trait;
use std::fmt;

/// Keys the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Credential,
    CandidateId,
    Snapshot,
}

impl StoreKey {
    /// All keys, in clearing order.
    pub fn all() -> &'static [StoreKey] {
        &[StoreKey::Snapshot, StoreKey::CandidateId, StoreKey::Credential]
    }

    /// Stable name used by file-backed stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Credential => "credential",
            StoreKey::CandidateId => "candidate_id",
            StoreKey::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during session store operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Failed to serialize {key}: {message}")]
    SerializationFailed { key: StoreKey, message: String },

    #[error("Failed to deserialize {key}: {message}")]
    DeserializationFailed { key: StoreKey, message: String },

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for reading and writing session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads a value
    ///
    /// # Returns
    /// `None` if nothing is stored under the key
    async fn get(&self, key: StoreKey) -> Result<Option<String>, SessionStoreError>;

    /// Writes a value, replacing any previous one
    async fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionStoreError>;

    /// Removes a value. Clearing a missing key is not an error.
    async fn clear(&self, key: StoreKey) -> Result<(), SessionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            StoreKey::all().iter().map(StoreKey::as_str).collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn error_display_names_key() {
        let err = SessionStoreError::DeserializationFailed {
            key: StoreKey::Snapshot,
            message: "bad yaml".into(),
        };
        assert_eq!(err.to_string(), "Failed to deserialize snapshot: bad yaml");
    }
}
