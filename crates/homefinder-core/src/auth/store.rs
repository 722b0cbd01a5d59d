use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Store key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Store key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Store key holding the JSON-encoded user info from the last login/refresh.
pub const USER_INFO_KEY: &str = "userInfo";

/// Store key holding the persisted search filters.
pub const FILTERS_KEY: &str = "propertyFilters";

/// Every key that belongs to a session.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    Crypto(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Key-value capability for secrets. Implementations must be atomic per key;
/// the client does no locking of its own around them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "A1").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));

        store.set(ACCESS_TOKEN_KEY, "A2").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A2"));

        store.delete(ACCESS_TOKEN_KEY).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_delete_missing_key() {
        let store = MemoryStore::new();
        store.delete(REFRESH_TOKEN_KEY).await.unwrap();
        store.delete(REFRESH_TOKEN_KEY).await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
