use async_trait::async_trait;
use keyring::Entry;

use super::store::{SessionStore, StoreError};

/// Default keychain service name
pub const SERVICE_NAME: &str = "homefinder";

/// Session store backed by the OS keychain. Each key is its own keychain
/// entry under a shared service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Run a keychain operation off the async runtime; the platform
    /// keychains block.
    async fn run<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)?;
            op(entry).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.run(key, move |entry| entry.set_password(&value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.run(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

    #[test]
    fn test_default_service_name() {
        assert_eq!(KeyringStore::default().service, SERVICE_NAME);
    }

    // Needs a reachable OS keychain: `cargo test -- --ignored`
    #[tokio::test]
    #[ignore = "requires an OS keychain"]
    async fn test_value_written_is_read_back() {
        let store = KeyringStore::with_service(format!("homefinder-test-{}", std::process::id()));

        store.set(ACCESS_TOKEN_KEY, "A1").await.unwrap();
        store.set(REFRESH_TOKEN_KEY, "R1").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));

        store.set(ACCESS_TOKEN_KEY, "A2").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A2"));

        store.delete(ACCESS_TOKEN_KEY).await.unwrap();
        store.delete(REFRESH_TOKEN_KEY).await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
        // Deleting again is not an error.
        store.delete(ACCESS_TOKEN_KEY).await.unwrap();
    }
}
