//! Credential storage and session persistence.
//!
//! This module provides:
//! - `SessionStore`: the async get/set/delete capability the client is built on
//! - `MemoryStore`, `KeyringStore`, `EncryptedFileStore`: implementations
//! - `Session`: the access token / refresh token / user info group
//!
//! Stores are injected into the API client as `Arc<dyn SessionStore>`.

pub mod encrypted;
pub mod keychain;
pub mod session;
pub mod store;

pub use encrypted::EncryptedFileStore;
pub use keychain::KeyringStore;
pub use session::Session;
pub use store::{
    MemoryStore, SessionStore, StoreError, ACCESS_TOKEN_KEY, FILTERS_KEY, REFRESH_TOKEN_KEY,
    SESSION_KEYS, USER_INFO_KEY,
};
