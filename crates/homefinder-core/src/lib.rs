//! HomeFinder client core.
//!
//! Talks to the HomeFinder listing backend: properties, favorites, reviews
//! and accounts. Requests carry the stored access token; an expired token is
//! refreshed once and the request replayed, and a session that cannot be
//! renewed is cleared so the user has to sign in again.
//!
//! ```no_run
//! use std::sync::Arc;
//! use homefinder_core::{ClientConfig, KeyringStore, PropertyApi, PropertyFilters};
//!
//! # async fn run() -> Result<(), homefinder_core::ApiError> {
//! let api = PropertyApi::new(&ClientConfig::default(), Arc::new(KeyringStore::new()))?;
//! let filters = PropertyFilters { bedrooms: Some(3), ..Default::default() };
//! for property in api.get_all_properties(&filters).await? {
//!     println!("{} - {}", property.title, property.full_address());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, ErrorKind, PropertyApi};
pub use auth::{EncryptedFileStore, KeyringStore, MemoryStore, Session, SessionStore};
pub use config::{ClientConfig, Config, CredentialBackend};
pub use models::*;
