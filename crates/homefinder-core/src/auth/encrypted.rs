//! Passphrase-encrypted file store for hosts without an OS keychain.
//!
//! File layout: `MAGIC | salt (16) | nonce (12) | ciphertext`. The plaintext
//! is a JSON object of key/value pairs. The key is derived from the
//! passphrase with Argon2id and the stored salt; every write uses a fresh
//! nonce.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use argon2::Argon2;
use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::debug;

use super::store::{SessionStore, StoreError};

const MAGIC: &[u8; 4] = b"HFS1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

pub struct EncryptedFileStore {
    path: PathBuf,
    salt: [u8; SALT_LEN],
    cipher: ChaCha20Poly1305,
    entries: Mutex<HashMap<String, String>>,
}

impl EncryptedFileStore {
    /// Open an existing store or prepare a new one at `path`. Fails if the
    /// file exists and cannot be decrypted with `passphrase`.
    pub async fn open(path: impl AsRef<Path>, passphrase: &str) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if tokio::fs::try_exists(&path).await? {
            let contents = tokio::fs::read(&path).await?;
            if contents.len() < HEADER_LEN || &contents[..MAGIC.len()] != MAGIC {
                return Err(StoreError::Crypto("not a credential store file".to_string()));
            }
            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(&contents[MAGIC.len()..MAGIC.len() + SALT_LEN]);
            let cipher = derive_cipher(passphrase, &salt)?;
            let nonce = Nonce::from_slice(&contents[MAGIC.len() + SALT_LEN..HEADER_LEN]);
            let plaintext = cipher
                .decrypt(nonce, &contents[HEADER_LEN..])
                .map_err(|_| StoreError::Crypto("wrong passphrase or corrupted file".to_string()))?;
            let entries: HashMap<String, String> = serde_json::from_slice(&plaintext)?;
            debug!(path = %path.display(), keys = entries.len(), "Opened credential file");

            return Ok(Self {
                path,
                salt,
                cipher,
                entries: Mutex::new(entries),
            });
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let cipher = derive_cipher(passphrase, &salt)?;
        Ok(Self {
            path,
            salt,
            cipher,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(entries)?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| StoreError::Crypto("encryption failed".to_string()))?;

        let mut contents = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        contents.extend_from_slice(MAGIC);
        contents.extend_from_slice(&self.salt);
        contents.extend_from_slice(&nonce);
        contents.extend_from_slice(&ciphertext);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn derive_cipher(passphrase: &str, salt: &[u8]) -> Result<ChaCha20Poly1305, StoreError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| StoreError::Crypto(e.to_string()))?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}

#[async_trait]
impl SessionStore for EncryptedFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        // Memory only changes once the file does.
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }
}
