//! Client configuration.
//!
//! `ClientConfig` is what the transport needs: a base URL and a request
//! timeout. `Config` is the persisted user configuration it is derived
//! from, stored at `~/.config/homefinder/config.json`, with environment
//! overrides applied on top.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "homefinder";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API root
pub const API_BASE_URL: &str = "http://192.169.0.100:8000/api";

/// HTTP request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Environment variable overriding the API root
pub const ENV_API_URL: &str = "HOMEFINDER_API_URL";

/// Environment variable overriding the request timeout
pub const ENV_TIMEOUT_MS: &str = "HOMEFINDER_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Where session credentials are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// Passphrase-encrypted file in the data directory
    File,
    /// Process memory only
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub last_username: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the encrypted credential file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Build the transport configuration, letting the environment override
    /// the file.
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with(|name| std::env::var(name).ok())
    }

    fn client_config_with(&self, env: impl Fn(&str) -> Option<String>) -> ClientConfig {
        let base_url = env(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| API_BASE_URL.to_string());

        let timeout_ms = match env(ENV_TIMEOUT_MS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_MS);
                    None
                }
            },
            None => None,
        }
        .or(self.request_timeout_ms)
        .unwrap_or(REQUEST_TIMEOUT_MS);

        ClientConfig::new(base_url).with_timeout(Duration::from_millis(timeout_ms))
    }
}
