//! Settings loading and the credential seam.
//!
//! The cache only ever needs one thing from settings: the API credential,
//! read fresh on every refresh so a key entered at runtime takes effect
//! without a restart. That read goes through [`CredentialSource`].

use std::env;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LockBadgeError, Result};
use crate::storage::StorageConfig;

pub const API_KEY_ENV: &str = "LOCKBADGE_API_KEY";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Read-only access to the configured API credential.
///
/// An empty string means no credential is configured; the cache treats that
/// as an idle state, not an error.
pub trait CredentialSource: Send + Sync {
    fn api_key(&self) -> String;
}

/// A fixed credential, mostly for tests and one-shot hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(pub String);

impl CredentialSource for StaticCredential {
    fn api_key(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: lockbadge_protocol::DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Loads settings.json, returning defaults if the file is missing or
    /// malformed. `LOCKBADGE_API_KEY` overrides the stored key when set.
    pub fn load(storage: &StorageConfig) -> Self {
        let path = storage.settings_file();
        let mut settings = match fs_err::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "Malformed settings file, using defaults");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };

        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                settings.api_key = key;
            }
        }

        settings
    }

    /// Saves settings.json, creating the namespace directory if needed.
    pub fn save(&self, storage: &StorageConfig) -> Result<()> {
        let path = storage.settings_file();
        storage
            .ensure_dirs()
            .map_err(|source| LockBadgeError::ConfigWriteFailed {
                path: path.clone(),
                source,
            })?;
        let content = serde_json::to_string_pretty(self).map_err(|source| LockBadgeError::Json {
            context: "serialize settings".to_string(),
            source,
        })?;
        fs_err::write(&path, content)
            .map_err(|source| LockBadgeError::ConfigWriteFailed { path, source })
    }

    pub fn shared(self) -> SharedSettings {
        SharedSettings(Arc::new(RwLock::new(self)))
    }
}

impl CredentialSource for Settings {
    fn api_key(&self) -> String {
        self.api_key.trim().to_string()
    }
}

/// Settings handle the host can update while the cache is running.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<RwLock<Settings>>);

impl SharedSettings {
    pub fn get(&self) -> Settings {
        // Recover from poisoning - settings are plain data
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) {
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.api_key = api_key.into();
    }
}

impl CredentialSource for SharedSettings {
    fn api_key(&self) -> String {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .api_key()
    }
}
