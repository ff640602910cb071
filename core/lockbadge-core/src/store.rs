//! Persistent store backends for the durable cache.
//!
//! Two interchangeable backends sit behind [`CacheStore`]:
//!
//! - [`FileStore`]: `<data_dir>/<namespace>/data.json`, pretty-printed, whole
//!   file overwritten on each save.
//! - [`KeyValueStore`]: one string key in a host-provided key-value map, value
//!   is the whole cache as JSON.
//!
//! [`open_store`] picks one from what the environment allows.
//!
//! # Defensive Design
//!
//! A missing key, an empty file and unparseable JSON all load as "no data".
//! Only genuine I/O failures surface as [`StoreError`], and the cache logs
//! and drops those too.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::durable::{parse_durable, DurableCache};
use crate::storage::StorageConfig;

/// Key used by [`KeyValueStore`].
pub const CACHE_KEY: &str = "chasterCache";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Key-value backend error: {0}")]
    Backend(String),
}

pub trait CacheStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns None when nothing usable is stored.
    fn load(&self) -> Result<Option<DurableCache>, StoreError>;

    fn save(&self, cache: &DurableCache) -> Result<(), StoreError>;
}

/// Parses stored text, treating blank or malformed content as no data.
fn parse_stored(content: &str, origin: &str) -> Option<DurableCache> {
    if content.trim().is_empty() {
        warn!(origin, "Empty cache data, starting empty");
        return None;
    }
    match parse_durable(content) {
        Ok(cache) => Some(cache),
        Err(err) => {
            warn!(origin, error = %err, "Failed to parse cache data, starting empty");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// File Backend
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.data_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

impl CacheStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<Option<DurableCache>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs_err::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_stored(&content, "file"))
    }

    fn save(&self, cache: &DurableCache) -> Result<(), StoreError> {
        self.ensure_parent()?;
        let content = serde_json::to_string_pretty(cache).map_err(|source| StoreError::Json {
            context: "serialize cache".to_string(),
            source,
        })?;
        fs_err::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Key-Value Backend
// ═══════════════════════════════════════════════════════════════════════════════

/// String key-value map supplied by the host environment.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Process-local key-value map.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory backend poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory backend poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct KeyValueStore<B> {
    backend: B,
    key: String,
}

impl<B: KeyValueBackend> KeyValueStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, CACHE_KEY)
    }

    pub fn with_key(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: KeyValueBackend> CacheStore for KeyValueStore<B> {
    fn name(&self) -> &'static str {
        "key-value"
    }

    fn load(&self) -> Result<Option<DurableCache>, StoreError> {
        Ok(self
            .backend
            .get(&self.key)?
            .and_then(|content| parse_stored(&content, "key-value")))
    }

    fn save(&self, cache: &DurableCache) -> Result<(), StoreError> {
        let content = serde_json::to_string(cache).map_err(|source| StoreError::Json {
            context: "serialize cache".to_string(),
            source,
        })?;
        self.backend.set(&self.key, content)
    }
}

/// Selects a backend from what the environment allows.
///
/// A creatable data directory gets the file backend; otherwise the cache
/// keeps its durable copy in a process-local key-value map.
pub fn open_store(storage: &StorageConfig) -> Arc<dyn CacheStore> {
    match storage.ensure_dirs() {
        Ok(()) => Arc::new(FileStore::from_config(storage)),
        Err(err) => {
            warn!(
                dir = %storage.namespace_dir().display(),
                error = %err,
                "Data directory unavailable, using in-memory key-value store"
            );
            Arc::new(KeyValueStore::new(MemoryBackend::new()))
        }
    }
}
