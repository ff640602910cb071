//! Storage configuration and path management.
//!
//! `StorageConfig` centralizes every path lockbadge touches so callers never
//! build paths by hand and tests can inject a temp directory.
//!
//! ## Layout
//!
//! ```text
//! <data_dir>/<namespace>/
//!   data.json       durable cache
//!   settings.json   credential and tuning
//!   logs/           rolling log files (written by the CLI)
//! ```

use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "lockbadge";
pub const DATA_DIR_ENV: &str = "LOCKBADGE_DATA_DIR";
/// Generic override honoured after [`DATA_DIR_ENV`].
pub const FALLBACK_DATA_DIR_ENV: &str = "DATA_DIR";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base data directory (default: platform data dir)
    data_dir: PathBuf,
    /// Subdirectory owned by lockbadge
    namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: resolve_data_dir(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Picks the base data directory: env overrides, then the platform data
/// dir, then the current directory.
fn resolve_data_dir() -> PathBuf {
    [DATA_DIR_ENV, FALLBACK_DATA_DIR_ENV]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(dirs::data_dir)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom data directory.
    /// Used for testing with temp directories.
    pub fn with_root(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directory holding every lockbadge file.
    pub fn namespace_dir(&self) -> PathBuf {
        self.data_dir.join(&self.namespace)
    }

    /// Path to data.json (durable cache).
    pub fn data_file(&self) -> PathBuf {
        self.namespace_dir().join("data.json")
    }

    /// Path to settings.json (credential and tuning).
    pub fn settings_file(&self) -> PathBuf {
        self.namespace_dir().join("settings.json")
    }

    /// Path to logs/ directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.namespace_dir().join("logs")
    }

    /// Ensures the namespace directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(self.namespace_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_with_root_sets_custom_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/test-data"));
        assert_eq!(config.data_dir(), Path::new("/tmp/test-data"));
        assert_eq!(config.namespace(), "lockbadge");
    }

    #[test]
    fn test_data_file_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/data"));
        assert_eq!(
            config.data_file(),
            PathBuf::from("/tmp/data/lockbadge/data.json")
        );
    }

    #[test]
    fn test_custom_namespace() {
        let config =
            StorageConfig::with_root(PathBuf::from("/tmp/data")).with_namespace("vencordChaster");
        assert_eq!(
            config.data_file(),
            PathBuf::from("/tmp/data/vencordChaster/data.json")
        );
        assert_eq!(
            config.settings_file(),
            PathBuf::from("/tmp/data/vencordChaster/settings.json")
        );
    }

    #[test]
    fn test_logs_dir_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/data"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/data/lockbadge/logs"));
    }

    #[test]
    fn test_ensure_dirs_creates_namespace() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().join("nested"));
        config.ensure_dirs().unwrap();
        assert!(config.namespace_dir().is_dir());
    }
}
