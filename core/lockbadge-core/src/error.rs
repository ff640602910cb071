//! Error types for lockbadge-core operations.
//!
//! None of these reach the presentation surface: the cache logs and absorbs
//! them. They exist for the host's startup path and for diagnostics.

use std::path::PathBuf;

/// Errors from configuration and host-facing setup.
///
/// Lookup and storage failures have their own types
/// ([`LookupError`](crate::client::LookupError),
/// [`StoreError`](crate::store::StoreError)) and convert into this one.
#[derive(Debug, thiserror::Error)]
pub enum LockBadgeError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No tokio runtime available to run background refreshes")]
    RuntimeUnavailable,

    // ─────────────────────────────────────────────────────────────────────
    // Subsystem Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    Lookup(#[from] crate::client::LookupError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using LockBadgeError.
pub type Result<T> = std::result::Result<T, LockBadgeError>;
