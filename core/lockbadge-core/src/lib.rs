//! # lockbadge-core
//!
//! Cache-and-refresh layer behind the lock status overlay. Answers "does this
//! subject have an active lock?" from memory and keeps the answer fresh by
//! refreshing from the remote lookup service in the background.
//!
//! ## Design Principles
//!
//! - **Never blocks the renderer**: [`LockCache::is_active`] is synchronous and
//!   answers from the current snapshot; refreshes run as detached tokio tasks.
//! - **Graceful degradation**: missing credentials, network failures and
//!   unreadable storage leave stale or empty data, never an error on the
//!   presentation surface.
//! - **Explicit ownership**: the cache is an object the host constructs once
//!   and shares by cloning the `LockCache` handle; there is no global state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lockbadge_core::{open_store, HttpLookupClient, LockCache, Settings, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let settings = Settings::load(&storage);
//! let lookup = Arc::new(HttpLookupClient::new(&settings)?);
//! let cache = LockCache::builder(lookup, Arc::new(settings.shared()))
//!     .store(open_store(&storage))
//!     .build()?;
//! cache.seed();
//! let locked = cache.is_active("1360237881263783967");
//! ```

pub mod badge;
pub mod cache;
pub mod client;
pub mod config;
pub mod durable;
pub mod error;
pub mod format;
pub mod storage;
pub mod store;
pub mod types;

pub use badge::Badge;
pub use cache::{LockCache, LockCacheBuilder, DEFAULT_TTL};
pub use client::{HttpLookupClient, LockLookup, LookupError, LookupOutcome};
pub use config::{CredentialSource, Settings, SharedSettings, StaticCredential};
pub use durable::{
    from_durable, parse_durable, to_durable, DurableCache, DurableLock, DurableProfile, DurableRecord,
};
pub use error::{LockBadgeError, Result};
pub use format::{remaining_time_label, remaining_time_label_at};
pub use storage::StorageConfig;
pub use store::{
    open_store, CacheStore, FileStore, KeyValueBackend, KeyValueStore, MemoryBackend, StoreError,
};
pub use types::{CacheRecord, LockRecord, Profile};
