//! TTL cache with lazy background refresh.
//!
//! [`LockCache::is_active`] answers from memory and, when the subject's record
//! is missing or older than the TTL, spawns a refresh on the tokio runtime
//! without waiting for it. The renderer polls again on its own cadence and
//! picks up the new record then.
//!
//! # Refresh rules
//!
//! - At most one refresh per subject is in flight; reads that arrive while
//!   one is running do not schedule another.
//! - A refresh with no credential configured does nothing.
//! - `Absent` and `Found` outcomes replace the whole record; errors leave the
//!   existing record alone so the next stale read retries.
//! - A completion stamped older than the stored record is discarded, keeping
//!   `fetched_at` non-decreasing per subject.
//! - Every write is followed by a background save of the full snapshot.
//!
//! Locks guarding the record map are never held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::client::{LockLookup, LookupOutcome};
use crate::config::CredentialSource;
use crate::durable::{from_durable, to_durable, DurableCache};
use crate::error::{LockBadgeError, Result};
use crate::store::{CacheStore, KeyValueStore, MemoryBackend};
use crate::types::{CacheRecord, LockRecord};

/// Freshness window for a record.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct Shared {
    records: RwLock<HashMap<String, CacheRecord>>,
    in_flight: Mutex<HashSet<String>>,
    background: AtomicUsize,
    idle: Notify,
    persist_lock: Mutex<()>,
    lookup: Arc<dyn LockLookup>,
    credentials: Arc<dyn CredentialSource>,
    store: Arc<dyn CacheStore>,
    runtime: Handle,
    ttl: Duration,
    clock: Clock,
}

/// Handle to the lock status cache. Clones share the same state.
#[derive(Clone)]
pub struct LockCache {
    shared: Arc<Shared>,
}

pub struct LockCacheBuilder {
    lookup: Arc<dyn LockLookup>,
    credentials: Arc<dyn CredentialSource>,
    store: Option<Arc<dyn CacheStore>>,
    runtime: Option<Handle>,
    ttl: Duration,
    clock: Option<Clock>,
}

impl LockCacheBuilder {
    /// Persistence backend (default: process-local key-value store).
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Runtime that refresh and save tasks are spawned on
    /// (default: the runtime `build` is called from).
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Source of "now" in milliseconds since the Unix epoch.
    pub fn clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<LockCache> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| LockBadgeError::RuntimeUnavailable)?,
        };
        let store: Arc<dyn CacheStore> = match self.store {
            Some(store) => store,
            None => Arc::new(KeyValueStore::new(MemoryBackend::new())),
        };
        let clock: Clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(|| Utc::now().timestamp_millis()),
        };

        Ok(LockCache {
            shared: Arc::new(Shared {
                records: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashSet::new()),
                background: AtomicUsize::new(0),
                idle: Notify::new(),
                persist_lock: Mutex::new(()),
                lookup: self.lookup,
                credentials: self.credentials,
                store,
                runtime,
                ttl: self.ttl,
                clock,
            }),
        })
    }
}

/// Counts a spawned task until dropped.
struct BackgroundTask {
    shared: Arc<Shared>,
}

impl BackgroundTask {
    fn start(shared: &Arc<Shared>) -> Self {
        shared.background.fetch_add(1, Ordering::SeqCst);
        Self {
            shared: Arc::clone(shared),
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        if self.shared.background.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.idle.notify_waiters();
        }
    }
}

/// Marks a subject as having a refresh in flight until dropped.
struct InFlight {
    shared: Arc<Shared>,
    subject_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Recover from poisoning - the set only holds keys
        self.shared
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.subject_id);
    }
}

impl LockCache {
    pub fn builder(
        lookup: Arc<dyn LockLookup>,
        credentials: Arc<dyn CredentialSource>,
    ) -> LockCacheBuilder {
        LockCacheBuilder {
            lookup,
            credentials,
            store: None,
            runtime: None,
            ttl: DEFAULT_TTL,
            clock: None,
        }
    }

    fn now_ms(&self) -> i64 {
        (self.shared.clock)()
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.shared.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Presentation Surface
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whether `subject_id` has at least one lock, per the current snapshot.
    ///
    /// Never waits on I/O. A missing or stale record schedules a background
    /// refresh; this call still answers from what is already in memory, so
    /// an unseen subject reads as not locked until the refresh lands.
    pub fn is_active(&self, subject_id: &str) -> bool {
        let now = self.now_ms();
        let ttl_ms = self.ttl_ms();
        let (active, stale) = {
            let records = self
                .shared
                .records
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match records.get(subject_id) {
                Some(record) => (record.has_locks(), record.is_stale(now, ttl_ms)),
                None => (false, true),
            }
        };

        if stale {
            self.schedule_refresh(subject_id);
        }
        active
    }

    /// First lock of the subject's record, if any.
    pub fn first_lock(&self, subject_id: &str) -> Option<LockRecord> {
        self.shared
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(subject_id)
            .and_then(|record| record.first_lock().cloned())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────────────

    fn schedule_refresh(&self, subject_id: &str) {
        {
            let mut in_flight = self
                .shared
                .in_flight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !in_flight.insert(subject_id.to_string()) {
                debug!(subject_id, "Refresh already in flight");
                return;
            }
        }

        let guard = InFlight {
            shared: Arc::clone(&self.shared),
            subject_id: subject_id.to_string(),
        };
        let task = BackgroundTask::start(&self.shared);
        let cache = self.clone();
        debug!(subject_id, "Scheduling refresh");
        self.shared.runtime.spawn(async move {
            let _task = task;
            let guard = guard;
            cache.refresh(&guard.subject_id).await;
        });
    }

    /// Fetches `subject_id` from the remote service and stores the result.
    ///
    /// Returns true when the record was written. No credential, a lookup
    /// error, or a completion older than the stored record all return false
    /// and leave the cache untouched.
    pub async fn refresh(&self, subject_id: &str) -> bool {
        let api_key = self.shared.credentials.api_key();
        if api_key.is_empty() {
            debug!(subject_id, "No API key configured, skipping refresh");
            return false;
        }

        let outcome = match self.shared.lookup.fetch_status(subject_id, &api_key).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(subject_id, error = %err, "Lock lookup failed, keeping cached record");
                return false;
            }
        };

        let now = self.now_ms();
        let record = match outcome {
            LookupOutcome::Absent => {
                debug!(subject_id, "Subject has no linked account");
                CacheRecord::absent(subject_id, now)
            }
            LookupOutcome::Found { profile, locks } => {
                debug!(subject_id, lock_count = locks.len(), "Lock lookup succeeded");
                CacheRecord::found(subject_id, profile, locks, now)
            }
        };

        if !self.write(record) {
            return false;
        }
        self.persist_in_background();
        true
    }

    /// Stores `record` unless the existing one is newer.
    fn write(&self, record: CacheRecord) -> bool {
        let mut records = self
            .shared
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = records.get(&record.subject_id) {
            if existing.fetched_at > record.fetched_at {
                debug!(
                    subject_id = %record.subject_id,
                    existing = existing.fetched_at,
                    incoming = record.fetched_at,
                    "Discarding out-of-order refresh result"
                );
                return false;
            }
        }
        records.insert(record.subject_id.clone(), record);
        true
    }

    /// Number of subjects with a refresh currently running.
    pub fn pending_refreshes(&self) -> usize {
        self.shared
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Resolves once no refresh or save task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.background.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────────

    /// Durable projection of the current cache contents.
    pub fn snapshot(&self) -> DurableCache {
        let records = self
            .shared
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        to_durable(&records)
    }

    pub fn len(&self) -> usize {
        self.shared
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the whole cache with what the store holds.
    ///
    /// A failing or empty store leaves the cache empty. Returns the number
    /// of records loaded.
    pub fn seed(&self) -> usize {
        let store = &self.shared.store;
        let loaded = match store.load() {
            Ok(Some(durable)) => from_durable(durable),
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!(store = store.name(), error = %err, "Failed to load cache, starting empty");
                HashMap::new()
            }
        };
        let count = loaded.len();
        *self
            .shared
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = loaded;
        info!(store = store.name(), records = count, "Cache seeded");
        count
    }

    /// Saves the full snapshot now. Failures are logged, never returned.
    pub fn flush(&self) {
        self.persist_now();
    }

    fn persist_now(&self) {
        // One save at a time, snapshot taken under the lock.
        let _persist = self
            .shared
            .persist_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = self.snapshot();
        let store = &self.shared.store;
        if let Err(err) = store.save(&snapshot) {
            warn!(store = store.name(), error = %err, "Failed to save cache");
        }
    }

    fn persist_in_background(&self) {
        let task = BackgroundTask::start(&self.shared);
        let cache = self.clone();
        self.shared.runtime.spawn_blocking(move || {
            let _task = task;
            cache.persist_now();
        });
    }
}
