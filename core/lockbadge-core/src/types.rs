//! In-memory record types held by the cache.
//!
//! These mirror the durable schema plus an `extra` map carrying whatever the
//! remote service sent beyond it. `extra` never reaches disk; see
//! [`durable`](crate::durable).

use lockbadge_protocol::{LockResponse, UserResponse};
use serde_json::{Map, Value};

/// Identity snapshot of a subject's linked account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Builds a profile from the identity lookup response.
    ///
    /// Returns None when the response carries no usable account id.
    pub fn from_response(user: UserResponse) -> Option<Self> {
        let id = user.account_id()?.to_string();
        Some(Self {
            id,
            display_name: user.username,
            extra: user.extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LockRecord {
    pub id: String,
    /// Domain status tag, e.g. "locked".
    pub status: String,
    /// ISO-8601 end timestamp; None means no defined end.
    pub end_date: Option<String>,
    pub show_remaining: Option<bool>,
    pub unlockable: Option<bool>,
    pub keyholder_name: Option<String>,
    pub frozen: Option<bool>,
    pub extra: Map<String, Value>,
}

impl From<LockResponse> for LockRecord {
    fn from(lock: LockResponse) -> Self {
        let mut extra = lock.extra;
        let keyholder_name = lock.keyholder.map(|kh| {
            if !kh.extra.is_empty() {
                extra.insert("keyholder".to_string(), Value::Object(kh.extra));
            }
            kh.username
        });
        Self {
            id: lock.id,
            status: lock.status,
            end_date: lock.end_date,
            show_remaining: lock.display_remaining_time,
            unlockable: lock.can_be_unlocked,
            keyholder_name,
            frozen: lock.is_frozen,
            extra,
        }
    }
}

/// Per-subject cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub subject_id: String,
    /// None means upstream confirmed the subject has no linked account.
    pub profile: Option<Profile>,
    /// None means unknown (never fetched, or confirmed absent); an empty
    /// vec means fetched with no locks.
    pub locks: Option<Vec<LockRecord>>,
    /// Milliseconds since the Unix epoch of the last successful refresh.
    pub fetched_at: i64,
}

impl CacheRecord {
    pub fn found(
        subject_id: impl Into<String>,
        profile: Profile,
        locks: Vec<LockRecord>,
        fetched_at: i64,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            profile: Some(profile),
            locks: Some(locks),
            fetched_at,
        }
    }

    pub fn absent(subject_id: impl Into<String>, fetched_at: i64) -> Self {
        Self {
            subject_id: subject_id.into(),
            profile: None,
            locks: None,
            fetched_at,
        }
    }

    /// True when the record holds at least one lock.
    pub fn has_locks(&self) -> bool {
        self.locks.as_ref().is_some_and(|locks| !locks.is_empty())
    }

    pub fn first_lock(&self) -> Option<&LockRecord> {
        self.locks.as_ref().and_then(|locks| locks.first())
    }

    /// True when `now - fetched_at` has reached `ttl_ms`.
    pub fn is_stale(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.fetched_at) >= ttl_ms
    }
}
