//! Durable projection of the cache.
//!
//! Only the fields listed on the `Durable*` structs are ever written. Anything
//! else the remote service returned lives in the in-memory `extra` maps and is
//! dropped here, so the on-disk format stays stable if the API grows.
//!
//! # File Format
//!
//! ```json
//! {
//!   "1360237881263783967": {
//!     "subjectId": "1360237881263783967",
//!     "profile": { "id": "acc-1", "displayName": "ivy" },
//!     "locks": [ { "id": "lock-1", "status": "locked" } ],
//!     "fetchedAt": 1769817600000
//!   }
//! }
//! ```
//!
//! Optional fields are omitted when absent. `profile` and `locks` are always
//! written because `null` carries meaning for both.
//!
//! # Legacy Records
//!
//! Files written by the earlier overlay hold `{ "timestamp", "data",
//! "lockData" }` records that reuse the remote service's field names.
//! [`parse_durable`] accepts those alongside the current shape; the next
//! save rewrites them in the current format.

use std::collections::{BTreeMap, HashMap};

use lockbadge_protocol::{LockResponse, UserResponse};
use serde::{Deserialize, Serialize};

use crate::types::{CacheRecord, LockRecord, Profile};

/// Subject id → durable record, sorted for stable output.
pub type DurableCache = BTreeMap<String, DurableRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableRecord {
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub profile: Option<DurableProfile>,
    #[serde(default)]
    pub locks: Option<Vec<DurableLock>>,
    pub fetched_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableLock {
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_remaining: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlockable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyholder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
}

impl From<&Profile> for DurableProfile {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
        }
    }
}

impl From<DurableProfile> for Profile {
    fn from(profile: DurableProfile) -> Self {
        Self {
            id: profile.id,
            display_name: profile.display_name,
            extra: Default::default(),
        }
    }
}

impl From<&LockRecord> for DurableLock {
    fn from(lock: &LockRecord) -> Self {
        Self {
            id: lock.id.clone(),
            status: lock.status.clone(),
            end_date: lock.end_date.clone(),
            show_remaining: lock.show_remaining,
            unlockable: lock.unlockable,
            keyholder_name: lock.keyholder_name.clone(),
            frozen: lock.frozen,
        }
    }
}

impl From<DurableLock> for LockRecord {
    fn from(lock: DurableLock) -> Self {
        Self {
            id: lock.id,
            status: lock.status,
            end_date: lock.end_date,
            show_remaining: lock.show_remaining,
            unlockable: lock.unlockable,
            keyholder_name: lock.keyholder_name,
            frozen: lock.frozen,
            extra: Default::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    timestamp: i64,
    #[serde(default)]
    data: Option<UserResponse>,
    #[serde(default)]
    lock_data: Option<Vec<LockResponse>>,
}

impl LegacyRecord {
    fn into_durable(self, subject_id: &str) -> DurableRecord {
        DurableRecord {
            subject_id: subject_id.to_string(),
            profile: self
                .data
                .and_then(Profile::from_response)
                .map(|profile| DurableProfile::from(&profile)),
            locks: self.lock_data.map(|locks| {
                locks
                    .into_iter()
                    .map(|lock| DurableLock::from(&LockRecord::from(lock)))
                    .collect()
            }),
            fetched_at: self.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(DurableRecord),
    Legacy(LegacyRecord),
}

/// Parses stored cache text in either the current or the legacy shape.
pub fn parse_durable(content: &str) -> serde_json::Result<DurableCache> {
    let stored: BTreeMap<String, StoredRecord> = serde_json::from_str(content)?;
    Ok(stored
        .into_iter()
        .map(|(subject_id, record)| {
            let record = match record {
                StoredRecord::Current(record) => record,
                StoredRecord::Legacy(legacy) => legacy.into_durable(&subject_id),
            };
            (subject_id, record)
        })
        .collect())
}

fn project_record(record: &CacheRecord) -> DurableRecord {
    DurableRecord {
        subject_id: record.subject_id.clone(),
        profile: record.profile.as_ref().map(DurableProfile::from),
        locks: record
            .locks
            .as_ref()
            .map(|locks| locks.iter().map(DurableLock::from).collect()),
        fetched_at: record.fetched_at,
    }
}

/// Projects the in-memory cache down to the durable schema.
pub fn to_durable(cache: &HashMap<String, CacheRecord>) -> DurableCache {
    cache
        .iter()
        .map(|(subject_id, record)| (subject_id.clone(), project_record(record)))
        .collect()
}

/// Rebuilds the in-memory cache from its durable form.
///
/// The map key is authoritative for the subject id; a record whose stored
/// `subjectId` is missing or disagrees takes the key.
pub fn from_durable(durable: DurableCache) -> HashMap<String, CacheRecord> {
    durable
        .into_iter()
        .map(|(subject_id, record)| {
            let restored = CacheRecord {
                subject_id: subject_id.clone(),
                profile: record.profile.map(Profile::from),
                locks: record
                    .locks
                    .map(|locks| locks.into_iter().map(LockRecord::from).collect()),
                fetched_at: record.fetched_at,
            };
            (subject_id, restored)
        })
        .collect()
}
