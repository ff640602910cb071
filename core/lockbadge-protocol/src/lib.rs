//! Wire types for the remote lock lookup service.
//!
//! Shared by the lookup client and its tests to prevent schema drift. The
//! remote service is the authority on these shapes; we only model the fields
//! we read and keep everything else in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.chaster.app";

/// Path prefix for the identity lookup (stage one).
pub const USER_BY_DISCORD_ID_PATH: &str = "/users/search/by-discord-id";

/// Path prefix for the lock collection lookup (stage two).
pub const LOCKS_BY_USER_PATH: &str = "/locks/user";

pub fn user_lookup_path(subject_id: &str) -> String {
    format!("{}/{}", USER_BY_DISCORD_ID_PATH, subject_id)
}

pub fn locks_lookup_path(account_id: &str) -> String {
    format!("{}/{}", LOCKS_BY_USER_PATH, account_id)
}

/// Value for the `Authorization` header on every request.
pub fn bearer(api_key: &str) -> String {
    format!("Bearer {}", api_key)
}

/// Body of a 200 response from the identity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserResponse {
    /// Internal account id, if the response carries a usable one.
    pub fn account_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyholderResponse {
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of the array returned by the lock collection lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_remaining_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_unlocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyholder: Option<KeyholderResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_frozen: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
