//! Remote lookup client.
//!
//! Resolves a subject id to its lock collection with two chained calls:
//! identity lookup by external id, then lock lookup by internal account id.
//! A 404 from the first call is the one non-2xx that is not an error: it
//! means the subject has no linked account.

use std::time::Duration;

use async_trait::async_trait;
use lockbadge_protocol::{
    bearer, locks_lookup_path, user_lookup_path, LockResponse, UserResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::Settings;
use crate::types::{LockRecord, Profile};

const CLIENT_USER_AGENT: &str = concat!("lockbadge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Upstream reports the subject has no linked account.
    Absent,
    Found {
        profile: Profile,
        locks: Vec<LockRecord>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {path}")]
    Status { status: u16, path: String },

    #[error("Identity lookup returned no account id")]
    MissingAccountId,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

/// Source of lock status for a subject.
///
/// Implementors report transport and decode failures as errors; the cache
/// decides what a failure means for the stored record.
#[async_trait]
pub trait LockLookup: Send + Sync {
    async fn fetch_status(
        &self,
        subject_id: &str,
        api_key: &str,
    ) -> Result<LookupOutcome, LookupError>;
}

/// [`LockLookup`] over the public HTTP API.
#[derive(Clone)]
pub struct HttpLookupClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupClient {
    pub fn new(settings: &Settings) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()?;
        Ok(Self::with_client(client, &settings.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, headers: &HeaderMap) -> Result<reqwest::Response, LookupError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Lock lookup request");
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        Ok(response)
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap, LookupError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&bearer(api_key))
            .map_err(|e| LookupError::InvalidCredential(e.to_string()))?,
    );
    Ok(headers)
}

#[async_trait]
impl LockLookup for HttpLookupClient {
    async fn fetch_status(
        &self,
        subject_id: &str,
        api_key: &str,
    ) -> Result<LookupOutcome, LookupError> {
        let headers = build_headers(api_key)?;

        let path = user_lookup_path(subject_id);
        let response = self.get(&path, &headers).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(LookupOutcome::Absent);
        }
        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status().as_u16(),
                path,
            });
        }
        let user: UserResponse = response.json().await?;
        let profile = Profile::from_response(user).ok_or(LookupError::MissingAccountId)?;

        let path = locks_lookup_path(&profile.id);
        let response = self.get(&path, &headers).await?;
        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status().as_u16(),
                path,
            });
        }
        let locks: Vec<LockResponse> = response.json().await?;

        Ok(LookupOutcome::Found {
            profile,
            locks: locks.into_iter().map(LockRecord::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local HTTP server that answers one canned response per connection, in
    /// order, and records each request head it read.
    struct CannedServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        async fn start(responses: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            tokio::spawn(async move {
                for (status, body) in responses {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        return;
                    };
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    seen.lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&head).into_owned());

                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            Self { base_url, requests }
        }

        fn client(&self) -> HttpLookupClient {
            let client = reqwest::Client::builder().no_proxy().build().unwrap();
            HttpLookupClient::with_client(client, &self.base_url)
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Two-Stage Lookup Tests
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn identity_not_found_is_absent_without_lock_call() {
        let server = CannedServer::start(vec![(404, ""), (200, "[]")]).await;

        let outcome = server.client().fetch_status("u1", "k-1").await.unwrap();

        assert_eq!(outcome, LookupOutcome::Absent);
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /users/search/by-discord-id/u1 "));
    }

    #[tokio::test]
    async fn found_maps_lock_fields_and_sends_bearer() {
        let server = CannedServer::start(vec![
            (200, r#"{"_id":"acc-1","username":"ivy","avatarUrl":"x"}"#),
            (
                200,
                r#"[{"_id":"lock-1","status":"locked","endDate":"2026-01-31T00:00:00.000Z","displayRemainingTime":true,"canBeUnlocked":false,"keyholder":{"username":"kh"},"isFrozen":true,"title":"Weekend"}]"#,
            ),
        ])
        .await;

        let outcome = server.client().fetch_status("u1", "k-1").await.unwrap();

        let (profile, locks) = match outcome {
            LookupOutcome::Found { profile, locks } => (profile, locks),
            other => panic!("expected Found, got {:?}", other),
        };
        assert_eq!(profile.id, "acc-1");
        assert_eq!(profile.display_name.as_deref(), Some("ivy"));
        assert_eq!(locks.len(), 1);
        let lock = &locks[0];
        assert_eq!(lock.id, "lock-1");
        assert_eq!(lock.status, "locked");
        assert_eq!(lock.end_date.as_deref(), Some("2026-01-31T00:00:00.000Z"));
        assert_eq!(lock.show_remaining, Some(true));
        assert_eq!(lock.unlockable, Some(false));
        assert_eq!(lock.keyholder_name.as_deref(), Some("kh"));
        assert_eq!(lock.frozen, Some(true));
        assert!(lock.extra.contains_key("title"));

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].starts_with("GET /locks/user/acc-1 "));
        for head in &requests {
            assert!(head.to_ascii_lowercase().contains("authorization: bearer k-1"));
        }
    }

    #[tokio::test]
    async fn lock_stage_failure_is_an_error() {
        let server = CannedServer::start(vec![(200, r#"{"_id":"a1"}"#), (500, "")]).await;

        let result = server.client().fetch_status("u1", "k-1").await;

        assert!(matches!(
            result,
            Err(LookupError::Status { status: 500, ref path }) if path == "/locks/user/a1"
        ));
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn identity_failure_other_than_404_is_an_error() {
        let server = CannedServer::start(vec![(401, "")]).await;

        let result = server.client().fetch_status("u1", "k-1").await;

        assert!(matches!(result, Err(LookupError::Status { status: 401, .. })));
    }

    #[tokio::test]
    async fn missing_or_empty_account_id_stops_after_identity() {
        for body in [r#"{"username":"x"}"#, r#"{"_id":""}"#] {
            let server = CannedServer::start(vec![(200, body), (200, "[]")]).await;

            let result = server.client().fetch_status("u1", "k-1").await;

            assert!(matches!(result, Err(LookupError::MissingAccountId)), "{}", body);
            assert_eq!(server.requests().len(), 1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Client Construction Tests
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn headers_carry_bearer_credential() {
        let headers = build_headers("k-1").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer k-1");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ua| ua.starts_with("lockbadge/")));
    }

    #[test]
    fn control_characters_in_key_are_rejected() {
        assert!(matches!(
            build_headers("bad\nkey"),
            Err(LookupError::InvalidCredential(_))
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let settings = Settings {
            base_url: "http://localhost:9000/".to_string(),
            ..Settings::default()
        };
        let client = HttpLookupClient::new(&settings).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}
