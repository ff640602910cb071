//! `lockbadge status`: the host render loop, run once.
//!
//! Seeds the cache from disk, reads every requested subject through the
//! presentation surface, optionally waits for the refreshes that triggered,
//! prints one badge line per subject from the settled snapshot, then flushes
//! the cache back to disk. Each subject is looked up at most once per run.

use std::sync::Arc;

use chrono::Utc;
use lockbadge_core::{
    open_store, Badge, CredentialSource, HttpLookupClient, LockBadgeError, LockCache, Settings,
    StorageConfig,
};
use tokio::runtime::Runtime;
use tracing::{info, warn};

pub fn run(
    runtime: &Runtime,
    storage: &StorageConfig,
    settings: Settings,
    subject_ids: &[String],
    wait: bool,
) -> Result<(), LockBadgeError> {
    if settings.api_key().is_empty() {
        warn!("No API key configured; showing cached data only");
    }

    let lookup = HttpLookupClient::new(&settings)?;
    let cache = LockCache::builder(Arc::new(lookup), Arc::new(settings.clone().shared()))
        .store(open_store(storage))
        .runtime(runtime.handle().clone())
        .build()?;
    cache.seed();

    for subject_id in subject_ids {
        cache.is_active(subject_id);
    }
    if wait {
        runtime.block_on(cache.wait_idle());
    }

    let now = Utc::now();
    for subject_id in subject_ids {
        println!(
            "{}",
            render_line(subject_id, Badge::for_subject(&cache, subject_id, now))
        );
    }

    if wait {
        runtime.block_on(cache.wait_idle());
    }
    cache.flush();
    info!(records = cache.len(), "Cache flushed");
    Ok(())
}

fn render_line(subject_id: &str, badge: Option<Badge>) -> String {
    match badge {
        Some(badge) => format!("{}\t{}", subject_id, badge),
        None => format!("{}\tnot locked", subject_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_unlocked_subject() {
        assert_eq!(render_line("u1", None), "u1\tnot locked");
    }

    #[test]
    fn renders_badge() {
        let badge = Badge {
            unlockable: false,
            frozen: false,
            keyholder: Some("kh".to_string()),
            remaining: None,
        };
        assert_eq!(render_line("u1", Some(badge)), "u1\t🔒 Locked by kh");
    }

    #[test]
    fn run_without_key_prints_cached_state() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        let runtime = Runtime::new().unwrap();

        run(
            &runtime,
            &storage,
            Settings::default(),
            &["u1".to_string()],
            true,
        )
        .unwrap();

        assert!(storage.data_file().exists());
    }
}
