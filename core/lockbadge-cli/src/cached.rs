//! `lockbadge cached`: print the durable cache without touching the network.

use lockbadge_core::{open_store, DurableCache, LockBadgeError, StorageConfig};

pub fn run(storage: &StorageConfig) -> Result<(), LockBadgeError> {
    println!("{}", render(storage)?);
    Ok(())
}

fn render(storage: &StorageConfig) -> Result<String, LockBadgeError> {
    let cache = open_store(storage).load()?.unwrap_or_else(DurableCache::new);
    serde_json::to_string_pretty(&cache).map_err(|source| LockBadgeError::Json {
        context: "render cache".to_string(),
        source,
    })
}
