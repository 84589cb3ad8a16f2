//! The `StatusCache` trait and typed JSON helpers.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Key/value cache with per-key TTL.
///
/// Values are JSON text; the typed [`get_json`]/[`set_json`] helpers handle
/// (de)serialization. Implementations must be safe for concurrent use and
/// must honor the fail-soft contract: backend errors are logged inside the
/// implementation and surface only as a miss (`get`) or a no-op
/// (`set`/`delete`).
#[async_trait]
pub trait StatusCache: Send + Sync {
    /// Look up a key. `None` on miss, expiry, or backend failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value under a key, replacing any previous entry and
    /// restarting its TTL clock.
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove a key, if present.
    async fn delete(&self, key: &str);
}

/// Typed read through the cache. Payloads that fail to deserialize are
/// treated as misses.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn StatusCache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%key, error = %e, "discarding undecodable cache entry");
            None
        }
    }
}

/// Typed write through the cache. Serialization failures are dropped
/// (fail soft); the next read simply misses.
pub async fn set_json<T: Serialize>(
    cache: &dyn StatusCache,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, raw, ttl).await,
        Err(e) => warn!(%key, error = %e, "failed to serialize cache entry"),
    }
}

/// A cache that never stores anything.
///
/// Stands in for an unreachable backend: every read misses, every write
/// and delete is a no-op. Running the engine against it exercises the
/// cache-disabled degradation path.
pub struct NullCache;

#[async_trait]
impl StatusCache for NullCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}
}
