//! In-memory TTL cache backend.
//!
//! Suitable for single-process deployments and tests. Expiry uses
//! `tokio::time::Instant`, so TTL behavior is driven by the runtime clock
//! and can be tested under paused time. Expired entries are evicted lazily
//! on read.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::StatusCache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory cache with per-key TTL.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all expired entries. Reads already ignore them; this just
    /// reclaims memory for long-lived processes with many dead keys.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StatusCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: evict under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at <= Instant::now() {
                entries.remove(key);
            }
        }
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }
}
