use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CacheEntry {
    valid: bool,
    inserted_at: Instant,
}

/// Bounded TTL cache for validation verdicts.
///
/// Must be cleared after every ingestion pass: a verdict cached against the
/// previous corpus is stale the moment the repository is reloaded.
pub(crate) struct ValidationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl ValidationCache {
    pub(crate) fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub(crate) async fn get(&self, code: &str) -> Option<bool> {
        let entries = self.entries.read().await;
        let entry = entries.get(code)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.valid)
    }

    /// Insert a verdict. When full, expired entries are dropped first; if the
    /// cache is still full the verdict is simply not cached.
    pub(crate) async fn insert(&self, code: &str, valid: bool) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity && !entries.contains_key(code) {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
            if entries.len() >= self.capacity {
                return;
            }
        }
        entries.insert(
            code.to_string(),
            CacheEntry {
                valid,
                inserted_at: Instant::now(),
            },
        );
    }

    pub(crate) async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
