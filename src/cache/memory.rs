//! In-process cache store.
//!
//! Entries live in a bounded LRU. Expiry is passive: a lookup that finds a
//! stale entry drops it and reports a miss.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use glob::Pattern;
use lru::LruCache;
use metrics::counter;
use tracing::warn;

use super::store::{CacheEntry, CacheStore, Clock, StoreError, SystemClock};

pub(crate) const METRIC_CACHE_EVICT_TOTAL: &str = "larder_cache_evict_total";

pub struct MemoryStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: NonZeroUsize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// Number of stored entries, including ones that expired but were not read since.
    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!(
                target_module = "larder::cache::memory",
                op,
                result = "poisoned_recovered",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock("get");

        let lookup = entries
            .get(key)
            .map(|entry| entry.is_fresh(now).then(|| entry.payload.clone()));

        match lookup {
            Some(Some(payload)) => Ok(Some(payload)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), StoreError> {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            created_at: self.clock.now(),
            ttl,
        };

        let displaced = self.lock("set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = displaced {
            if evicted_key != key {
                counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
            }
        }
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, StoreError> {
        let pattern = Pattern::new(pattern)
            .map_err(|err| StoreError::Backend(format!("invalid key pattern: {err}")))?;

        let mut entries = self.lock("delete_matching");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }
}
