//! Read-through gate in front of the recipe listing.
//!
//! The gate never fails a request because of the store: lookups that error
//! fall back to computing, writes and invalidations that error are logged and
//! counted. Only the compute function's own error reaches the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};

use super::config::{CacheBackend, CacheConfig};
use super::keys::{CacheKey, Identity, owner_pattern};
use super::memory::MemoryStore;
use super::redis::RedisStore;
use super::store::{CacheStore, StoreError};

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "larder_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "larder_cache_miss_total";
pub(crate) const METRIC_CACHE_STORE_ERROR_TOTAL: &str = "larder_cache_store_error_total";
pub(crate) const METRIC_CACHE_INVALIDATED_TOTAL: &str = "larder_cache_invalidated_total";

#[derive(Clone)]
pub struct ResultCacheGate {
    store: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
}

impl fmt::Debug for ResultCacheGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCacheGate")
            .field("enabled", &self.store.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResultCacheGate {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store: Some(store),
            ttl,
        }
    }

    /// A gate that always computes and never stores.
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: Duration::ZERO,
        }
    }

    /// Build the gate and its store from configuration.
    ///
    /// Only configuration errors fail here; a Redis server that is down at
    /// start-up surfaces later as degraded lookups.
    pub fn from_config(config: &CacheConfig) -> Result<Self, StoreError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new(config.capacity_non_zero())),
            CacheBackend::Redis => Arc::new(RedisStore::open(
                &config.redis_url,
                &config.key_prefix,
                config.operation_timeout(),
            )?),
        };

        Ok(Self::new(store, config.ttl()))
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached payload for `key`, or compute, store and return it.
    ///
    /// A hit is returned byte-for-byte as stored. When `compute` fails its
    /// error is returned and nothing is written.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &CacheKey, compute: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        let Some(store) = self.store.as_ref() else {
            return compute().await;
        };

        match store.get(key.as_str()).await {
            Ok(Some(payload)) => {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                debug!(key = key.as_str(), "listing cache hit");
                return Ok(payload);
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                debug!(key = key.as_str(), "listing cache miss");
            }
            Err(err) => {
                record_store_error("get", &err);
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
            }
        }

        let payload = compute().await?;

        match store.set(key.as_str(), payload.clone(), self.ttl).await {
            Ok(()) => debug!(
                key = key.as_str(),
                ttl_secs = self.ttl.as_secs(),
                bytes = payload.len(),
                "listing cached"
            ),
            Err(err) => record_store_error("set", &err),
        }

        Ok(payload)
    }

    /// Drop every cached listing computed for `identity`.
    pub async fn invalidate_owner(&self, identity: Identity) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let pattern = owner_pattern(identity);
        match store.delete_matching(&pattern).await {
            Ok(deleted) => {
                counter!(METRIC_CACHE_INVALIDATED_TOTAL).increment(deleted);
                info!(owner = %identity, deleted, "listing cache invalidated");
            }
            Err(err) => record_store_error("delete_matching", &err),
        }
    }
}

fn record_store_error(op: &'static str, err: &StoreError) {
    counter!(METRIC_CACHE_STORE_ERROR_TOTAL, "op" => op).increment(1);
    warn!(op, error = %err, "cache store operation failed");
}
