//! Listing result cache.
//!
//! Recipe listings are cached per requesting identity and filter set. Every
//! recipe mutation drops the whole namespace of the affected owner, so the
//! next listing for that owner is recomputed from the database.
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! ttl_seconds = 300
//! ```

mod config;
mod gate;
mod keys;
mod memory;
mod redis;
mod store;

pub use config::{CacheBackend, CacheConfig};
pub use gate::ResultCacheGate;
pub(crate) use gate::{
    METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATED_TOTAL, METRIC_CACHE_MISS_TOTAL,
    METRIC_CACHE_STORE_ERROR_TOTAL,
};
pub use keys::{CacheKey, Identity, LISTING_NAMESPACE, derive_key, owner_pattern};
pub use memory::MemoryStore;
pub(crate) use memory::METRIC_CACHE_EVICT_TOTAL;
pub use redis::RedisStore;
pub use store::{CacheEntry, CacheStore, Clock, ManualClock, StoreError, SystemClock};
