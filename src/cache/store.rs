//! Cache store contract and entry model.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;

/// Failures a cache backend may report. All of them are transient from the
/// caller's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache store timed out after {0:?}")]
    Timeout(Duration),
    #[error("cache store error: {0}")]
    Backend(String),
}

/// Shared key-value store with TTL and pattern deletion.
///
/// Each primitive is expected to be atomic on its own; there is no cross-key
/// transaction.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), StoreError>;

    /// Delete every key matching a glob pattern, returning how many were removed.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, StoreError>;
}

/// A stored payload. Entries are written once and only ever removed.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Bytes,
    pub created_at: OffsetDateTime,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn expires_at(&self) -> OffsetDateTime {
        self.created_at + self.ttl
    }

    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at()
    }
}

/// Time source for TTL decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn entry_freshness_follows_ttl() {
        let created_at = datetime!(2026-01-01 12:00 UTC);
        let entry = CacheEntry {
            key: "k".to_string(),
            payload: Bytes::from_static(b"[]"),
            created_at,
            ttl: Duration::from_secs(300),
        };

        assert!(entry.is_fresh(created_at));
        assert!(entry.is_fresh(created_at + Duration::from_secs(299)));
        assert!(!entry.is_fresh(created_at + Duration::from_secs(300)));
        assert!(!entry.is_fresh(created_at + Duration::from_secs(301)));
    }

    #[test]
    fn manual_clock_advances() {
        let start = datetime!(2026-01-01 12:00 UTC);
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(301));
        assert_eq!(clock.now(), start + Duration::from_secs(301));
    }
}
