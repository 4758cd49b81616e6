//! Redis-backed cache store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{RedisError, RedisResult};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::store::{CacheStore, StoreError};

const SCAN_BATCH: u64 = 200;

/// Cache store talking to an external Redis.
///
/// The `ConnectionManager` is created on first use and reconnects on its own
/// after connection-level failures.
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
    pattern_prefix: String,
    op_timeout: Duration,
    manager: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// Validate the URL. No connection is made until the first operation.
    pub fn open(url: &str, prefix: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| StoreError::Unavailable(format!("invalid redis url: {err}")))?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            pattern_prefix: escape_glob(prefix),
            op_timeout,
            manager: OnceCell::new(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// `SCAN MATCH` pattern: the prefix is matched literally.
    fn pattern(&self, pattern: &str) -> String {
        format!("{}{}", self.pattern_prefix, pattern)
    }

    async fn manager(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|err| StoreError::Unavailable(err.to_string()))?;
                info!(target = "larder::cache", "Redis connection manager ready");
                Ok::<_, StoreError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }

    /// Run one store operation under the configured deadline.
    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout))?
    }

    fn classify(&self, err: RedisError) -> StoreError {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::Unavailable(err.to_string())
        } else if err.is_timeout() {
            StoreError::Timeout(self.op_timeout)
        } else {
            StoreError::Backend(err.to_string())
        }
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, StoreError> {
        let mut conn = self.manager().await?;
        let result: RedisResult<T> = cmd.query_async(&mut conn).await;
        result.map_err(|err| self.classify(err))
    }
}

/// Backslash-escape the characters Redis glob patterns treat specially.
fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let full_key = self.key(key);
        self.bounded(async {
            let mut cmd = redis::cmd("GET");
            cmd.arg(&full_key);
            let value: Option<Vec<u8>> = self.query(cmd).await?;
            Ok(value.map(Bytes::from))
        })
        .await
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> Result<(), StoreError> {
        let full_key = self.key(key);
        let seconds = ttl.as_secs().max(1);
        self.bounded(async {
            let mut cmd = redis::cmd("SET");
            cmd.arg(&full_key).arg(payload.as_ref()).arg("EX").arg(seconds);
            self.query::<()>(cmd).await?;
            debug!(key, ttl_secs = seconds, "redis set");
            Ok(())
        })
        .await
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, StoreError> {
        let full_pattern = self.pattern(pattern);
        self.bounded(async {
            let mut cursor: u64 = 0;
            let mut keys: Vec<String> = Vec::new();
            loop {
                let mut cmd = redis::cmd("SCAN");
                cmd.arg(cursor)
                    .arg("MATCH")
                    .arg(&full_pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH);
                let (next, batch): (u64, Vec<String>) = self.query(cmd).await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }

            if keys.is_empty() {
                return Ok(0);
            }

            let mut cmd = redis::cmd("DEL");
            cmd.arg(&keys);
            let deleted: u64 = self.query(cmd).await?;
            debug!(pattern, deleted, "redis delete by pattern");
            Ok(deleted)
        })
        .await
    }
}
