//! Response cache backed by Redis.
//!
//! Values are JSON under `cache:{key}`; the prefix keeps pattern-based
//! invalidation away from the `bl:` and `rl:` namespaces sharing the same
//! store. Correctness relies on TTLs, not on invalidation being watertight:
//! `invalidate` is SCAN + DEL, and a key created concurrently may survive
//! it. Every failure degrades to a miss or a failed write - the cache never
//! raises into a request handler.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use super::kv::KvClient;

/// Default entry lifetime (5 min).
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Generic get/set/invalidate cache for serialized responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a cached value. Any error reads as a miss.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Cache a value with the given TTL. Returns whether the write happened.
    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> bool;

    /// Delete all entries whose key matches the glob pattern
    /// (e.g., `user:42:*`). Returns the number of keys deleted.
    async fn invalidate(&self, pattern: &str) -> u64;
}

/// Redis implementation of ResponseCache.
#[derive(Clone)]
pub struct RedisResponseCache {
    kv: KvClient,
}

impl RedisResponseCache {
    pub fn new(kv: KvClient) -> Self {
        Self { kv }
    }

    fn key(key: &str) -> String {
        format!("cache:{}", key)
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.kv.handle().await?;

        let json: Option<String> = match conn.get(Self::key(key)).await {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!(key, "cache get error: {}", e);
                self.kv.reset().await;
                return None;
            }
        };

        match json {
            Some(j) => match serde_json::from_str(&j) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(key, "cache entry is not valid JSON: {}", e);
                    None
                }
            },
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.kv.handle().await else {
            return false;
        };

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!(key, "cache set serialization error: {}", e);
                return false;
            }
        };

        match conn
            .set_ex::<_, _, ()>(Self::key(key), json, ttl_secs.max(1))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(key, "cache set error: {}", e);
                self.kv.reset().await;
                false
            }
        }
    }

    async fn invalidate(&self, pattern: &str) -> u64 {
        let Some(mut conn) = self.kv.handle().await else {
            return 0;
        };

        // SCAN holds the connection, so collect first and DEL on a clone.
        let mut scan_conn = conn.clone();
        let full_pattern = Self::key(pattern);

        let mut keys: Vec<String> = Vec::new();
        match scan_conn.scan_match::<_, String>(&full_pattern).await {
            Ok(mut iter) => {
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }
            Err(e) => {
                tracing::debug!(pattern, "cache invalidate scan error: {}", e);
                self.kv.reset().await;
                return 0;
            }
        }

        if keys.is_empty() {
            return 0;
        }

        match conn.del::<_, u64>(&keys).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::debug!(pattern, "cache invalidate delete error: {}", e);
                self.kv.reset().await;
                0
            }
        }
    }
}
