//! Per-client request throttling backed by Redis.
//!
//! Fixed-window counter: one atomic INCR per request against a
//! `rl:{operation}:{client}` key whose TTL is the window length. The TTL is
//! set only on the first increment of a window - re-arming it on every hit
//! would keep the window open forever under sustained traffic. Multiple
//! server processes share counters through Redis; INCR's atomicity is what
//! makes the count correct, no in-process locking involved.
//!
//! The limiter must never become a point of failure for the service it
//! protects, so every store error fails open and only logs.

use async_trait::async_trait;

use super::kv::KvClient;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Under the limit, includes the post-increment count.
    Allowed(i64),
    /// Over the limit; retry once the window expires.
    Rejected { retry_after_secs: i64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed(_))
    }
}

/// Rate limiter trait for checking and incrementing counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a request against (operation, client) and decide whether to
    /// allow it. Store errors allow the request.
    async fn allow(
        &self,
        operation: &str,
        client: &str,
        max_requests: i64,
        window_secs: i64,
    ) -> RateLimitDecision;
}

/// Redis implementation of RateLimiter.
#[derive(Clone)]
pub struct RedisRateLimiter {
    kv: KvClient,
}

impl RedisRateLimiter {
    pub fn new(kv: KvClient) -> Self {
        Self { kv }
    }

    fn key(operation: &str, client: &str) -> String {
        format!("rl:{}:{}", operation, client)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(
        &self,
        operation: &str,
        client: &str,
        max_requests: i64,
        window_secs: i64,
    ) -> RateLimitDecision {
        let Some(mut conn) = self.kv.handle().await else {
            return RateLimitDecision::Allowed(0);
        };

        let key = Self::key(operation, client);

        // INCR and TTL in one round trip. TTL == -1 means the key has no
        // expiry yet, i.e. this INCR opened a fresh window.
        let counted: Result<(i64, i64), _> = redis::pipe()
            .cmd("INCR")
            .arg(&key)
            .cmd("TTL")
            .arg(&key)
            .query_async(&mut conn)
            .await;

        let (count, ttl) = match counted {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(operation, client, "rate limit error (allowing request): {}", e);
                self.kv.reset().await;
                return RateLimitDecision::Allowed(0);
            }
        };

        let mut remaining = ttl;
        if ttl == -1 {
            // Two processes' first increments can both see TTL == -1 and
            // both EXPIRE; the window shifts by their skew once, it is not
            // re-armed per request.
            if let Err(e) = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_secs)
                .query_async::<()>(&mut conn)
                .await
            {
                tracing::warn!(operation, client, "failed to arm rate limit window: {}", e);
            }
            remaining = window_secs;
        }

        if count > max_requests {
            RateLimitDecision::Rejected {
                retry_after_secs: remaining.clamp(0, window_secs),
            }
        } else {
            RateLimitDecision::Allowed(count)
        }
    }
}
