//! Token revocation store backed by Redis.
//!
//! Logout marks the token's jti as revoked for the remainder of its natural
//! lifetime; the auth middleware checks the marker on every request. Entries
//! expire store-side, so an expired marker is indistinguishable from "never
//! revoked" - intentional, since the token itself has expired by then.

use async_trait::async_trait;
use redis::AsyncCommands;

use super::kv::KvClient;

/// Store for revoked token identifiers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark a token as revoked until its natural expiry.
    /// Returns whether the marker was written.
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> bool;

    /// Check whether a token has been revoked.
    ///
    /// Fail-open: a store outage reads as "not revoked" - an outage must not
    /// lock out otherwise-valid sessions.
    async fn is_revoked(&self, jti: &str) -> bool;
}

/// Redis implementation of RevocationStore.
#[derive(Clone)]
pub struct RedisRevocationStore {
    kv: KvClient,
}

impl RedisRevocationStore {
    pub fn new(kv: KvClient) -> Self {
        Self { kv }
    }

    fn key(jti: &str) -> String {
        format!("bl:{}", jti)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.kv.handle().await else {
            tracing::warn!(jti, "revocation store unavailable, token not revoked");
            return false;
        };

        // SETEX rejects a zero TTL; a token this close to expiry still gets
        // a one-second marker.
        let ttl = ttl_secs.max(1);

        match conn.set_ex::<_, _, ()>(Self::key(jti), "1", ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(jti, "failed to revoke token: {}", e);
                self.kv.reset().await;
                false
            }
        }
    }

    async fn is_revoked(&self, jti: &str) -> bool {
        let Some(mut conn) = self.kv.handle().await else {
            return false;
        };

        match conn.exists::<_, bool>(Self::key(jti)).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(jti, "revocation check failed (treating as not revoked): {}", e);
                self.kv.reset().await;
                false
            }
        }
    }
}
