//! Ephemeral stores (Redis).
//!
//! This module contains traits and implementations for everything the API
//! keeps in Redis. All of it is TTL-expiring safety/performance state, never
//! a system of record, so every store fails open when Redis is unreachable
//! (see `kv::KvClient`).
//!
//! ## Stores
//!
//! - **revocation** - logged-out token identifiers (TTL = remaining token life)
//! - **rate_limit** - fixed-window request counters (TTL = window length)
//! - **cache** - serialized response fragments (TTL per entry, default 5 min)
//!
//! ## Redis Key Patterns
//!
//! ```text
//! bl:{jti}                    → revocation marker (auto-expires)
//! rl:{operation}:{client_ip}  → request counter for one window
//! cache:{key}                 → JSON value
//! ```
//!
//! The three prefixes are disjoint so that pattern-based cache invalidation
//! can never match a revocation or rate-limit entry.
//!
//! ## Usage in Handlers
//!
//! Stores are accessed via `state.stores`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     if state.stores.revocation.is_revoked(&jti).await { /* 401 */ }
//!     state.stores.cache.invalidate(&format!("user:{}:*", user_id)).await;
//! }
//! ```

mod cache;
mod kv;
mod rate_limit;
mod revocation;

pub use cache::{DEFAULT_TTL_SECS, RedisResponseCache, ResponseCache};
pub use kv::KvClient;
pub use rate_limit::{RateLimitDecision, RateLimiter, RedisRateLimiter};
pub use revocation::{RedisRevocationStore, RevocationStore};

#[cfg(test)]
pub use cache::MockResponseCache;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;
#[cfg(test)]
pub use revocation::MockRevocationStore;

use std::sync::Arc;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub revocation: Arc<dyn RevocationStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub cache: Arc<dyn ResponseCache>,
}
