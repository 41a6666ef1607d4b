//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for
//! constructing `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user};
//!
//! let mut users = MockUserRepo::new();
//! users.expect_find_by_id().returning(|_| Ok(Some(mock_user("alice@example.com"))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(users)
//!     .build();
//! ```

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::Config;
use crate::models::User;
use crate::queue::MockEventPublisher;
use crate::repos::{MockUserRepo, Repos};
use crate::services::{PasswordHasher, TokenService};
use crate::state::AppState;
use crate::stores::{
    KvClient, MockRateLimiter, MockResponseCache, MockRevocationStore, Stores,
};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: "redis://test".to_string(),
        amqp_url: "amqp://test".to_string(),
        jwt_secret: "test-secret-key-at-least-32-characters".to_string(),
        jwt_expires_hours: 1,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Creates a mock user with the given email.
pub fn mock_user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: "Jan".to_string(),
        last_name: "Kowalski".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$fake".to_string(),
        account_balance: Decimal::new(10_000, 2),
        created_at: Utc::now(),
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store not explicitly set. This
/// allows tests to only configure the mocks they actually need.
pub struct TestStateBuilder {
    user_repo: Option<MockUserRepo>,
    revocation: Option<MockRevocationStore>,
    rate_limiter: Option<MockRateLimiter>,
    cache: Option<MockResponseCache>,
    publisher: Option<MockEventPublisher>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            user_repo: None,
            revocation: None,
            rate_limiter: None,
            cache: None,
            publisher: None,
        }
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_revocation(mut self, store: MockRevocationStore) -> Self {
        self.revocation = Some(store);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MockRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_cache(mut self, cache: MockResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_publisher(mut self, publisher: MockEventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            users: Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new)),
        };

        let stores = Stores {
            revocation: Arc::new(self.revocation.unwrap_or_else(MockRevocationStore::new)),
            rate_limiter: Arc::new(self.rate_limiter.unwrap_or_else(MockRateLimiter::new)),
            cache: Arc::new(self.cache.unwrap_or_else(MockResponseCache::new)),
        };

        let config = test_config();

        // Lazy pool: no connection is attempted unless a test actually
        // queries the database.
        let database = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();

        AppState {
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_hours),
            passwords: PasswordHasher::with_params(4096, 1, 1),
            publisher: Arc::new(self.publisher.unwrap_or_else(MockEventPublisher::new)),
            config,
            database,
            kv: KvClient::disconnected(),
            repos,
            stores,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
