use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    config::Config,
    queue::EventPublisher,
    repos::Repos,
    services::{PasswordHasher, TokenService},
    stores::{KvClient, Stores},
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database pool (health checks; repos hold their own clones).
    pub database: Pool<Postgres>,
    /// Redis handle (health checks; stores hold their own clones).
    pub kv: KvClient,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral stores (Redis).
    pub stores: Stores,
    /// Access token issuance and validation.
    pub tokens: TokenService,
    /// Password hashing.
    pub passwords: PasswordHasher,
    /// Notification queue publisher.
    pub publisher: Arc<dyn EventPublisher>,
}
