//! User repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, account_balance, created_at";

/// Repository for user operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user.
    async fn create(&self, new: NewUser) -> Result<User>;

    /// Apply a partial profile update, returning the updated row.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User>;
}

/// PostgreSQL implementation of UserRepo.
#[derive(Clone)]
pub struct PgUserRepo {
    pool: Pool<Postgres>,
}

impl PgUserRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, first_name, last_name, email, password_hash, account_balance) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.account_balance)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 email = COALESCE($4, email) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
