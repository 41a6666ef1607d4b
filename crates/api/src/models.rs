//! Database models and API payloads.

use chrono::{DateTime, Utc};
use garde::Validate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub account_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public view of a user; never exposes the password hash.
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            account_balance: self.account_balance,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub account_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub account_balance: Decimal,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterPayload {
    #[garde(length(min = 1, max = 100))]
    pub first_name: String,
    #[garde(length(min = 1, max = 100))]
    pub last_name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    /// Optional opening balance, defaults to zero.
    #[garde(skip)]
    pub account_balance: Option<Decimal>,
}

/// Login request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Profile update request; all fields optional.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[garde(inner(length(min = 1, max = 100)))]
    pub first_name: Option<String>,
    #[garde(inner(length(min = 1, max = 100)))]
    pub last_name: Option<String>,
    #[garde(inner(email))]
    pub email: Option<String>,
}

impl UpdateUserPayload {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}
