//! Wire contract for the notification queue.
//!
//! The API server publishes these messages and the consumer process drains
//! them, so both sides must agree on the queue name and the JSON shape.
//! Messages are flat JSON objects; everything except `event` and `email` is
//! optional and defaults to an empty string on the consumer side.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Durable queue the email consumer binds to.
pub const EMAIL_QUEUE: &str = "email-send";

/// A queued notification event.
///
/// Immutable once published. `registered_at` is RFC 3339 UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub event: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub registered_at: String,
}

impl NotificationMessage {
    /// Message published when a new user completes registration.
    pub fn user_registered(email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            event: "user_registered".to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            registered_at: Utc::now().to_rfc3339(),
        }
    }
}
