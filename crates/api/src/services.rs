//! Session services.
//!
//! - **tokens** - access token issuance and validation (HS256, per-token jti)
//! - **password** - Argon2id hashing and verification
//!
//! Both are concrete types on `AppState`; the mockable seams of this crate
//! are the stores, the repos, and the publisher.

mod password;
mod tokens;

pub use password::PasswordHasher;
pub use tokens::{Claims, TokenService};
