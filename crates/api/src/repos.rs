//! Database repositories (PostgreSQL).
//!
//! The relational layer here is deliberately thin - just enough CRUD to
//! exercise the session/notification pipeline. Each repo is a trait for
//! mocking in tests, with a Pg-backed implementation.

mod users;

pub use users::{PgUserRepo, UserRepo};

#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all repositories.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
}
