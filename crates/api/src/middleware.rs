//! Cross-cutting request pipeline stages.
//!
//! - **auth** - bearer-token authentication as an extractor: JWT validation,
//!   revocation check, user lookup
//! - **rate_limit** - per-route fixed-window throttling keyed by client IP

pub mod auth;
pub mod rate_limit;
