//! Per-route rate limiting.
//!
//! Each throttled route gets its own policy (operation id, limit, window)
//! and counts requests per client IP through the shared Redis counters, so
//! the limit holds across server processes. Rejection is the one error in
//! this subsystem that is surfaced to users: 429 with a retry hint. When
//! the store is down the limiter allows everything - throttling must not
//! take the service down with it.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::state::AppState;
use crate::stores::RateLimitDecision;

/// Throttling policy for one operation.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Namespaces the counter key; distinct per throttled operation.
    pub operation: &'static str,
    pub max_requests: i64,
    pub window_secs: i64,
}

/// Registration: 3 attempts per minute per IP.
pub const REGISTER: RateLimitPolicy = RateLimitPolicy {
    operation: "reg",
    max_requests: 3,
    window_secs: 60,
};

/// Login: 5 attempts per minute per IP.
pub const LOGIN: RateLimitPolicy = RateLimitPolicy {
    operation: "login",
    max_requests: 5,
    window_secs: 60,
};

/// Middleware entry points for `middleware::from_fn_with_state`.
pub async fn register_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(REGISTER, &state, req, next).await
}

pub async fn login_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(LOGIN, &state, req, next).await
}

async fn enforce(
    policy: RateLimitPolicy,
    state: &AppState,
    req: Request,
    next: Next,
) -> Response {
    let client = client_addr(&req);

    let decision = state
        .stores
        .rate_limiter
        .allow(
            policy.operation,
            &client,
            policy.max_requests,
            policy.window_secs,
        )
        .await;

    match decision {
        RateLimitDecision::Allowed(_) => next.run(req).await,
        RateLimitDecision::Rejected { retry_after_secs } => {
            tracing::info!(
                operation = policy.operation,
                client = %client,
                "rate limit exceeded"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many requests. Try again later.",
                    "retry_after": retry_after_secs,
                })),
            )
                .into_response()
        }
    }
}

fn client_addr(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
