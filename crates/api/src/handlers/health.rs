//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK while the database is reachable, 503 otherwise. Redis is
//! reported but does not gate the status: every Redis-backed store fails
//! open, so the service keeps serving traffic through a Redis outage.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
    redis: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.database)
        .await
        .is_ok();

    let redis_ok = state.kv.ping().await;

    let response = HealthResponse {
        status: if db_ok { "ok" } else { "unhealthy" },
        database: db_ok,
        redis: redis_ok,
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
