//! Registration, login, and logout.
//!
//! Registration and login are throttled per client IP (3/min and 5/min).
//! Registration publishes a `user_registered` notification after the insert
//! commits; the publish is fire-and-forget, so a down broker costs an email,
//! never a registration. Logout revokes the token's jti for exactly the
//! token's remaining lifetime - after that the entry expires store-side,
//! which is fine because the token itself has expired too.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use garde::Validate;
use rust_decimal::Decimal;
use serde_json::json;

use shared::queue::{EMAIL_QUEUE, NotificationMessage};

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    middleware::rate_limit,
    models::{LoginPayload, NewUser, RegisterPayload},
    state::AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(register).layer(from_fn_with_state(state.clone(), rate_limit::register_limit)),
        )
        .route(
            "/login",
            post(login).layer(from_fn_with_state(state, rate_limit::login_limit)),
        )
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let balance = payload.account_balance.unwrap_or(Decimal::ZERO);
    if balance.is_sign_negative() {
        return Err(AppError::Validation(
            "account_balance: must not be negative".into(),
        ));
    }

    if state
        .repos
        .users
        .find_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::External(
            StatusCode::BAD_REQUEST,
            "Email already registered",
        ));
    }

    let password_hash = state.passwords.hash(payload.password).await?;

    let user = state
        .repos
        .users
        .create(NewUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password_hash,
            account_balance: balance,
        })
        .await?;

    // The user row is committed; a publish failure costs a welcome email,
    // not the registration.
    let message =
        NotificationMessage::user_registered(&user.email, &user.first_name, &user.last_name);
    if !state.publisher.publish(EMAIL_QUEUE, &message).await {
        tracing::error!(email = %user.email, "failed to publish registration notification");
    }

    let access_token = state.tokens.issue(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user.to_response(),
            "access_token": access_token,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(user) = state.repos.users.find_by_email(&payload.email).await? else {
        return Err(AppError::External(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    let valid = state
        .passwords
        .verify(payload.password, user.password_hash.clone())
        .await?;

    if !valid {
        return Err(AppError::External(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    let access_token = state.tokens.issue(user.id)?;

    Ok(Json(json!({
        "message": "Login successful",
        "user": user.to_response(),
        "access_token": access_token,
    })))
}

async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    // Remaining natural lifetime of the token; zero is fine, the token is
    // about to be unusable anyway.
    let remaining = (user.expires_at - Utc::now().timestamp()).max(0) as u64;

    if state.stores.revocation.revoke(&user.jti, remaining).await {
        tracing::info!(jti = %user.jti, remaining_secs = remaining, "token revoked");
    } else {
        tracing::warn!(jti = %user.jti, "token could not be revoked (store unavailable)");
    }

    Ok(Json(json!({ "message": "Logged out successfully" })))
}
