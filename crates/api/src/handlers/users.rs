//! Authenticated profile endpoints.
//!
//! Profile and balance reads go through the response cache (5 min TTL).
//! Any profile write invalidates every cached entry for that user via the
//! `user:{id}:*` pattern, so a stale profile can outlive a write only for
//! the duration of the delete itself.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use garde::Validate;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::{ProfileUpdate, UpdateUserPayload},
    state::AppState,
    stores::DEFAULT_TTL_SECS,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/balance", get(get_balance))
}

fn profile_key(id: Uuid) -> String {
    format!("user:{id}:profile")
}

fn balance_key(id: Uuid) -> String {
    format!("user:{id}:balance")
}

async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let key = profile_key(user.id);

    if let Some(cached) = state.stores.cache.get(&key).await {
        return Ok(Json(json!({ "user": cached })));
    }

    let found = state
        .repos
        .users
        .find_by_id(user.id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "User not found"))?;

    let value = serde_json::to_value(found.to_response())?;
    state.stores.cache.set(&key, &value, DEFAULT_TTL_SECS).await;

    Ok(Json(json!({ "user": value })))
}

async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if payload.is_empty() {
        return Err(AppError::Validation("No data provided for update".into()));
    }

    if let Some(email) = &payload.email {
        if let Some(existing) = state.repos.users.find_by_email(email).await? {
            if existing.id != user.id {
                return Err(AppError::External(
                    StatusCode::BAD_REQUEST,
                    "Email already in use",
                ));
            }
        }
    }

    let updated = state
        .repos
        .users
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
            },
        )
        .await?;

    state
        .stores
        .cache
        .invalidate(&format!("user:{}:*", user.id))
        .await;

    Ok(Json(json!({
        "message": "User updated successfully",
        "user": updated.to_response(),
    })))
}

async fn get_balance(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let key = balance_key(user.id);

    if let Some(cached) = state.stores.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let found = state
        .repos
        .users
        .find_by_id(user.id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "User not found"))?;

    // Balance is serialized as a string so clients never round it through
    // a float.
    let value = json!({
        "account_balance": found.account_balance.to_string(),
        "currency": "PLN",
    });
    state.stores.cache.set(&key, &value, DEFAULT_TTL_SECS).await;

    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::MockUserRepo;
    use crate::stores::MockResponseCache;
    use crate::test_utils::{TestStateBuilder, mock_user};
    use chrono::Utc;

    fn auth_for(id: Uuid) -> AuthUser {
        AuthUser {
            id,
            jti: "test-jti".into(),
            expires_at: Utc::now().timestamp() + 3600,
        }
    }

    #[tokio::test]
    async fn profile_cache_hit_skips_the_database() {
        let id = Uuid::new_v4();
        let cached = json!({ "email": "cached@example.com" });

        let mut cache = MockResponseCache::new();
        let key = profile_key(id);
        cache
            .expect_get()
            .withf(move |k| k == key)
            .returning(move |_| Some(cached.clone()));

        // No expectations on the repo: a database call would panic the mock.
        let state = TestStateBuilder::new()
            .with_user_repo(MockUserRepo::new())
            .with_cache(cache)
            .build();

        let result = get_me(auth_for(id), State(state)).await.unwrap();

        let response = result.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_cache_miss_reads_and_caches() {
        let user = mock_user("jan@example.com");
        let id = user.id;

        let mut cache = MockResponseCache::new();
        cache.expect_get().returning(|_| None);
        cache
            .expect_set()
            .withf(move |k, value, ttl| {
                k == profile_key(id)
                    && value["email"] == "jan@example.com"
                    && *ttl == DEFAULT_TTL_SECS
            })
            .times(1)
            .returning(|_, _, _| true);

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_cache(cache)
            .build();

        let result = get_me(auth_for(id), State(state)).await.unwrap();

        let response = result.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn update_invalidates_cached_entries() {
        let user = mock_user("jan@example.com");
        let id = user.id;
        let updated = user.clone();

        let mut users = MockUserRepo::new();
        users
            .expect_update_profile()
            .returning(move |_, _| Ok(updated.clone()));

        let mut cache = MockResponseCache::new();
        cache
            .expect_invalidate()
            .withf(move |pattern| pattern == format!("user:{id}:*"))
            .times(1)
            .returning(|_| 2);

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_cache(cache)
            .build();

        let payload = UpdateUserPayload {
            first_name: Some("Anna".into()),
            last_name: None,
            email: None,
        };
        let result = update_me(auth_for(id), State(state), Json(payload))
            .await
            .unwrap();

        let response = result.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn update_rejects_empty_payload() {
        let state = TestStateBuilder::new().build();

        let payload = UpdateUserPayload {
            first_name: None,
            last_name: None,
            email: None,
        };
        let result = update_me(auth_for(Uuid::new_v4()), State(state), Json(payload)).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_rejects_email_taken_by_another_user() {
        let other = mock_user("taken@example.com");

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(other.clone())));

        let state = TestStateBuilder::new().with_user_repo(users).build();

        let payload = UpdateUserPayload {
            first_name: None,
            last_name: None,
            email: Some("taken@example.com".into()),
        };
        let result = update_me(auth_for(Uuid::new_v4()), State(state), Json(payload)).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn balance_is_a_string_with_currency() {
        let user = mock_user("jan@example.com");
        let id = user.id;

        let mut cache = MockResponseCache::new();
        cache.expect_get().returning(|_| None);
        cache
            .expect_set()
            .withf(move |k, value, _ttl| {
                k == balance_key(id)
                    && value["account_balance"].is_string()
                    && value["currency"] == "PLN"
            })
            .times(1)
            .returning(|_, _, _| true);

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let state = TestStateBuilder::new()
            .with_user_repo(users)
            .with_cache(cache)
            .build();

        let result = get_balance(auth_for(id), State(state)).await.unwrap();

        let response = result.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
