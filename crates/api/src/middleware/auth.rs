//! Authentication middleware.
//!
//! Usage: Add `AuthUser` as an extractor parameter to require authentication.
//! A request is authenticated only if the bearer token is structurally valid,
//! unexpired, not revoked, and names an existing user.
//!
//! ```ignore
//! async fn my_handler(user: AuthUser, ...) -> ... {
//!     // user.id is available here
//! }
//! ```
//!
//! The revocation check fails open: if the store is down, a revoked token is
//! occasionally let through rather than locking out every valid session.

use axum::{
    Json, RequestPartsExt,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::state::AppState;

/// Authenticated user extracted from a valid access token.
///
/// Carries the token's jti and expiry so logout can revoke the exact token
/// it was called with.
pub struct AuthUser {
    pub id: Uuid,
    pub jti: String,
    pub expires_at: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        let claims = state.tokens.decode(bearer.token()).map_err(|e| {
            tracing::debug!("token validation failed: {:?}", e);
            AuthError::InvalidToken
        })?;

        if state.stores.revocation.is_revoked(&claims.jti).await {
            return Err(AuthError::TokenRevoked);
        }

        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = state.repos.users.find_by_id(id).await.map_err(|e| {
            tracing::error!("user lookup failed during auth: {:?}", e);
            AuthError::InvalidToken
        })?;

        if user.is_none() {
            return Err(AuthError::UserNotFound);
        }

        Ok(AuthUser {
            id,
            jti: claims.jti,
            expires_at: claims.exp,
        })
    }
}

pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenRevoked,
    UserNotFound,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidToken => "Invalid or expired token",
            AuthError::TokenRevoked => "Invalid or expired token",
            AuthError::UserNotFound => "User not found",
        };

        let body = serde_json::json!({ "error": message });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::MockUserRepo;
    use crate::stores::MockRevocationStore;
    use crate::test_utils::{TestStateBuilder, mock_user};
    use axum::http::Request;

    fn parts_with_token(token: &str) -> Parts {
        let request = Request::builder()
            .uri("/")
            .header("authorization", format!("Bearer {token}"))
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = TestStateBuilder::new().build();
        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;

        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = TestStateBuilder::new().build();
        let mut parts = parts_with_token("not-a-jwt");

        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let mut revocation = MockRevocationStore::new();
        revocation.expect_is_revoked().returning(|_| true);

        let state = TestStateBuilder::new().with_revocation(revocation).build();
        let token = state.tokens.issue(Uuid::new_v4()).unwrap();
        let mut parts = parts_with_token(&token);

        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn valid_token_for_existing_user_is_accepted() {
        let user = mock_user("jan@example.com");
        let user_id = user.id;

        let mut revocation = MockRevocationStore::new();
        revocation.expect_is_revoked().returning(|_| false);

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_id()
            .with(mockall::predicate::eq(user_id))
            .returning(move |_| Ok(Some(user.clone())));

        let state = TestStateBuilder::new()
            .with_revocation(revocation)
            .with_user_repo(users)
            .build();
        let token = state.tokens.issue(user_id).unwrap();
        let mut parts = parts_with_token(&token);

        let auth = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .ok()
            .unwrap();
        assert_eq!(auth.id, user_id);
        assert!(!auth.jti.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let mut revocation = MockRevocationStore::new();
        revocation.expect_is_revoked().returning(|_| false);

        let mut users = MockUserRepo::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let state = TestStateBuilder::new()
            .with_revocation(revocation)
            .with_user_repo(users)
            .build();
        let token = state.tokens.issue(Uuid::new_v4()).unwrap();
        let mut parts = parts_with_token(&token);

        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }
}
