//! Access token issuance and validation.
//!
//! HS256 JWTs with a unique jti per token; the jti is what the revocation
//! store keys on, and `sub` carries the user id. Signature and expiry are
//! validated here, the revocation check happens in the auth middleware.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Unique token identifier, used as the revocation key.
    pub jti: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_hours: u64,
}

impl TokenService {
    pub fn new(secret: &str, expires_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_hours,
        }
    }

    /// Issue a token for a user. Each call mints a fresh jti.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expires_hours as i64)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).context("failed to sign token")
    }

    /// Validate signature and expiry, returning the claims.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        // No expiry leeway: a revocation marker lives exactly until `exp`,
        // so a token accepted past `exp` would outlive its own revocation.
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .context("invalid or expired token")
    }
}
