//! Password hashing with Argon2id.

use anyhow::{Result, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hashes and verifies passwords. Work happens on the blocking pool since
/// Argon2 is deliberately expensive.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// OWASP-recommended parameters: 19 MiB memory, 2 iterations.
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;

    pub fn new() -> Self {
        let params = Params::new(Self::MEMORY_COST, Self::TIME_COST, Self::PARALLELISM, None)
            .expect("Invalid Argon2 parameters");
        Self { params }
    }

    /// Reduced parameters for tests.
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .expect("Invalid Argon2 parameters");
        Self { params }
    }

    /// Hash a password into a PHC-format string.
    pub async fn hash(&self, password: String) -> Result<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| anyhow!("failed to hash password: {}", e))
        })
        .await?
    }

    /// Verify a password against a stored PHC-format hash.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&hash).map_err(|e| anyhow!("malformed password hash: {}", e))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::with_params(4096, 1, 1)
    }

    #[tokio::test]
    async fn hash_and_verify_round_trip() {
        let hasher = fast_hasher();
        let hash = hasher.hash("securepass123".into()).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("securepass123".into(), hash.clone()).await.unwrap());
        assert!(!hasher.verify("wrongpass".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let hasher = fast_hasher();
        let a = hasher.hash("same_password".into()).await.unwrap();
        let b = hasher.hash("same_password".into()).await.unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let hasher = fast_hasher();
        assert!(hasher.verify("pw".into(), "not-a-phc-hash".into()).await.is_err());
    }
}
