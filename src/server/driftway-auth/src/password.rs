//! Argon2id password hashing.

use std::sync::OnceLock;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

use crate::AuthError;

const DUMMY_PASSWORD: &str = "driftway-timing-equalizer";

/// Hashes and verifies passwords as Argon2id PHC strings.
///
/// Verification uses the parameters embedded in the stored hash, so
/// changing the cost does not invalidate existing accounts.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: OnceLock<String>,
}

impl PasswordHasher {
    /// Creates a hasher with explicit Argon2 cost parameters.
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: OnceLock::new(),
        }
    }

    /// Lowest cost Argon2 accepts. Only suitable for tests.
    pub fn minimal() -> Self {
        let params = Params::new(
            Params::MIN_M_COST,
            Params::MIN_T_COST,
            Params::MIN_P_COST,
            None,
        )
        .unwrap_or_default();
        Self::new(params)
    }

    /// Hashes `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// Checks `password` against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors only if the stored hash is unreadable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("invalid stored hash: {e}")))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Spends the same work as a real verification, for unknown identifiers.
    pub fn verify_dummy(&self, password: &str) {
        match self.dummy_hash() {
            Ok(hash) => {
                let _ = self.verify(password, hash);
            },
            Err(e) => warn!(error = %e, "dummy hash unavailable, login timing not equalized"),
        }
    }

    /// Lazily computed hash for `verify_dummy`. Failures are not cached.
    fn dummy_hash(&self) -> Result<&str, AuthError> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash);
        }
        let hash = self.hash(DUMMY_PASSWORD)?;
        Ok(self.dummy_hash.get_or_init(|| hash))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}
