//! Authentication error types.

use driftway_token::TokenError;
use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or email already registered.
    #[error("user already exists")]
    AlreadyExists,

    /// Unknown identifier or wrong password. Deliberately undifferentiated.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Token subject no longer resolves to a stored user.
    #[error("user not found")]
    UserNotFound,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Hashing, minting or task failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<driftway_storage::StorageError> for AuthError {
    fn from(e: driftway_storage::StorageError) -> Self {
        match e {
            driftway_storage::StorageError::AlreadyExists(_) => AuthError::AlreadyExists,
            other => AuthError::Storage(other.to_string()),
        }
    }
}
