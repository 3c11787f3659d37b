//! Token error types.

use thiserror::Error;

/// Errors that can occur while minting or verifying a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Signature or signing algorithm does not match.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry.
    #[error("token expired")]
    Expired,

    /// Token structure or claims are unusable.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Token could not be signed.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}
