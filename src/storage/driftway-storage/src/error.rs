//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique field is already taken.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// Connection error.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Query error.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid input (bad URI, bad path, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
