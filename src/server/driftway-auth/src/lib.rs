//! # Driftway Auth
//!
//! Credential issuance and validation for the Driftway gateway.
//!
//! ## Operations
//!
//! - Registration: hash the password, insert the user, mint a token, record a session
//! - Login: look up by username or email, verify the password, mint a token, record a session
//! - Token resolution: verify the token signature and expiry, then load the user
//!
//! Token validation is purely cryptographic. Session rows are written for
//! audit and are never read back to make an authentication decision.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod password;
pub mod service;

pub use context::{AuthResponse, ClientInfo};
pub use error::AuthError;
pub use password::PasswordHasher;
pub use service::AuthService;
