//! # Driftway Token
//!
//! Stateless bearer tokens for the Driftway gateway.
//!
//! A token carries `{sub, iat, exp}` signed with HS256 under a process-wide
//! secret. Nothing is persisted: a token can be verified by anyone holding the
//! secret, and it cannot be revoked before it expires.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;

pub use codec::{unix_now, ClockFn, IssuedToken, TokenCodec, DEFAULT_TOKEN_TTL_SECS};
pub use error::TokenError;
