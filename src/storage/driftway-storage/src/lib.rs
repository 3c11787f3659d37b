//! # Driftway Storage
//!
//! Credential store abstraction for the Driftway gateway.
//!
//! Defines the user and session records, the [`CredentialStore`] contract the
//! auth service consumes, and an in-memory implementation used by dev mode
//! and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod model;
pub mod store;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use model::{Session, User, UserStatus};
pub use store::CredentialStore;
