//! Credential store trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Session, StorageError, User};

/// Persistence contract for users and sessions.
///
/// Implementations own their own consistency. The only cross-call invariant
/// the gateway relies on is that [`insert_user`](Self::insert_user) is a
/// conditional insert.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a user whose username or email equals `identifier`.
    async fn find_user_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StorageError>;

    /// Finds a user by ID.
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError>;

    /// Inserts a new user.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if another user has the same
    /// username or email. The check and the insert are a single atomic step.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Appends a session record.
    async fn insert_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Returns the name of this store for logging.
    fn name(&self) -> &'static str;
}
