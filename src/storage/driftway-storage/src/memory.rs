//! In-memory credential store.
//!
//! Used by dev mode and tests. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{CredentialStore, Session, StorageError, User};

/// Credential store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<Vec<Session>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all sessions recorded for `user_id`, oldest first.
    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StorageError> {
        let users = self.users.read().await;

        let found = users
            .values()
            .find(|u| u.username == identifier)
            .or_else(|| users.values().find(|u| u.email == identifier));

        Ok(found.cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        // Check and insert under the same write lock.
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(StorageError::AlreadyExists(format!("id {}", user.id)));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::AlreadyExists("username".into()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::AlreadyExists("email".into()));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StorageError> {
        self.sessions.write().await.push(session.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
