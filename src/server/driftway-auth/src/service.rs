//! Registration, login and token resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use driftway_storage::{CredentialStore, Session, User};
use driftway_token::TokenCodec;
use tracing::{debug, info};

use crate::{AuthError, AuthResponse, ClientInfo, PasswordHasher};

/// Issues and validates user credentials.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    hasher: Arc<PasswordHasher>,
}

impl AuthService {
    /// Creates a service with default Argon2 cost.
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec,
            hasher: Arc::new(PasswordHasher::default()),
        }
    }

    /// Replaces the password hasher.
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Registers a new account and signs it in.
    ///
    /// Uniqueness of username and email is enforced by the store at insert
    /// time, so concurrent registrations for the same name admit exactly one.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        let password_hash = self.hash_password(password).await?;
        let user = User::new(username, email, password_hash, Utc::now());

        self.store.insert_user(&user).await.inspect_err(|e| {
            debug!(username, error = %e, "registration rejected");
        })?;

        info!(user_id = %user.id, username = %user.username, "user registered");

        self.issue(user, client).await
    }

    /// Signs in by username or email.
    ///
    /// Unknown identifiers and wrong passwords fail identically.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.store.find_user_by_username_or_email(identifier).await? else {
            let hasher = self.hasher.clone();
            let password = password.to_owned();
            let _ = tokio::task::spawn_blocking(move || hasher.verify_dummy(&password)).await;
            debug!("login failed: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");

        self.issue(user, client).await
    }

    /// Resolves a token to its user.
    ///
    /// Checks signature and expiry only; sessions are not consulted.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.codec.verify(token)?;

        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn issue(&self, user: User, client: &ClientInfo) -> Result<AuthResponse, AuthError> {
        let issued = self
            .codec
            .mint(user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let session = Session::new(
            user.id,
            issued.token.as_str(),
            client.ip_address.as_str(),
            client.user_agent.as_str(),
            timestamp(issued.issued_at),
        );
        self.store.insert_session(&session).await?;

        Ok(AuthResponse {
            user,
            token: issued.token,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}
