//! # Driftway Storage - SQLite Backend
//!
//! SQLite implementation of the credential store.
//!
//! Username and email uniqueness is enforced by `UNIQUE` columns, so a
//! registration race resolves inside the database: the losing insert fails
//! with [`StorageError::AlreadyExists`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use driftway_storage::{CredentialStore, Session, StorageError, User, UserStatus};

/// SQL schema for the credential tables.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    status        TEXT NOT NULL,
    bio           TEXT NOT NULL DEFAULT '',
    avatar        TEXT NOT NULL DEFAULT '',
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users (id),
    token       TEXT NOT NULL,
    ip_address  TEXT NOT NULL,
    user_agent  TEXT NOT NULL,
    created_at  INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL,
    active      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions (user_id);
"#;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, status, bio, avatar, created_at, updated_at";

/// SQLite-backed credential store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens or creates the database at `url` (e.g. `sqlite:data/driftway.db`).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL cannot be parsed
    /// - The parent directory cannot be created
    /// - The connection or schema creation fails
    pub async fn open(url: &str) -> Result<Self, StorageError> {
        if !url.starts_with("sqlite:") {
            return Err(StorageError::InvalidInput(format!("not a sqlite url: {url}")));
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::InvalidInput(format!("invalid sqlite url: {e}")))?
            .create_if_missing(true);

        let filename = options.get_filename().to_path_buf();
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        if !in_memory {
            if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::ConnectionFailed(format!("failed to create directory: {e}"))
                })?;
            }
        }

        debug!(path = %filename.display(), "Opening SQLite database");

        // An in-memory database lives and dies with its connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;

        info!(path = %filename.display(), "SQLite credential store ready");

        Ok(store)
    }

    /// Creates the tables if they do not exist.
    async fn migrate(&self) -> Result<(), StorageError> {
        debug!("Running database migrations");

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement.trim())
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::ConnectionFailed(format!("migration failed: {e}")))?;
        }

        debug!("Migrations complete");

        Ok(())
    }
}

/// Maps an insert failure, turning unique-constraint violations into conflicts.
fn insert_error(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            let field = if db.message().contains("users.email") {
                "email"
            } else if db.message().contains("users.username") {
                "username"
            } else {
                "id"
            };
            return StorageError::AlreadyExists(field.into());
        }
    }
    StorageError::QueryFailed(e.to_string())
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::Serialization(format!("invalid timestamp: {millis}")))
}

fn user_from_row(row: &SqliteRow) -> Result<User, StorageError> {
    let get = |column: &str| -> Result<String, StorageError> {
        row.try_get::<String, _>(column)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    };
    let get_i64 = |column: &str| -> Result<i64, StorageError> {
        row.try_get::<i64, _>(column)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    };

    let id = get("id")?;
    let status = get("status")?;

    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|e| StorageError::Serialization(format!("invalid user id {id}: {e}")))?,
        username: get("username")?,
        email: get("email")?,
        password_hash: get("password_hash")?,
        status: UserStatus::parse(&status)
            .ok_or_else(|| StorageError::Serialization(format!("invalid status: {status}")))?,
        bio: get("bio")?,
        avatar: get("avatar")?,
        created_at: timestamp(get_i64("created_at")?)?,
        updated_at: timestamp(get_i64("updated_at")?)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_user_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StorageError> {
        // Username matches win over email matches.
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = ?1 \
             ORDER BY CASE WHEN username = ?1 THEN 0 ELSE 1 END LIMIT 1"
        );

        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, status, bio, avatar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(user.created_at.timestamp_millis())
        .bind(user.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token, ip_address, user_agent, created_at, expires_at, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.token)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at.timestamp_millis())
        .bind(session.expires_at.timestamp_millis())
        .bind(session.active)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
