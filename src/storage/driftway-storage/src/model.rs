//! User and session records.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifetime of a session record, matching the token lifetime.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Presence status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Connected and active.
    Online,
    /// Connected but idle.
    Away,
    /// Do not disturb.
    Busy,
    /// Not connected.
    Offline,
}

impl UserStatus {
    /// Stable string form, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }

    /// Parses the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(Self::Online),
            "away" => Some(Self::Away),
            "busy" => Some(Self::Busy),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

/// Identity record.
///
/// The password hash is never serialized outward.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique identifier.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 PHC hash of the password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Presence status.
    pub status: UserStatus,
    /// Free-form profile text.
    pub bio: String,
    /// Avatar URL.
    pub avatar: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a freshly registered user, online with an empty profile.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            status: UserStatus::Online,
            bio: String::new(),
            avatar: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An issued-token record. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// The issued token.
    pub token: String,
    /// Client IP at issuance.
    pub ip_address: String,
    /// Client user agent at issuance.
    pub user_agent: String,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Always `created_at + 24h`.
    pub expires_at: DateTime<Utc>,
    /// Whether the session is active.
    pub active: bool,
}

impl Session {
    /// Builds an active session starting at `created_at`.
    pub fn new(
        user_id: Uuid,
        token: impl Into<String>,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            token: token.into(),
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
            created_at,
            expires_at: created_at + Duration::hours(SESSION_TTL_HOURS),
            active: true,
        }
    }
}
