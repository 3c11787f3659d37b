//! Token minting and verification.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TokenError;

/// Token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Callback returning the current Unix time in seconds.
///
/// Lets tests pin the clock without touching the system time.
pub type ClockFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Returns the current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Claims carried by every gateway token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user ID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expiration (Unix timestamp).
    exp: i64,
}

/// A freshly minted token with the instants it was signed for.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded, signed token.
    pub token: String,
    /// Issued at (Unix timestamp).
    pub issued_at: i64,
    /// Expiration (Unix timestamp).
    pub expires_at: i64,
}

/// Creates and verifies HS256 tokens under a shared secret.
///
/// Expiry is checked here against the injected clock rather than by the JWT
/// library, with no leeway: a token is valid up to and including `exp`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
    clock: ClockFn,
}

impl TokenCodec {
    /// Creates a codec using the system clock.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_clock(secret, Arc::new(unix_now))
    }

    /// Creates a codec reading time from `clock`.
    pub fn with_clock(secret: &[u8], clock: ClockFn) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            clock,
        }
    }

    /// Current time according to this codec's clock.
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mints a token for `subject`, valid for the codec's lifetime from now.
    pub fn mint(&self, subject: Uuid) -> Result<IssuedToken, TokenError> {
        let issued_at = self.now();
        let expires_at = issued_at + self.ttl_secs;

        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: issued_at,
            exp: expires_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verifies `token` and returns its subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let claims = data.claims;

        if self.now() > claims.exp {
            return Err(TokenError::Expired);
        }

        let sub = claims
            .sub
            .ok_or_else(|| TokenError::Malformed("missing subject".into()))?;

        Uuid::parse_str(&sub).map_err(|_| TokenError::Malformed("invalid subject".into()))
    }
}
