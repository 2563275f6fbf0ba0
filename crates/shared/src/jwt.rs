//! JWT credential and OAuth state token handling.
//!
//! Both token kinds are HS256-signed with the same secret. State tokens carry
//! an `aud` claim and no identity claims, so each kind fails validation as the
//! other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, STATE_AUDIENCE, StateClaims};
use crate::config::{JwtSettings, MAX_TOKEN_EXPIRY_SECS};
use crate::types::{FamilyId, UserId};

/// JWT configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Session credential lifetime in seconds.
    pub access_token_expires_secs: i64,
    /// OAuth state token lifetime in seconds.
    pub state_token_expires_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_secs: 12 * 60 * 60,
            state_token_expires_secs: 10 * 60,
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[hidden]")
            .field("access_token_expires_secs", &self.access_token_expires_secs)
            .field("state_token_expires_secs", &self.state_token_expires_secs)
            .finish()
    }
}

fn expiry_secs(secs: u64) -> i64 {
    i64::try_from(secs.min(MAX_TOKEN_EXPIRY_SECS)).unwrap_or(i64::MAX)
}

impl From<&JwtSettings> for JwtConfig {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            access_token_expires_secs: expiry_secs(settings.access_token_expiry_secs),
            state_token_expires_secs: expiry_secs(settings.state_token_expiry_secs),
        }
    }
}

fn expires_after(now: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>, JwtError> {
    Duration::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| JwtError::EncodingError(format!("token lifetime out of range: {secs}s")))
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,
}

impl JwtError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EncodingError(_) => "internal_error",
            Self::DecodingError(_) => "invalid_token",
            Self::Expired => "token_expired",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::EncodingError(_) => 500,
            Self::DecodingError(_) | Self::Expired => 401,
        }
    }
}

/// JWT service for credential and state token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issues a session credential scoped to the user's family.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn issue_credential(
        &self,
        user_id: UserId,
        family_id: FamilyId,
        email: &str,
    ) -> Result<String, JwtError> {
        let expires_at = expires_after(Utc::now(), self.config.access_token_expires_secs)?;
        let claims = Claims::new(user_id, family_id, email, expires_at);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates and decodes a session credential.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` if the token is malformed, badly
    /// signed, or not a session credential.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Issues a signed, self-contained OAuth state token around a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn issue_state_token(&self) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = StateClaims {
            nonce: Uuid::new_v4().simple().to_string(),
            aud: STATE_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: expires_after(now, self.config.state_token_expires_secs)?.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates an OAuth state token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` once the state TTL has passed, and
    /// `JwtError::DecodingError` for anything that is not a state token
    /// signed by this service.
    pub fn validate_state_token(&self, token: &str) -> Result<StateClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[STATE_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        decode::<StateClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Returns the credential lifetime in seconds.
    #[must_use]
    pub const fn access_token_expires_in(&self) -> i64 {
        self.config.access_token_expires_secs
    }

    /// Returns the state token lifetime in seconds.
    #[must_use]
    pub const fn state_token_expires_in(&self) -> i64 {
        self.config.state_token_expires_secs
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> JwtError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::DecodingError(err.to_string()),
    }
}
