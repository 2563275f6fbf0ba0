//! Authentication types for credentials and auth payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FamilyId, UserId};

/// Audience stamped on OAuth state tokens so they never pass as credentials.
pub const STATE_AUDIENCE: &str = "oauth-state";

/// Claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (normalized email).
    pub sub: String,
    /// User ID.
    pub uid: UserId,
    /// Family the caller is scoped to.
    pub family_id: FamilyId,
    /// Normalized email.
    pub email: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: UserId,
        family_id: FamilyId,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: email.to_string(),
            uid: user_id,
            family_id,
            email: email.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.uid
    }

    /// Returns the family ID from claims.
    #[must_use]
    pub const fn family_id(&self) -> FamilyId {
        self.family_id
    }
}

/// Claims carried by an OAuth anti-forgery state token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateClaims {
    /// Random single-use nonce.
    pub nonce: String,
    /// Always [`STATE_AUDIENCE`].
    pub aud: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Registration request payload.
///
/// Fields are optional so that absence surfaces as a validation error
/// rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// User email.
    #[serde(default)]
    pub email: Option<String>,
    /// User password.
    #[serde(default)]
    pub password: Option<String>,
    /// Family to join or create.
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Login request payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    /// User email.
    #[serde(default)]
    pub email: Option<String>,
    /// User password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Response returned after registration or password login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed session credential.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Credential lifetime in seconds.
    pub expires_in: i64,
    /// Authenticated user.
    pub user_id: UserId,
    /// Family the credential is scoped to.
    pub family_id: FamilyId,
}

impl AuthResponse {
    /// Creates a bearer auth response.
    #[must_use]
    pub fn bearer(
        access_token: String,
        expires_in: i64,
        user_id: UserId,
        family_id: FamilyId,
    ) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user_id,
            family_id,
        }
    }
}

/// Current identity as returned by the user-info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// User ID.
    pub id: UserId,
    /// Normalized email.
    pub email: String,
    /// Display name, when known.
    pub name: Option<String>,
    /// Avatar URL, when known.
    pub picture: Option<String>,
    /// External identity id, when linked.
    pub external_id: Option<String>,
    /// Family the user belongs to.
    pub family_id: FamilyId,
}
