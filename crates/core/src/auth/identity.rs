//! Identity types and the rules that bind a caller to a family.

use chrono::{DateTime, Utc};
use nestegg_shared::auth::{LoginRequest, RegisterRequest, UserInfoResponse};
use nestegg_shared::types::{FamilyId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::password::{PasswordError, verify_password};

/// Longest family name accepted.
pub const MAX_FAMILY_NAME_LEN: usize = 120;

/// Longest email accepted.
pub const MAX_EMAIL_LEN: usize = 255;

/// Longest external identity id accepted.
pub const MAX_EXTERNAL_ID_LEN: usize = 255;

/// Longest display name stored; longer provider names are clipped.
pub const MAX_DISPLAY_NAME_LEN: usize = 255;

/// A family: the tenant every user, category and transaction belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Family ID.
    pub id: FamilyId,
    /// Unique family name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Normalized email.
    pub email: String,
    /// Argon2id PHC hash; absent for accounts created through OAuth.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// External identity id once linked.
    pub external_id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
    /// Owning family. Never changes after creation.
    pub family_id: FamilyId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the account can log in with a password.
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Returns true if an external identity is attached.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.external_id.is_some()
    }

    /// Builds the user-info payload.
    #[must_use]
    pub fn to_info(&self) -> UserInfoResponse {
        UserInfoResponse {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
            external_id: self.external_id.clone(),
            family_id: self.family_id,
        }
    }
}

/// Input for creating a password user together with (or into) a family.
#[derive(Debug, Clone)]
pub struct NewPasswordUser {
    /// Normalized email.
    pub email: String,
    /// Argon2id PHC hash.
    pub password_hash: String,
    /// Trimmed family name to join or create.
    pub family_name: String,
}

/// A verified identity assertion from the external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Provider subject id.
    pub external_id: String,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
}

/// Errors raised by registration and password login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration is missing a required field.
    #[error("email, password, family_name are required")]
    MissingFields,

    /// Family name exceeds the column width.
    #[error("family_name must be at most {MAX_FAMILY_NAME_LEN} characters")]
    FamilyNameTooLong,

    /// Email exceeds the column width.
    #[error("email must be at most {MAX_EMAIL_LEN} characters")]
    EmailTooLong,

    /// Unknown user, OAuth-only account, or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Hashing failed.
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl AuthError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFields | Self::FamilyNameTooLong | Self::EmailTooLong => {
                "validation_error"
            }
            Self::InvalidCredentials => "invalid_credentials",
            Self::Password(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingFields | Self::FamilyNameTooLong | Self::EmailTooLong => 400,
            Self::InvalidCredentials => 401,
            Self::Password(_) => 500,
        }
    }
}

/// Trims and lower-cases an email address.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// A validated registration request, password still in clear.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Normalized email.
    pub email: String,
    /// Raw password.
    pub password: String,
    /// Trimmed family name.
    pub family_name: String,
}

impl Registration {
    /// Validates a registration payload.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if any field is absent or blank,
    /// and `AuthError::EmailTooLong` or `AuthError::FamilyNameTooLong` for
    /// oversized values.
    pub fn from_request(request: &RegisterRequest) -> Result<Self, AuthError> {
        let email = non_empty(request.email.as_deref()).map(normalize_email);
        let password = request.password.as_deref().filter(|p| !p.is_empty());
        let family_name = non_empty(request.family_name.as_deref());

        let (Some(email), Some(password), Some(family_name)) = (email, password, family_name)
        else {
            return Err(AuthError::MissingFields);
        };

        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(AuthError::EmailTooLong);
        }
        if family_name.chars().count() > MAX_FAMILY_NAME_LEN {
            return Err(AuthError::FamilyNameTooLong);
        }

        Ok(Self {
            email,
            password: password.to_string(),
            family_name: family_name.to_string(),
        })
    }
}

/// A validated login request.
#[derive(Debug, Clone)]
pub struct Login {
    /// Normalized email.
    pub email: String,
    /// Raw password.
    pub password: String,
}

impl Login {
    /// Reads a login payload.
    ///
    /// A blank or absent field can never match an account, so it fails the
    /// same way a wrong password does.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if email or password is absent.
    pub fn from_request(request: &LoginRequest) -> Result<Self, AuthError> {
        let email = non_empty(request.email.as_deref()).map(normalize_email);
        let password = request.password.as_deref().filter(|p| !p.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email,
                password: password.to_string(),
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Checks a password against the looked-up account.
///
/// Every failure mode (no such user, no password hash, malformed hash, wrong
/// password) collapses into `InvalidCredentials`.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` unless the password matches.
pub fn authenticate<'a>(user: Option<&'a User>, password: &str) -> Result<&'a User, AuthError> {
    let user = user.ok_or(AuthError::InvalidCredentials)?;
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;

    match verify_password(password, hash) {
        Ok(true) => Ok(user),
        Ok(false) | Err(PasswordError::InvalidHash) => Err(AuthError::InvalidCredentials),
        Err(e) => Err(AuthError::Password(e)),
    }
}

/// Derives the family name for a first-time external login.
///
/// Uses the display name when present, otherwise the email local part.
#[must_use]
pub fn family_name_for(profile: &ExternalProfile) -> String {
    let owner = profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| profile.email.split('@').next().unwrap_or(&profile.email));

    let name = format!("{owner}'s Family");
    if name.chars().count() > MAX_FAMILY_NAME_LEN {
        name.chars().take(MAX_FAMILY_NAME_LEN).collect()
    } else {
        name
    }
}

/// What to do with an external profile after looking up its email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Existing account without an external id: attach it.
    Link,
    /// Existing account already linked: nothing to write.
    AlreadyLinked,
    /// No account: create one in the named family.
    Create {
        /// Family to reuse by exact name or create.
        family_name: String,
    },
}

/// Plans identity resolution for an external login.
#[must_use]
pub fn plan_resolution(existing: Option<&User>, profile: &ExternalProfile) -> Resolution {
    match existing {
        Some(user) if user.is_linked() => Resolution::AlreadyLinked,
        Some(_) => Resolution::Link,
        None => Resolution::Create {
            family_name: family_name_for(profile),
        },
    }
}
