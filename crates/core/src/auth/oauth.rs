//! OAuth2 authorization-code flow: provider seam, state checks, profile rules.
//!
//! The flow runs `START -> CALLBACK -> EXCHANGE -> FETCH_PROFILE -> RESOLVE ->
//! ISSUE`. Every step before `RESOLVE` is read-only, so any failure here
//! leaves no trace and the caller restarts at `START`.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use nestegg_shared::jwt::JwtService;
use serde::Deserialize;
use thiserror::Error;

use super::identity::{
    ExternalProfile, MAX_DISPLAY_NAME_LEN, MAX_EMAIL_LEN, MAX_EXTERNAL_ID_LEN, normalize_email,
};

/// Errors raised by the external login flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Client id or secret is not configured.
    #[error("external login is not configured")]
    NotConfigured,

    /// Callback arrived without a `state` parameter.
    #[error("missing state parameter")]
    MissingState,

    /// State is forged, expired, replayed, or does not match the cookie.
    #[error("invalid state parameter")]
    InvalidState,

    /// Callback arrived without a `code` parameter.
    #[error("missing authorization code")]
    MissingCode,

    /// Token endpoint unreachable, non-2xx, or no access token returned.
    #[error("failed to exchange authorization code: {0}")]
    ExchangeFailed(String),

    /// Userinfo endpoint unreachable or non-2xx.
    #[error("failed to fetch user profile: {0}")]
    ProfileFetchFailed(String),

    /// Profile lacks an email or a subject id.
    #[error("identity provider returned an incomplete profile")]
    IncompleteProfile,

    /// Provider says the email is not verified.
    #[error("email address is not verified")]
    EmailUnverified,
}

impl OAuthError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::MissingState => "missing_state",
            Self::InvalidState => "invalid_state",
            Self::MissingCode => "missing_code",
            Self::ExchangeFailed(_) => "exchange_failed",
            Self::ProfileFetchFailed(_) => "profile_fetch_failed",
            Self::IncompleteProfile => "incomplete_profile",
            Self::EmailUnverified => "email_unverified",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NotConfigured => 500,
            _ => 400,
        }
    }
}

/// Raw userinfo payload.
///
/// Providers disagree on field names: OpenID Connect uses `sub` and
/// `email_verified`, Google's v2 endpoint uses `id` and `verified_email`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderProfile {
    /// OpenID subject.
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    /// Legacy id field, used when `sub` is absent.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Verification flag. Absent means verified.
    #[serde(default, alias = "verified_email")]
    pub email_verified: Option<bool>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
}

fn id_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ProviderProfile {
    /// Applies the profile acceptance rules.
    ///
    /// # Errors
    ///
    /// Returns `EmailUnverified` when the provider explicitly flags the email
    /// as unverified, and `IncompleteProfile` when email or subject is absent
    /// or longer than an account can hold. Overlong display names are clipped.
    pub fn into_external(self) -> Result<ExternalProfile, OAuthError> {
        if self.email_verified == Some(false) {
            return Err(OAuthError::EmailUnverified);
        }

        let external_id = id_text(self.sub.as_ref())
            .or_else(|| id_text(self.id.as_ref()))
            .filter(|id| id.chars().count() <= MAX_EXTERNAL_ID_LEN)
            .ok_or(OAuthError::IncompleteProfile)?;

        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty() && e.chars().count() <= MAX_EMAIL_LEN)
            .ok_or(OAuthError::IncompleteProfile)?;

        Ok(ExternalProfile {
            external_id,
            email,
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .map(|n| n.chars().take(MAX_DISPLAY_NAME_LEN).collect()),
            picture: self.picture.filter(|p| !p.trim().is_empty()),
        })
    }
}

/// External identity provider speaking the authorization-code grant.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the URL the browser is redirected to at `START`.
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Exchanges an authorization code for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError>;

    /// Fetches the userinfo document with a provider access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError>;
}

/// Most consumed nonces remembered at once.
pub const MAX_CONSUMED_NONCES: u64 = 1_000_000;

/// Remembers consumed state nonces so each state token works once.
///
/// Entries leave only through the state token TTL; after that the token
/// itself fails validation, so nothing older needs to be kept. Nothing is
/// ever evicted early: once `capacity` unexpired nonces are held, further
/// states are refused until some expire.
#[derive(Clone)]
pub struct StateReplayGuard {
    consumed: Cache<String, ()>,
    capacity: u64,
}

impl StateReplayGuard {
    /// Creates a guard remembering nonces for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_CONSUMED_NONCES)
    }

    /// Creates a guard holding at most `capacity` unexpired nonces.
    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: u64) -> Self {
        Self {
            consumed: Cache::builder().time_to_live(ttl).build(),
            capacity,
        }
    }

    /// Marks the nonce as used. Returns false if it was already used or the
    /// guard is full.
    pub fn consume(&self, nonce: &str) -> bool {
        if self.consumed.contains_key(nonce) {
            return false;
        }

        self.consumed.run_pending_tasks();
        if self.consumed.entry_count() >= self.capacity {
            return false;
        }

        self.consumed
            .entry(nonce.to_string())
            .or_insert(())
            .is_fresh()
    }
}

impl std::fmt::Debug for StateReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReplayGuard")
            .field("entries", &self.consumed.entry_count())
            .finish()
    }
}

/// Runs the `CALLBACK` state checks.
///
/// The query state must be present, must equal the state cookie when the
/// browser sent one, must verify as a state token, and its nonce must not
/// have been used before.
///
/// # Errors
///
/// Returns `MissingState` for an absent or blank state and `InvalidState`
/// for every other failure.
pub fn verify_callback_state(
    jwt: &JwtService,
    guard: &StateReplayGuard,
    query_state: Option<&str>,
    cookie_state: Option<&str>,
) -> Result<(), OAuthError> {
    let state = query_state
        .filter(|s| !s.is_empty())
        .ok_or(OAuthError::MissingState)?;

    if cookie_state.is_some_and(|cookie| cookie != state) {
        return Err(OAuthError::InvalidState);
    }

    let claims = jwt
        .validate_state_token(state)
        .map_err(|_| OAuthError::InvalidState)?;

    if guard.consume(&claims.nonce) {
        Ok(())
    } else {
        Err(OAuthError::InvalidState)
    }
}
