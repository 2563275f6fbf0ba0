//! Authentication logic.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Registration validation and password login checks
//! - Identity resolution for external (OAuth) logins
//! - The OAuth authorization-code flow checks and the provider seam

pub mod identity;
pub mod oauth;
mod password;

pub use identity::{
    AuthError, ExternalProfile, Family, Login, NewPasswordUser, Registration, Resolution, User,
    authenticate, family_name_for, normalize_email, plan_resolution,
};
pub use oauth::{
    IdentityProvider, OAuthError, ProviderProfile, StateReplayGuard, verify_callback_state,
};
pub use password::{PasswordError, hash_password, verify_password};
