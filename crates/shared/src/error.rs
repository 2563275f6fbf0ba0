//! Startup error types.
//!
//! Request-time failures are typed per domain (`AuthError`, `LedgerError`,
//! ...) and rendered by the API layer. `AppError` covers what can go wrong
//! before the server accepts its first request.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration sources could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration was read but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
