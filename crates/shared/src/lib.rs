//! Shared types, errors, and configuration for Nestegg.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Session credential and OAuth state token signing
//! - Startup error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::{Claims, StateClaims};
pub use config::{AppConfig, JwtSettings, OAuthConfig};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
