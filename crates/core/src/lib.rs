//! Core business logic for Nestegg.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `auth` - Password login, identity resolution and the OAuth flow checks
//! - `ledger` - Transactions, category resolution and the budget summary
//! - `store` - Repository traits implemented by the db crate

pub mod auth;
pub mod ledger;
pub mod store;

pub use store::{IdentityStore, LedgerStore, StoreError, StoreResult};
