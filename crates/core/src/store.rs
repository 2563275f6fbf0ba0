//! Repository traits.
//!
//! Handlers only ever see these traits. Implementations live in the db
//! crate: one backed by PostgreSQL through SeaORM, one in memory. Every
//! method that writes is a single atomic unit.

use async_trait::async_trait;
use nestegg_shared::types::{FamilyId, TransactionId, UserId};
use thiserror::Error;

use crate::auth::{ExternalProfile, Family, NewPasswordUser, User};
use crate::ledger::{Category, CategoryRef, LedgerLine, NewCategory, NewTransaction, Transaction};

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Row absent, or outside the caller's family.
    #[error("{0}")]
    NotFound(String),

    /// The backend failed.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Backend(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::Backend(_) => 500,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Users and families.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user by id.
    async fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Gets or creates the family named `new.family_name` and creates the
    /// user in it.
    ///
    /// Fails with `Conflict` if the email is taken; nothing is written then.
    async fn register_password_user(&self, new: NewPasswordUser) -> StoreResult<(User, Family)>;

    /// Links, returns, or creates the user for an external profile,
    /// following [`crate::auth::plan_resolution`].
    async fn resolve_external_user(&self, profile: &ExternalProfile) -> StoreResult<User>;

    /// Lists all families, oldest first.
    async fn list_families(&self) -> StoreResult<Vec<Family>>;
}

/// Categories and transactions, always scoped to one family.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Lists the family's categories ordered by name.
    async fn list_categories(&self, family: FamilyId) -> StoreResult<Vec<Category>>;

    /// Creates a category. `Conflict` if the normalized name exists.
    async fn create_category(&self, family: FamilyId, new: NewCategory) -> StoreResult<Category>;

    /// Inserts `categories` only if the family has none yet. Returns how
    /// many were inserted.
    async fn seed_categories(
        &self,
        family: FamilyId,
        categories: Vec<NewCategory>,
    ) -> StoreResult<usize>;

    /// Resolves `category` (creating it when needed) and inserts the
    /// transaction, atomically and serialized per family.
    ///
    /// `NotFound` if an explicit category id is not in the family.
    async fn record_transaction(
        &self,
        family: FamilyId,
        category: &CategoryRef,
        new: NewTransaction,
    ) -> StoreResult<(Transaction, Category)>;

    /// Lists the family's transactions with category names, newest
    /// `occurred_at` first, then highest id.
    async fn list_ledger(&self, family: FamilyId) -> StoreResult<Vec<LedgerLine>>;

    /// Deletes a transaction of the family. Returns false if no such
    /// transaction exists in the family.
    async fn delete_transaction(&self, family: FamilyId, id: TransactionId) -> StoreResult<bool>;
}
