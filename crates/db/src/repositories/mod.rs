//! Repository implementations for database access.
//!
//! Each repository implements one of the store traits from `nestegg_core`
//! on top of a `SeaORM` connection.

pub mod identity;
pub mod ledger;

pub use identity::IdentityRepository;
pub use ledger::LedgerRepository;

use chrono::Utc;
use nestegg_core::StoreError;
use nestegg_core::auth::{Family, User};
use nestegg_core::ledger::{Category, Transaction};
use nestegg_shared::types::{CategoryId, FamilyId, TransactionId, UserId};
use sea_orm::{DbErr, SqlErr};

use crate::entities::{categories, families, transactions, users};

/// Returns true if the statement failed on a unique index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps a `SeaORM` error, reporting unique violations as `Conflict` with
/// the given message.
pub(crate) fn store_err_with(err: DbErr, conflict: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(conflict.to_string())
    } else {
        store_err(err)
    }
}

/// Maps a `SeaORM` error to a backend failure.
pub(crate) fn store_err(err: DbErr) -> StoreError {
    tracing::error!(error = %err, "database operation failed");
    StoreError::Backend(err.to_string())
}

pub(crate) fn to_family(model: families::Model) -> Family {
    Family {
        id: FamilyId(model.id),
        name: model.name,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_user(model: users::Model) -> User {
    User {
        id: UserId(model.id),
        email: model.email,
        password_hash: model.password_hash,
        external_id: model.external_id,
        name: model.name,
        picture: model.picture,
        family_id: FamilyId(model.family_id),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_category(model: categories::Model) -> Category {
    Category {
        id: CategoryId(model.id),
        family_id: FamilyId(model.family_id),
        name: model.name,
        monthly_budget: model.monthly_budget,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_transaction(model: transactions::Model) -> Transaction {
    Transaction {
        id: TransactionId(model.id),
        family_id: FamilyId(model.family_id),
        category_id: CategoryId(model.category_id),
        amount: model.amount,
        transaction_type: model.transaction_type.into(),
        note: model.note,
        occurred_at: model.occurred_at.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
