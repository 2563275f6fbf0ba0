//! Family-scoped budget ledger.
//!
//! This module implements:
//! - Ledger domain types (categories, transactions)
//! - Input validation for transactions and categories
//! - Category resolution for free-text, id and name references
//! - The aggregation engine behind the budget summary
//! - Error types for ledger operations

pub mod category;
pub mod error;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(test)]
mod summary_props;

pub use category::{
    CategoryRef, DEFAULT_CATEGORIES, Selection, default_categories, name_key,
    validate_new_category,
};
pub use error::LedgerError;
pub use summary::{CategoryTotal, Summary, month_start, summarize};
pub use types::{Category, LedgerLine, NewCategory, NewTransaction, Transaction, TransactionType};
pub use validation::{TransactionDraft, ValidTransaction};
