//! Ledger error types for validation and lookup failures.

use thiserror::Error;

use super::category::MAX_CATEGORY_NAME_LEN;
use super::validation::{MAX_AMOUNT, MAX_NOTE_LEN};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Type, amount or category absent.
    #[error("Type, amount, and category are required")]
    MissingRequired,

    /// Transaction type is not income, expense or bill.
    #[error("Invalid transaction type: {0}. Use income, expense or bill")]
    InvalidType(String),

    /// Amount is not a number, or not positive after rounding.
    #[error("Amount must be a positive number")]
    InvalidAmount,

    /// Amount does not fit decimal(12,2).
    #[error("Amount must not exceed {MAX_AMOUNT}")]
    AmountTooLarge,

    /// Date is not `YYYY-MM-DD`.
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,

    /// Description exceeds the column width.
    #[error("Description must be at most {MAX_NOTE_LEN} characters")]
    NoteTooLong,

    /// Category name absent or blank.
    #[error("Category name is required")]
    CategoryNameRequired,

    /// Category name exceeds the column width.
    #[error("Category name must be at most {MAX_CATEGORY_NAME_LEN} characters")]
    CategoryNameTooLong,

    /// Monthly budget negative or not a number.
    #[error("Monthly budget must be a non-negative number")]
    InvalidBudget,

    // ========== Lookup Errors ==========
    /// Category absent or owned by another family.
    #[error("Category not found")]
    CategoryNotFound,

    /// Transaction absent or owned by another family.
    #[error("Transaction not found or access denied")]
    TransactionNotFound,

    /// Category with the same normalized name already exists.
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRequired
            | Self::InvalidType(_)
            | Self::InvalidAmount
            | Self::AmountTooLarge
            | Self::InvalidDate
            | Self::NoteTooLong
            | Self::CategoryNameRequired
            | Self::CategoryNameTooLong
            | Self::InvalidBudget => "validation_error",
            Self::CategoryNotFound | Self::TransactionNotFound => "not_found",
            Self::DuplicateCategory(_) => "conflict",
            Self::Database(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::MissingRequired
            | Self::InvalidType(_)
            | Self::InvalidAmount
            | Self::AmountTooLarge
            | Self::InvalidDate
            | Self::NoteTooLong
            | Self::CategoryNameRequired
            | Self::CategoryNameTooLong
            | Self::InvalidBudget => 400,

            // 404 Not Found - also covers other families' rows
            Self::CategoryNotFound | Self::TransactionNotFound => 404,

            // 409 Conflict
            Self::DuplicateCategory(_) => 409,

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::MissingRequired.http_status_code(), 400);
        assert_eq!(LedgerError::InvalidDate.http_status_code(), 400);
        assert_eq!(LedgerError::TransactionNotFound.http_status_code(), 404);
        assert_eq!(LedgerError::CategoryNotFound.http_status_code(), 404);
        assert_eq!(
            LedgerError::DuplicateCategory("Food".into()).http_status_code(),
            409
        );
        assert_eq!(LedgerError::Database("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LedgerError::MissingRequired.to_string(),
            "Type, amount, and category are required"
        );
        assert_eq!(
            LedgerError::InvalidDate.to_string(),
            "Invalid date format. Use YYYY-MM-DD"
        );
        assert_eq!(
            LedgerError::TransactionNotFound.to_string(),
            "Transaction not found or access denied"
        );
        assert_eq!(
            LedgerError::AmountTooLarge.to_string(),
            "Amount must not exceed 9999999999.99"
        );
    }
}
