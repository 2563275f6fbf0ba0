//! Business rule validation for ledger input.

use chrono::{DateTime, NaiveDate, Utc};
use nestegg_shared::types::CategoryId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::str::FromStr;

use super::category::CategoryRef;
use super::error::LedgerError;
use super::types::{NewTransaction, TransactionType};

/// Largest amount that fits `decimal(12,2)`: 9999999999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Longest transaction description accepted.
pub const MAX_NOTE_LEN: usize = 255;

/// Raw "add transaction" payload as sent by clients.
///
/// Every field is optional here so that absence is reported as a
/// validation error with a readable message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDraft {
    /// `income`, `expense` or `bill`.
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,
    /// JSON number or numeric string.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Free-text note.
    #[serde(default)]
    pub description: Option<String>,
    /// `YYYY-MM-DD`; defaults to now.
    #[serde(default)]
    pub date: Option<String>,
    /// JSON number (explicit id) or string token.
    #[serde(default, rename = "categoryId")]
    pub category_id: Option<serde_json::Value>,
    /// Explicit category name, takes precedence over `categoryId`.
    #[serde(default, rename = "categoryName")]
    pub category_name: Option<String>,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransaction {
    /// Row to insert.
    pub new: NewTransaction,
    /// Category to resolve.
    pub category: CategoryRef,
}

impl TransactionDraft {
    /// Validates the draft, stamping `now` when no date is given.
    ///
    /// # Errors
    ///
    /// `MissingRequired` if type, amount or category is absent, otherwise the
    /// first field-specific validation error.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidTransaction, LedgerError> {
        let raw_type = self
            .transaction_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let raw_amount = self.amount.as_ref().filter(|a| !is_blank(a));
        let category = self.category_ref()?;

        let (Some(raw_type), Some(raw_amount), Some(category)) = (raw_type, raw_amount, category)
        else {
            return Err(LedgerError::MissingRequired);
        };

        let transaction_type = TransactionType::from_str(raw_type).map_err(LedgerError::InvalidType)?;
        let amount = parse_amount(raw_amount)?;
        let note = normalize_note(self.description.as_deref())?;
        let occurred_at = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(date) => parse_date(date)?,
            None => now,
        };

        Ok(ValidTransaction {
            new: NewTransaction {
                amount,
                transaction_type,
                note,
                occurred_at,
            },
            category,
        })
    }

    fn category_ref(&self) -> Result<Option<CategoryRef>, LedgerError> {
        if let Some(name) = self.category_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return CategoryRef::name(name).map(Some);
        }

        Ok(match &self.category_id {
            Some(serde_json::Value::Number(n)) => Some(
                n.as_i64()
                    .map_or_else(|| CategoryRef::Token(n.to_string()), |id| {
                        CategoryRef::Id(CategoryId(id))
                    }),
            ),
            Some(serde_json::Value::String(s)) => CategoryRef::token(s),
            _ => None,
        })
    }
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_decimal(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a transaction amount: number or numeric string, rounded half away
/// from zero to cents, strictly positive, at most [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns `InvalidAmount` or `AmountTooLarge`.
pub fn parse_amount(value: &serde_json::Value) -> Result<Decimal, LedgerError> {
    let amount = round_cents(to_decimal(value).ok_or(LedgerError::InvalidAmount)?);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::AmountTooLarge);
    }
    Ok(amount)
}

/// Parses a monthly budget: like an amount, but zero is allowed.
///
/// # Errors
///
/// Returns `InvalidBudget`.
pub fn parse_budget(value: &serde_json::Value) -> Result<Decimal, LedgerError> {
    let budget = round_cents(to_decimal(value).ok_or(LedgerError::InvalidBudget)?);
    if budget < Decimal::ZERO || budget > MAX_AMOUNT {
        return Err(LedgerError::InvalidBudget);
    }
    Ok(budget)
}

/// Parses `YYYY-MM-DD` as midnight UTC.
///
/// # Errors
///
/// Returns `InvalidDate`.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, LedgerError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(LedgerError::InvalidDate)
}

/// Trims a description; blank becomes `None`.
///
/// # Errors
///
/// Returns `NoteTooLong` past [`MAX_NOTE_LEN`] characters.
pub fn normalize_note(raw: Option<&str>) -> Result<Option<String>, LedgerError> {
    match raw.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(None),
        Some(note) if note.chars().count() > MAX_NOTE_LEN => Err(LedgerError::NoteTooLong),
        Some(note) => Ok(Some(note.to_string())),
    }
}
