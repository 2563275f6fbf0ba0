//! Ledger domain types.

use chrono::{DateTime, Utc};
use nestegg_shared::types::{CategoryId, FamilyId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction type. The sign of an amount is carried here, never in the
/// amount itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Day-to-day spending.
    Expense,
    /// Recurring obligations.
    Bill,
}

impl TransactionType {
    /// All variants, in display order.
    pub const ALL: [Self; 3] = [Self::Income, Self::Expense, Self::Bill];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Bill => "bill",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "bill" => Ok(Self::Bill),
            other => Err(other.to_string()),
        }
    }
}

/// A spending category owned by a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Owning family.
    #[serde(skip_serializing)]
    pub family_id: FamilyId,
    /// Display name.
    pub name: String,
    /// Planned monthly spend.
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_budget: Decimal,
    /// Creation timestamp.
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    /// Trimmed display name.
    pub name: String,
    /// Planned monthly spend, two decimals, never negative.
    pub monthly_budget: Decimal,
}

/// A recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Owning family.
    pub family_id: FamilyId,
    /// Category in the same family.
    pub category_id: CategoryId,
    /// Strictly positive amount, two decimals.
    pub amount: Decimal,
    /// Income, expense or bill.
    pub transaction_type: TransactionType,
    /// Optional description.
    pub note: Option<String>,
    /// When the money moved.
    pub occurred_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Validated input for recording a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Strictly positive amount, two decimals.
    pub amount: Decimal,
    /// Income, expense or bill.
    pub transaction_type: TransactionType,
    /// Optional description.
    pub note: Option<String>,
    /// When the money moved.
    pub occurred_at: DateTime<Utc>,
}

/// A transaction joined with its category name, as read back for listing
/// and aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    /// The transaction.
    pub transaction: Transaction,
    /// Name of its category.
    pub category_name: String,
}
