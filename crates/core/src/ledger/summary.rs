//! Aggregation engine: balance, per-type totals and this month's
//! per-category breakdown, recomputed from the full ledger on every call.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{LedgerLine, TransactionType};

/// Budget summary for one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// `income - expenses - bills`.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Sum of all income.
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    /// Sum of all expenses.
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses: Decimal,
    /// Sum of all bills.
    #[serde(with = "rust_decimal::serde::float")]
    pub bills: Decimal,
    /// This month's totals per category, largest first.
    pub categories: Vec<CategoryTotal>,
}

/// One row of the monthly category breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// Category name.
    pub name: String,
    /// Sum of this month's amounts.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// First instant of the UTC month containing `now`.
#[must_use]
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(now, |naive| naive.and_utc())
}

/// Summarizes a family's ledger as of `now`.
///
/// Totals cover every line. The category breakdown covers lines with
/// `month_start(now) <= occurred_at <= now`, of any type, ordered by total
/// descending and then by name.
#[must_use]
pub fn summarize(lines: &[LedgerLine], now: DateTime<Utc>) -> Summary {
    let window_start = month_start(now);

    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut bills = Decimal::ZERO;
    let mut by_category: HashMap<&str, Decimal> = HashMap::new();

    for line in lines {
        let tx = &line.transaction;
        match tx.transaction_type {
            TransactionType::Income => income += tx.amount,
            TransactionType::Expense => expenses += tx.amount,
            TransactionType::Bill => bills += tx.amount,
        }

        if tx.occurred_at >= window_start && tx.occurred_at <= now {
            *by_category
                .entry(line.category_name.as_str())
                .or_insert(Decimal::ZERO) += tx.amount;
        }
    }

    let mut categories: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(name, amount)| CategoryTotal {
            name: name.to_string(),
            amount,
        })
        .collect();
    categories.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));

    Summary {
        balance: income - expenses - bills,
        income,
        expenses,
        bills,
        categories,
    }
}
