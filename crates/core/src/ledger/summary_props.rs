//! Property-based tests for the aggregation engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use nestegg_shared::types::{CategoryId, FamilyId, TransactionId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::summary::{month_start, summarize};
use super::types::{LedgerLine, Transaction, TransactionType};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 18, 14, 0, 0).unwrap()
}

/// Amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn transaction_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Income),
        Just(TransactionType::Expense),
        Just(TransactionType::Bill),
    ]
}

/// Lines spread from ~90 days before to ~10 days after `now()`.
fn ledger_line() -> impl Strategy<Value = LedgerLine> {
    (
        transaction_type(),
        positive_amount(),
        prop::sample::select(vec!["Food", "Rent", "Salary", "Fun"]),
        -90 * 24i64..10 * 24i64,
    )
        .prop_map(|(ty, amount, category, hours)| {
            let occurred_at = now() + Duration::hours(hours);
            LedgerLine {
                transaction: Transaction {
                    id: TransactionId(1),
                    family_id: FamilyId(1),
                    category_id: CategoryId(1),
                    amount,
                    transaction_type: ty,
                    note: None,
                    occurred_at,
                    created_at: occurred_at,
                },
                category_name: category.to_string(),
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balance is always income minus expenses minus bills.
    #[test]
    fn prop_balance_identity(lines in prop::collection::vec(ledger_line(), 0..40)) {
        let summary = summarize(&lines, now());
        prop_assert_eq!(summary.balance, summary.income - summary.expenses - summary.bills);
    }

    /// Per-type totals equal a direct filter-and-sum.
    #[test]
    fn prop_totals_match_direct_sum(lines in prop::collection::vec(ledger_line(), 0..40)) {
        let summary = summarize(&lines, now());
        let total = |ty: TransactionType| -> Decimal {
            lines
                .iter()
                .filter(|l| l.transaction.transaction_type == ty)
                .map(|l| l.transaction.amount)
                .sum()
        };
        prop_assert_eq!(summary.income, total(TransactionType::Income));
        prop_assert_eq!(summary.expenses, total(TransactionType::Expense));
        prop_assert_eq!(summary.bills, total(TransactionType::Bill));
    }

    /// The result does not depend on input order.
    #[test]
    fn prop_order_independent(lines in prop::collection::vec(ledger_line(), 0..40)) {
        let mut reversed = lines.clone();
        reversed.reverse();
        prop_assert_eq!(summarize(&lines, now()), summarize(&reversed, now()));
    }

    /// The breakdown sums exactly the lines inside the month window, is
    /// sorted, and never lists a category twice.
    #[test]
    fn prop_breakdown_covers_month_window(lines in prop::collection::vec(ledger_line(), 0..40)) {
        let summary = summarize(&lines, now());
        let start = month_start(now());

        let in_window: Decimal = lines
            .iter()
            .map(|l| &l.transaction)
            .filter(|t| t.occurred_at >= start && t.occurred_at <= now())
            .map(|t| t.amount)
            .sum();
        let breakdown: Decimal = summary.categories.iter().map(|c| c.amount).sum();
        prop_assert_eq!(in_window, breakdown);

        for pair in summary.categories.windows(2) {
            prop_assert!(pair[0].amount >= pair[1].amount);
            prop_assert_ne!(&pair[0].name, &pair[1].name);
        }
        for row in &summary.categories {
            prop_assert!(row.amount > Decimal::ZERO);
        }
    }
}
