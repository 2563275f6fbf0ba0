//! Ledger routes: record, list and delete transactions, and the summary.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use nestegg_core::ledger::{
    LedgerError, LedgerLine, Summary, TransactionDraft, TransactionType, summarize,
};
use nestegg_shared::types::{CategoryId, TransactionId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::ApiJson;
use crate::middleware::AuthUser;

const NO_DESCRIPTION: &str = "No description";

/// Creates the budget router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budget/transaction", post(add_transaction))
        .route("/budget/transaction/{id}", delete(delete_transaction))
        .route("/budget/transactions", get(list_transactions))
        .route("/budget/summary", get(summary))
}

/// Category reference in a created transaction.
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    /// Category ID.
    pub id: CategoryId,
    /// Category name.
    pub name: String,
}

/// Response for a recorded transaction.
#[derive(Debug, Serialize)]
pub struct TransactionCreated {
    /// Transaction ID.
    pub id: TransactionId,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Stored amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Stored description.
    pub description: Option<String>,
    /// When the money moved.
    pub date: DateTime<Utc>,
    /// Resolved category.
    pub category: CategorySummary,
}

/// One row of the transaction listing.
#[derive(Debug, Serialize)]
pub struct TransactionListItem {
    /// Transaction ID.
    pub id: TransactionId,
    /// When the money moved.
    pub date: DateTime<Utc>,
    /// Description, or a placeholder.
    pub description: String,
    /// Amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Category name.
    pub category: String,
}

impl From<LedgerLine> for TransactionListItem {
    fn from(line: LedgerLine) -> Self {
        let tx = line.transaction;
        Self {
            id: tx.id,
            date: tx.occurred_at,
            description: tx.note.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            category: line.category_name,
        }
    }
}

/// POST /api/budget/transaction - Record a transaction, resolving its
/// category within the caller's family.
async fn add_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(draft): ApiJson<TransactionDraft>,
) -> ApiResult<(StatusCode, Json<TransactionCreated>)> {
    let valid = draft.validate(Utc::now())?;

    let (tx, category) = state
        .ledger
        .record_transaction(auth.family_id(), &valid.category, valid.new)
        .await?;

    info!(
        family_id = %auth.family_id(),
        transaction_id = %tx.id,
        category_id = %category.id,
        "transaction added"
    );

    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated {
            id: tx.id,
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            description: tx.note,
            date: tx.occurred_at,
            category: CategorySummary {
                id: category.id,
                name: category.name,
            },
        }),
    ))
}

/// GET /api/budget/transactions - The family's transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<TransactionListItem>>> {
    let lines = state.ledger.list_ledger(auth.family_id()).await?;
    Ok(Json(lines.into_iter().map(Into::into).collect()))
}

/// DELETE /api/budget/transaction/{id} - Delete one of the family's
/// transactions. Absent and foreign ids answer alike.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: TransactionId = id.parse().map_err(|_| LedgerError::TransactionNotFound)?;

    if !state.ledger.delete_transaction(auth.family_id(), id).await? {
        return Err(LedgerError::TransactionNotFound.into());
    }

    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

/// GET /api/budget/summary - Balance, totals and this month's breakdown.
async fn summary(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Summary>> {
    let lines = state.ledger.list_ledger(auth.family_id()).await?;
    Ok(Json(summarize(&lines, Utc::now())))
}
