//! Category listing and explicit creation.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use nestegg_core::ledger::{Category, validate_new_category};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::ApiJson;
use crate::middleware::AuthUser;

/// Creates the category router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories).post(create_category))
}

/// Request body for creating a category.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCategoryRequest {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Planned monthly spend, number or numeric string.
    #[serde(default)]
    pub monthly_budget: Option<serde_json::Value>,
}

/// GET /api/categories - The family's categories, by name.
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.ledger.list_categories(auth.family_id()).await?;
    Ok(Json(categories))
}

/// POST /api/categories - Create a category in the caller's family.
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let new = validate_new_category(payload.name.as_deref(), payload.monthly_budget.as_ref())?;
    let category = state.ledger.create_category(auth.family_id(), new).await?;

    info!(family_id = %auth.family_id(), category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}
