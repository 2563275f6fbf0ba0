//! Current identity endpoint.

use axum::{Json, Router, extract::State, routing::get};
use nestegg_shared::auth::UserInfoResponse;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;

/// Creates the user router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/user-info", get(user_info))
}

/// GET /api/user-info - The authenticated user's profile.
async fn user_info(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserInfoResponse>> {
    let user = state
        .identities
        .find_user_by_id(auth.user_id())
        .await?
        .filter(|u| u.family_id == auth.family_id())
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.to_info()))
}
