//! Password registration and login.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use nestegg_core::auth::{
    AuthError, Login, NewPasswordUser, Registration, User, authenticate, hash_password,
};
use nestegg_shared::auth::{AuthResponse, LoginRequest, RegisterRequest};
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::ApiJson;

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Issues a session credential for the user.
pub(crate) fn issue_for(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let access_token = state
        .jwt_service
        .issue_credential(user.id, user.family_id, &user.email)?;

    Ok(AuthResponse::bearer(
        access_token,
        state.jwt_service.access_token_expires_in(),
        user.id,
        user.family_id,
    ))
}

/// POST /api/auth/register - Register a user into a new or existing family.
async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let registration = Registration::from_request(&payload)?;
    let password_hash = hash_password(&registration.password).map_err(AuthError::from)?;

    let (user, family) = state
        .identities
        .register_password_user(NewPasswordUser {
            email: registration.email,
            password_hash,
            family_name: registration.family_name,
        })
        .await?;

    info!(user_id = %user.id, family_id = %family.id, "user registered");
    Ok((StatusCode::CREATED, Json(issue_for(&state, &user)?)))
}

/// POST /api/auth/login - Authenticate with email and password.
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let login = Login::from_request(&payload)?;

    let found = state.identities.find_user_by_email(&login.email).await?;
    let user = authenticate(found.as_ref(), &login.password).inspect_err(|_| {
        info!("failed login attempt");
    })?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_for(&state, user)?))
}
