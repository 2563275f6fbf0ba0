//! External identity login: `START` redirect and `CALLBACK` handling.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use nestegg_core::auth::{IdentityProvider, OAuthError, User, verify_callback_state};
use nestegg_shared::auth::AuthResponse;
use serde::Deserialize;
use tracing::info;

use super::auth::issue_for;
use crate::AppState;
use crate::error::ApiResult;

/// Cookie binding the state token to the browser that started the flow.
pub const STATE_COOKIE: &str = "oauth_state";

const COOKIE_PATH: &str = "/auth/external";

/// Creates the external login router. Mounted at the root, not under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/external", get(start))
        .route("/auth/external/callback", get(callback))
}

/// Query parameters of the provider callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// State token echoed by the provider.
    #[serde(default)]
    pub state: Option<String>,
    /// Authorization code.
    #[serde(default)]
    pub code: Option<String>,
}

fn provider(state: &AppState) -> Result<&dyn IdentityProvider, OAuthError> {
    state
        .identity_provider
        .as_deref()
        .ok_or(OAuthError::NotConfigured)
}

/// GET /auth/external - Redirect to the provider with a fresh state token.
async fn start(State(state): State<AppState>, jar: CookieJar) -> ApiResult<(CookieJar, Redirect)> {
    let provider = provider(&state)?;
    let state_token = state.jwt_service.issue_state_token()?;
    let url = provider.authorization_url(&state_token)?;

    let cookie = Cookie::build((STATE_COOKIE, state_token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path(COOKIE_PATH)
        .build();

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// GET /auth/external/callback - Finish the flow and hand the credential to
/// the browser.
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<(CookieJar, Html<String>)> {
    let provider = provider(&state)?;

    verify_callback_state(
        &state.jwt_service,
        &state.oauth_states,
        query.state.as_deref(),
        jar.get(STATE_COOKIE).map(Cookie::value),
    )?;

    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(OAuthError::MissingCode)?;

    let access_token = provider.exchange_code(code).await?;
    let profile = provider.fetch_profile(&access_token).await?.into_external()?;

    let user = state.identities.resolve_external_user(&profile).await?;
    let auth = issue_for(&state, &user)?;

    info!(user_id = %user.id, family_id = %user.family_id, "external login completed");

    let jar = jar.remove(Cookie::build(STATE_COOKIE).path(COOKIE_PATH));
    Ok((jar, Html(success_page(&user, &auth))))
}

/// Escapes text for HTML element content and quoted attribute values.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the confirmation page.
///
/// Values travel in `data-*` attributes and are read back through
/// `dataset`, so nothing user-controlled is ever spliced into script text.
fn success_page(user: &User, auth: &AuthResponse) -> String {
    let display = user.name.as_deref().unwrap_or(&user.email);

    let body = format!(
        "<div id=\"login\" data-token=\"{}\" data-user-id=\"{}\" data-family-id=\"{}\">\n\
         <h1>Login Successful!</h1>\n<p>Welcome, {}!</p>\n\
         <p>Your access token has been saved to localStorage.</p>\n\
         <a href=\"/\">Continue</a>\n</div>\n",
        escape_html(&auth.access_token),
        auth.user_id,
        auth.family_id,
        escape_html(display),
    );

    let mut page = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Login Successful</title>\n</head>\n<body>\n",
    );
    page.push_str(&body);
    page.push_str(
        "<script>\n\
         const login = document.getElementById('login').dataset;\n\
         localStorage.setItem('access_token', login.token);\n\
         localStorage.setItem('user_id', login.userId);\n\
         localStorage.setItem('family_id', login.familyId);\n\
         </script>\n</body>\n</html>\n",
    );
    page
}
