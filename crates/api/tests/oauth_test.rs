//! External login flow tests with a scripted identity provider.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{FakeProvider, app, app_with, jwt, send, send_raw};
use nestegg_api::AppState;
use nestegg_core::IdentityStore;
use nestegg_core::auth::IdentityProvider;
use serde_json::{Value, json};

fn google_profile() -> Value {
    json!({
        "sub": "google-123",
        "email": "Carol@Example.com",
        "email_verified": true,
        "name": "Carol",
        "picture": "https://img.test/carol.png"
    })
}

fn oauth_app(profile: Value) -> (Router, AppState, Arc<FakeProvider>) {
    let provider = FakeProvider::new(profile);
    let (app, state) = app_with(Some(provider.clone() as Arc<dyn IdentityProvider>));
    (app, state, provider)
}

fn callback(state: Option<&str>, code: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let mut query = Vec::new();
    if let Some(state) = state {
        query.push(format!("state={state}"));
    }
    if let Some(code) = code {
        query.push(format!("code={code}"));
    }
    let mut builder = Request::builder().uri(format!("/auth/external/callback?{}", query.join("&")));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("oauth_state={cookie}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Runs `START` and returns the state token from the redirect.
async fn start(app: &Router) -> String {
    let request = Request::builder().uri("/auth/external").body(Body::empty()).unwrap();
    let (status, headers, _) = send_raw(app, request).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let cookie = headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/auth/external"));

    let location = headers[header::LOCATION].to_str().unwrap();
    let state = location.split("state=").nth(1).unwrap().to_string();
    assert!(cookie.starts_with(&format!("oauth_state={state}")));
    state
}

#[tokio::test]
async fn test_start_without_provider_is_not_configured() {
    let request = Request::builder().uri("/auth/external").body(Body::empty()).unwrap();
    let (status, body) = send(&app(), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "not_configured");
}

#[tokio::test]
async fn test_full_flow_creates_user_and_family() {
    let (app, state, _) = oauth_app(google_profile());
    let token = start(&app).await;

    let (status, headers, page) = send_raw(&app, callback(Some(&token), Some("abc"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("localStorage.setItem('access_token'"));
    assert!(page.contains("Welcome, Carol!"));
    assert!(headers[header::SET_COOKIE].to_str().unwrap().starts_with("oauth_state="));

    let user = state
        .identities
        .find_user_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.external_id.as_deref(), Some("google-123"));
    assert!(user.password_hash.is_none());

    let families = state.identities.list_families().await.unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].name, "Carol's Family");
    assert_eq!(families[0].id, user.family_id);
}

#[tokio::test]
async fn test_callback_links_existing_password_user() {
    let (app, state, _) = oauth_app(google_profile());
    let registered = common::register(&app, "carol@example.com", "Smiths").await;

    let token = start(&app).await;
    let (status, _, _) = send_raw(&app, callback(Some(&token), Some("abc"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let user = state
        .identities
        .find_user_by_email("carol@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.family_id.get(), registered["family_id"].as_i64().unwrap());
    assert_eq!(user.external_id.as_deref(), Some("google-123"));
    assert!(user.password_hash.is_some());
    assert_eq!(state.identities.list_families().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_mismatched_state_creates_nothing() {
    let (app, state, provider) = oauth_app(google_profile());
    let token = start(&app).await;
    let other = jwt().issue_state_token().unwrap();

    let (status, body) = send(&app, callback(Some(&other), Some("abc"), Some(&token))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");
    assert_eq!(provider.exchange_count(), 0);
    assert!(state.identities.list_families().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_errors() {
    let (app, _, provider) = oauth_app(google_profile());

    let (status, body) = send(&app, callback(None, Some("abc"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_state");

    let (_, body) = send(&app, callback(Some("forged"), Some("abc"), None)).await;
    assert_eq!(body["code"], "invalid_state");

    let token = start(&app).await;
    let (status, body) = send(&app, callback(Some(&token), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_code");
    assert_eq!(provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_state_is_single_use() {
    let (app, _, _) = oauth_app(google_profile());
    let token = start(&app).await;

    let (status, _, _) = send_raw(&app, callback(Some(&token), Some("abc"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, callback(Some(&token), Some("abc"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");
}

#[tokio::test]
async fn test_exchange_failure_aborts() {
    let (app, state, _) = oauth_app(google_profile());
    let token = start(&app).await;

    let (status, body) = send(&app, callback(Some(&token), Some("bad-code"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "exchange_failed");
    assert!(state.identities.list_families().await.unwrap().is_empty());
}

#[rstest::rstest]
#[case(json!({ "sub": "x", "email": "d@example.com", "email_verified": false }), "email_unverified")]
#[case(json!({ "sub": "x" }), "incomplete_profile")]
#[case(json!({ "email": "d@example.com" }), "incomplete_profile")]
#[tokio::test]
async fn test_profile_rules(#[case] profile: Value, #[case] code: &str) {
    let (app, state, _) = oauth_app(profile);
    let token = start(&app).await;

    let (status, body) = send(&app, callback(Some(&token), Some("abc"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], code);
    assert!(state.identities.list_families().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_page_escapes_display_name() {
    let (app, _, _) = oauth_app(json!({
        "id": 42,
        "email": "eve@example.com",
        "name": "<script>alert(1)</script>"
    }));
    let token = start(&app).await;

    let (status, _, page) = send_raw(&app, callback(Some(&token), Some("abc"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!page.contains("<script>alert(1)</script>"));
    assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}
