//! Registration, login and authorization guard tests.

mod common;

use axum::http::StatusCode;
use common::{app, get, jwt, post, register, send, token_for};
use nestegg_core::auth::ExternalProfile;
use nestegg_core::IdentityStore;
use nestegg_db::Stores;
use serde_json::json;

#[tokio::test]
async fn test_register_returns_bearer_credential() {
    let app = app();
    let body = register(&app, "  Alice@Example.COM ", "Smiths").await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 43_200);
    assert!(body["user_id"].is_i64());

    let claims = jwt()
        .validate_token(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, "alice@example.com");
    assert_eq!(claims.family_id.get(), body["family_id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_same_family_name_shares_family() {
    let app = app();
    let a = register(&app, "a@example.com", "Smiths").await;
    let b = register(&app, "b@example.com", "Smiths").await;
    let c = register(&app, "c@example.com", "smiths").await;

    assert_eq!(a["family_id"], b["family_id"]);
    assert_ne!(a["family_id"], c["family_id"]);
}

#[tokio::test]
async fn test_register_rejects_missing_fields_and_duplicates() {
    let app = app();

    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "a@example.com", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    register(&app, "a@example.com", "Smiths").await;
    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "A@example.com", "password": "pw", "family_name": "Other" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = app();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_login_success_and_failures() {
    let app = app();
    register(&app, "alice@example.com", "Smiths").await;

    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "ALICE@example.com ", "password": "hunter22" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    for (email, password) in [("alice@example.com", "wrong"), ("nobody@example.com", "hunter22")] {
        let (status, body) = post(
            &app,
            "/api/auth/login",
            None,
            json!({ "email": email, "password": password }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_credentials");
    }
}

#[tokio::test]
async fn test_login_with_blank_fields_is_unauthorized() {
    let app = app();
    register(&app, "alice@example.com", "Smiths").await;

    for payload in [
        json!({ "email": "alice@example.com", "password": "" }),
        json!({ "email": "alice@example.com" }),
        json!({ "email": "", "password": "hunter22" }),
        json!({ "password": "hunter22" }),
    ] {
        let (status, body) = post(&app, "/api/auth/login", None, payload).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_credentials");
    }
}

#[tokio::test]
async fn test_register_rejects_oversized_email() {
    let app = app();
    let email = format!("{}@example.com", "a".repeat(300));

    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": email, "password": "hunter22", "family_name": "Smiths" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_oauth_only_user_cannot_password_login() {
    let stores = Stores::memory();
    stores
        .identities
        .resolve_external_user(&ExternalProfile {
            external_id: "sub-1".into(),
            email: "oauth@example.com".into(),
            name: None,
            picture: None,
        })
        .await
        .unwrap();
    let app = nestegg_api::create_router(nestegg_api::AppState::new(stores, jwt(), None));

    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "oauth@example.com", "password": "anything" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");
}

#[tokio::test]
async fn test_guard_rejects_missing_and_invalid_credentials() {
    let app = app();

    let (status, body) = send(
        &app,
        common::json_request("GET", "/api/categories", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_token");

    let (status, body) = get(&app, "/api/categories", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");

    let state_token = jwt().issue_state_token().unwrap();
    let (status, _) = get(&app, "/api/categories", &state_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_accepts_lowercase_scheme() {
    let app = app();
    let token = token_for(&app, "alice@example.com", "Smiths").await;

    let request = axum::http::Request::builder()
        .uri("/api/user-info")
        .header("authorization", format!("bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert!(body["external_id"].is_null());
}

#[tokio::test]
async fn test_health_is_public() {
    let (status, body) = send(&app(), common::json_request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["time"].is_string());
}
