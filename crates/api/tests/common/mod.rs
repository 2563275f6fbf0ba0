//! Shared helpers for API tests: an in-memory app and a scripted provider.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use nestegg_api::{AppState, create_router};
use nestegg_core::auth::{IdentityProvider, OAuthError, ProviderProfile};
use nestegg_db::Stores;
use nestegg_shared::jwt::{JwtConfig, JwtService};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret-key-for-api-tests";

pub fn jwt() -> JwtService {
    JwtService::new(JwtConfig {
        secret: SECRET.to_string(),
        ..JwtConfig::default()
    })
}

/// Router and state over a fresh in-memory store.
pub fn app_with(provider: Option<Arc<dyn IdentityProvider>>) -> (Router, AppState) {
    let state = AppState::new(Stores::memory(), jwt(), provider);
    (create_router(state.clone()), state)
}

pub fn app() -> Router {
    app_with(None).0
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends a request and returns status, headers and the raw body.
pub async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Sends a request and parses the JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(Value::String(body))
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, json_request("GET", uri, Some(token), None)).await
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, json_request("POST", uri, token, Some(body))).await
}

/// Registers a user and returns the auth response body.
pub async fn register(app: &Router, email: &str, family_name: &str) -> Value {
    let (status, body) = post(
        app,
        "/api/auth/register",
        None,
        json!({ "email": email, "password": "hunter22", "family_name": family_name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body
}

/// Registers a user and returns just the bearer credential.
pub async fn token_for(app: &Router, email: &str, family_name: &str) -> String {
    register(app, email, family_name).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Identity provider that returns a fixed profile and counts exchanges.
pub struct FakeProvider {
    pub profile: Value,
    pub exchanges: AtomicUsize,
}

impl FakeProvider {
    pub fn new(profile: Value) -> Arc<Self> {
        Arc::new(Self {
            profile,
            exchanges: AtomicUsize::new(0),
        })
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        Ok(format!("https://provider.test/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == "bad-code" {
            return Err(OAuthError::ExchangeFailed("token endpoint returned 400".into()));
        }
        Ok(format!("provider-token-{code}"))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError> {
        assert!(access_token.starts_with("provider-token-"));
        serde_json::from_value(self.profile.clone())
            .map_err(|e| OAuthError::ProfileFetchFailed(e.to_string()))
    }
}
