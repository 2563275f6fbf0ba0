//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - The authorization guard middleware
//! - The HTTP identity provider client
//! - Error rendering

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod provider;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use nestegg_core::auth::{IdentityProvider, StateReplayGuard};
use nestegg_core::{IdentityStore, LedgerStore};
use nestegg_db::Stores;
use nestegg_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Users and families.
    pub identities: Arc<dyn IdentityStore>,
    /// Categories and transactions.
    pub ledger: Arc<dyn LedgerStore>,
    /// JWT service for credentials and OAuth state tokens.
    pub jwt_service: Arc<JwtService>,
    /// External identity provider, when configured.
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
    /// Consumed OAuth state nonces.
    pub oauth_states: StateReplayGuard,
}

impl AppState {
    /// Builds the state around opened stores.
    #[must_use]
    pub fn new(
        stores: Stores,
        jwt_service: JwtService,
        identity_provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let state_ttl = Duration::from_secs(
            u64::try_from(jwt_service.state_token_expires_in()).unwrap_or_default(),
        );
        Self {
            identities: stores.identities,
            ledger: stores.ledger,
            jwt_service: Arc::new(jwt_service),
            identity_provider,
            oauth_states: StateReplayGuard::new(state_ttl),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("jwt_service", &self.jwt_service)
            .field("identity_provider", &self.identity_provider.is_some())
            .field("oauth_states", &self.oauth_states)
            .finish_non_exhaustive()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .merge(routes::oauth::routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
