//! Nestegg API Server
//!
//! Main entry point for the Nestegg backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nestegg_api::provider::HttpIdentityProvider;
use nestegg_api::{AppState, create_router};
use nestegg_core::auth::IdentityProvider;
use nestegg_shared::config::LoggingConfig;
use nestegg_shared::{AppConfig, JwtConfig, JwtService};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let stores = nestegg_db::open(&config.database)
        .await
        .context("Failed to open stores")?;

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let identity_provider: Option<Arc<dyn IdentityProvider>> = if config.oauth.is_configured() {
        let provider = HttpIdentityProvider::new(config.oauth.clone())?;
        info!(
            authorization_endpoint = %config.oauth.authorization_endpoint,
            "External login configured"
        );
        Some(Arc::new(provider))
    } else {
        info!("External login not configured");
        None
    };

    let state = AppState::new(stores, jwt_service, identity_provider);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
