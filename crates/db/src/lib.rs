//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository implementations of the `nestegg_core` store traits
//! - An in-memory store implementing the same traits
//! - Database migrations

pub mod entities;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use memory::MemoryStore;
pub use repositories::{IdentityRepository, LedgerRepository};

use std::sync::Arc;
use std::time::Duration;

use nestegg_core::{IdentityStore, LedgerStore};
use nestegg_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// URL scheme selecting the in-memory store.
pub const MEMORY_URL_SCHEME: &str = "memory://";

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// The store handles shared by every request.
#[derive(Clone)]
pub struct Stores {
    /// Users and families.
    pub identities: Arc<dyn IdentityStore>,
    /// Categories and transactions.
    pub ledger: Arc<dyn LedgerStore>,
}

impl Stores {
    /// Both traits served by one in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        let store = MemoryStore::new();
        Self {
            identities: Arc::new(store.clone()),
            ledger: Arc::new(store),
        }
    }

    /// Both traits served by PostgreSQL repositories over one pool.
    #[must_use]
    pub fn postgres(db: DatabaseConnection) -> Self {
        Self {
            identities: Arc::new(IdentityRepository::new(db.clone())),
            ledger: Arc::new(LedgerRepository::new(db)),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Opens the stores named by `database.url`.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn open(config: &DatabaseConfig) -> Result<Stores, DbErr> {
    if config.url.starts_with(MEMORY_URL_SCHEME) {
        tracing::warn!("using in-memory store; data is lost on shutdown");
        return Ok(Stores::memory());
    }

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::info!(
        max_connections = config.max_connections,
        "connected to database"
    );
    Ok(Stores::postgres(db))
}
