//! Marketplace core library
//!
//! Requests, offers, contracts with escrow release, the wallet ledger and
//! notifications, persisted through a [`infra::DocumentStore`].
//! Embedded by the gateway binary.

pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use common::{AppResult, DatabaseConfig, MarketplaceConfig};

pub use crate::infra::{MigrateAction, MigrationState};

use crate::infra::Database;
use crate::service::{AdminCredentials, Diagnoser, Marketplace};

/// Connect to Postgres, apply pending migrations and wire the services.
pub async fn connect(
    database: &DatabaseConfig,
    config: MarketplaceConfig,
    credentials: AdminCredentials,
    diagnoser: Arc<dyn Diagnoser>,
) -> AppResult<Marketplace> {
    let db = Database::open_migrated(database).await?;
    Ok(Marketplace::new(
        Arc::new(db.store()),
        config,
        credentials,
        diagnoser,
    ))
}

/// Apply a migration command against the configured database.
pub async fn run_migrations(action: MigrateAction, database: &DatabaseConfig) -> AppResult<Vec<MigrationState>> {
    let db = Database::open(database).await?;
    let states = db.migrate(action).await?;

    let applied = states.iter().filter(|s| s.applied).count();
    info!(?action, applied, known = states.len(), "Migration command finished");

    Ok(states)
}
