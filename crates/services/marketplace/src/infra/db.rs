//! Postgres pool setup and schema migrations.

use std::collections::HashSet;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::{seaql_migrations, MigratorTrait};

use common::DatabaseConfig;

use super::sql::{Migrator, SqlStore};

/// Direction for [`Database::migrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// One known migration and whether the database has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub name: String,
    pub applied: bool,
}

/// Pooled connection to the documents database
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Open the pool without touching the schema.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        Ok(Self {
            connection: SeaDatabase::connect(options).await?,
        })
    }

    /// Open the pool and bring the schema up to date.
    pub async fn open_migrated(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let db = Self::open(config).await?;
        db.migrate(MigrateAction::Up).await?;
        tracing::info!(pool = config.max_connections, "Documents schema up to date");
        Ok(db)
    }

    /// Document store over this pool
    pub fn store(&self) -> SqlStore {
        SqlStore::new(self.connection.clone())
    }

    /// Apply `action`, returning the migration list afterwards.
    pub async fn migrate(&self, action: MigrateAction) -> Result<Vec<MigrationState>, DbErr> {
        match action {
            MigrateAction::Up => Migrator::up(&self.connection, None).await?,
            MigrateAction::Down => Migrator::down(&self.connection, Some(1)).await?,
            MigrateAction::Fresh => Migrator::fresh(&self.connection).await?,
            MigrateAction::Status => {}
        }
        self.migration_states().await
    }

    async fn migration_states(&self) -> Result<Vec<MigrationState>, DbErr> {
        let applied: HashSet<String> = seaql_migrations::Entity::find()
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|row| row.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|migration| {
                let name = migration.name().to_string();
                MigrationState {
                    applied: applied.contains(&name),
                    name,
                }
            })
            .collect())
    }
}
