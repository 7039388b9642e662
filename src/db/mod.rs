//! Database module providing connection management, migrations, and the
//! report/profile stores.

pub mod memory;
pub mod profiles;
pub mod reports;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

pub use memory::MemoryStore;
pub use store::{ProfileStore, ReportStore};

/// PostgreSQL connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the database settings from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(Self { conn })
    }

    /// Get the underlying connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))
    }
}

/// Report and profile stores selected by configuration.
#[derive(Clone)]
pub struct Stores {
    pub reports: Arc<dyn ReportStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Stores {
    /// Both stores backed by one implementation.
    pub fn from_backend<T>(backend: Arc<T>) -> Self
    where
        T: ReportStore + ProfileStore + 'static,
    {
        Self {
            reports: backend.clone(),
            profiles: backend,
        }
    }

    /// Open the configured backend, running migrations for PostgreSQL.
    pub async fn open(config: &Config) -> AppResult<Self> {
        match config.database.backend {
            StoreBackend::Postgres => {
                let pool = DbPool::new(config).await?;
                info!("Database connection established");
                pool.run_migrations().await?;
                info!("Database migrations complete");
                Ok(Self::from_backend(Arc::new(pool)))
            }
            StoreBackend::Memory => {
                info!("Using in-memory report store");
                Ok(Self::from_backend(Arc::new(MemoryStore::new())))
            }
        }
    }
}
