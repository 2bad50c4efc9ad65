//! Database layer for the repository
//!
//! Provides:
//! - SeaORM entity models
//! - Persistence ports and their Postgres / in-memory adapters
//! - Connection pool management and schema migrations

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryPaperStore;
pub use repository::Repository;
pub use store::{PaperStore, PaperWriter};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sqlx::migrate::Migrator;
use std::time::Duration;
use tracing::info;

/// Schema migrations embedded at build time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

fn connection_error(stage: &str, err: impl std::fmt::Display) -> AppError {
    AppError::DatabaseConnection {
        message: format!("Database {stage} failed: {err}"),
    }
}

/// Shared Postgres connection pool
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| connection_error("connect", e))?;

        info!(max_connections = config.max_connections, "Database pool ready");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(self.conn.get_postgres_connection_pool())
            .await
            .map_err(|e| connection_error("migration", e))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| connection_error("ping", e))
    }
}
