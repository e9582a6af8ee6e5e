//! Database layer for PaperMind
//!
//! Provides:
//! - SeaORM entity models
//! - Schema bootstrap and additive migrations
//! - Repository pattern for data access
//! - Connection pool management

pub mod models;
mod repository;
mod schema;

pub use repository::{
    canonical_pair, clamp_unit, normalize_concept_name, ChatSummary, ConceptLinkView,
    ConceptUsage, KnowledgeView, NewConcept, NewConceptLink, NewPaper, PaperRecord,
    RecordedPaper, Repository, Stats,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Open the database from configuration and bring the schema up to date
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(url = %config.url, "Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connect_timeout())
            .sqlx_logging(config.sql_logging);

        // An in-memory database disappears with its connection
        if config.is_in_memory() {
            opts.max_connections(1).min_connections(1);
        } else {
            opts.idle_timeout(config.idle_timeout());
        }

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to {}: {}", config.url, e),
            })?;

        if !config.is_in_memory() {
            conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        }

        schema::migrate(&conn).await?;

        info!("Database ready");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
