//! Core QueryHaus functionality
//!
//! This module contains the main QueryHaus struct: it owns the MySQL
//! connection pool and hands out model handles carrying the configured
//! compiler defaults.

use sqlx::MySqlPool;
use std::time::Duration;

use sql_builder::{Model, SqlCompiler};

use crate::errors::QueryHausError;
use config::AppConfig;

/// Main coordinator: connection pool plus immutable configuration.
pub struct QueryHaus {
    pool: MySqlPool,
    config: AppConfig,
}

impl QueryHaus {
    /// Create a new QueryHaus with a database connection pool.
    pub async fn new(config: AppConfig) -> Result<Self, QueryHausError> {
        let connection_string = config.database.connection_string();

        let mut pool_options = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(
                config.database.connection_timeout_seconds,
            ))
            .idle_timeout(Duration::from_secs(config.database.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.database.max_lifetime_seconds > 0 {
            pool_options = pool_options
                .max_lifetime(Duration::from_secs(config.database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;

        Ok(Self { pool, config })
    }

    /// Load configuration from the environment/default path and connect.
    pub async fn from_default_config() -> Result<Self, QueryHausError> {
        let config = AppConfig::load()?;
        Self::new(config).await
    }

    /// Get database pool reference
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// A model handle bound to `table` (the configured table prefix is
    /// applied).
    pub fn model(&self, table: &str) -> Model {
        Model::new(self.pool.clone(), self.config.compiler.clone(), table)
    }

    /// A standalone statement compiler carrying the configured defaults.
    pub fn compiler(&self) -> SqlCompiler {
        SqlCompiler::new(self.config.compiler.clone())
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), QueryHausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
