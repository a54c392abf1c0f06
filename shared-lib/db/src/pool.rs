//! Database connection pool management.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::config::DbConfig;
use error::DatabaseError;

/// Type alias for MySQL connection pool.
pub type DbPool = MySqlPool;

/// Open a pool against the configured forum database.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, DatabaseError> {
    tracing::info!(
        "Connecting to {}:{}/{} as {} (max {} connections)",
        config.host,
        config.port,
        config.database,
        config.username,
        config.max_connections
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.connection_url())
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to {}: {}", config.database, e);
            DatabaseError::ConnectionFailed(e.to_string())
        })?;

    Ok(pool)
}

/// Round-trip a trivial query; used once at startup before serving.
pub async fn health_check(pool: &DbPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await.map_err(|e| {
        tracing::error!("Database health check failed: {}", e);
        DatabaseError::ConnectionFailed(e.to_string())
    })?;
    tracing::info!("Database connection is healthy");
    Ok(())
}
