//! Database utilities and connection pooling for the forum services.
//!
//! This crate provides MySQL connection pool management and the account
//! schema bootstrap using sqlx.

mod config;
mod pool;
mod schema;

pub use config::DbConfig;
pub use pool::{create_pool, health_check, DbPool};
pub use schema::{ensure_schema, SEED_ROLES};

// Re-export sqlx types for convenience
pub use sqlx::{self, Row};
