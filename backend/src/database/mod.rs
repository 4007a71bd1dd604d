//! Database module
//!
//! This module provides all database functionality including:
//! - Schema and migrations
//! - Model definitions
//! - Listing query construction
//! - Repository layer for owner-scoped reads and writes

pub mod models;
pub mod query;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Build connection options shared by migration and application connections.
fn connect_options(config: &DatabaseConfig) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout())
        .foreign_keys(true);

    if config.is_in_memory() {
        Ok(opts)
    } else {
        Ok(opts.journal_mode(SqliteJournalMode::Wal))
    }
}

fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
}

/// Create and initialize a database connection pool.
///
/// Migrations run on a dedicated single-connection pool that is closed
/// before the application pool is created, so no pooled connection holds
/// a schema cached from before the migration. In-memory databases skip
/// this split: each memory connection is a separate database.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {}", config.url);

    if config.is_in_memory() {
        let pool = pool_options(config)
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options(config)?)
            .await?;
        initialize_database(&pool).await?;
        return Ok(pool);
    }

    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(config)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    let pool = pool_options(config)
        .connect_with(connect_options(config)?)
        .await?;

    tracing::info!("Database pool created successfully");

    Ok(pool)
}
