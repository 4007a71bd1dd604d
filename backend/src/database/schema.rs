//! Database schema and migrations
//!
//! This module handles database initialization and schema migrations.
//! Uses SQLite with WAL mode and enforced foreign keys.

use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Foreign keys drive the cascade rules for children and comments
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = schema_version(pool).await?;

    tracing::info!("Current database version: {}", current_version);

    apply_migrations(pool, current_version).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

/// Highest applied migration version, 0 for a fresh database
pub async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);
    Ok(version)
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    for (version, sql) in get_migrations() {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![(1, include_str!("migrations/001_initial_schema.sql"))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_database() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        let version = schema_version(&pool).await.unwrap();
        assert_eq!(version, get_migrations().len() as i32);

        for table in ["todos", "todo_categories", "todo_comments"] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();
        initialize_database(&pool).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, get_migrations().len() as i64);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        let foreign_keys: i32 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(foreign_keys, 1);
    }

    #[tokio::test]
    async fn test_status_check_constraint() {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO todos (id, owner_id, title, title_folded, status, created_at, updated_at) \
             VALUES (x'00', 'user-1', 'bad', 'bad', 'finished', 'now', 'now')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
