// Tasker - todo store
// Entry point: load config, start logging, open and migrate the database

use anyhow::Context;
use tasker::config::Config;
use tasker::database::{create_pool, schema::schema_version, Repository};
use tasker::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    init_tracing(&config.observability);

    tracing::info!(
        "Starting {} ({})",
        config.observability.service_name,
        config.observability.environment
    );

    let pool = create_pool(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;

    let version = schema_version(&pool).await?;
    tracing::info!("Database ready at schema version {}", version);

    let repo = Repository::from_config(pool.clone(), &config.observability);
    tracing::info!(
        "Repository ready (slow operation threshold {}ms)",
        repo.slow_query_threshold().as_millis()
    );

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
