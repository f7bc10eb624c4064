//! Clubhouse Courier scheduler binary — runs the periodic dispatch jobs.

use std::sync::Arc;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_common::redis_pool::create_redis_pool;
use courier_dispatch::coordinator::DispatchCoordinator;
use courier_dispatch::properties::PropertyCache;
use courier_dispatch::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_dispatch=info,courier_channels=info".into()),
        )
        .json()
        .init();

    tracing::info!("Clubhouse Courier scheduler starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Connect to Redis (shared daily send counter)
    let redis = create_redis_pool(&config.redis_url).await?;

    let cache = Arc::new(PropertyCache::default());
    let coordinator = Arc::new(DispatchCoordinator::from_config(&pool, &cache, &config).await?);
    let scheduler = Scheduler::standard();

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = scheduler.run(pool, redis, cache, coordinator) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scheduler exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Clubhouse Courier scheduler stopped.");
    Ok(())
}
