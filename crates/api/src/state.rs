//! Shared application state for the Axum admin server.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use courier_common::config::AppConfig;
use courier_dispatch::coordinator::DispatchCoordinator;
use courier_dispatch::properties::PropertyCache;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
    pub cache: Arc<PropertyCache>,
    pub coordinator: Arc<DispatchCoordinator>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        config: AppConfig,
        cache: Arc<PropertyCache>,
        coordinator: Arc<DispatchCoordinator>,
    ) -> Self {
        Self {
            pool,
            redis,
            config,
            cache,
            coordinator,
        }
    }
}
