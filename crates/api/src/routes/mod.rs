pub mod health;
pub mod notices;

use axum::Router;

use crate::state::AppState;

/// Build the complete admin API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(notices::router())
        .with_state(state)
}
