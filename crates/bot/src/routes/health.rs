use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Body of the root liveness probe.
pub const ALIVE_MESSAGE: &str = "Bot is alive!";

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Storage backend in use (`postgresql` or `sqlite`).
    pub db_backend: &'static str,
    /// How updates are received (`polling` or `webhook`).
    pub mode: &'static str,
}

/// GET / -- plain liveness probe for hosting platforms.
async fn alive() -> &'static str {
    ALIVE_MESSAGE
}

/// GET /health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = dedup_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        db_backend: state.pool.backend().as_str(),
        mode: state.config.mode.as_str(),
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(health_check))
}
