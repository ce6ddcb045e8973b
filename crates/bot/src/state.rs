use std::sync::Arc;

use crate::config::BotConfig;
use crate::handler::MessageHandler;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dedup_db::DbPool,
    /// Bot configuration (token, update mode, detection tuning).
    pub config: Arc<BotConfig>,
    /// Duplicate detection shared with the polling loop.
    pub handler: Arc<MessageHandler>,
}
