//! Webhook update source.
//!
//! Telegram POSTs each update as JSON to `{WEBHOOK_URL}/{token}` with the
//! configured secret in the `X-Telegram-Bot-Api-Secret-Token` header.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use dedup_core::hashing::secrets_match;
use dedup_telegram::{BotApi, TelegramError, Update};

use crate::config::{BotConfig, UpdateMode};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Header Telegram uses to echo the webhook secret.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Deliveries Telegram may have in flight at once. One keeps updates in
/// order, as with polling.
pub const MAX_CONNECTIONS: u32 = 1;

/// POST /{token} -- receive one update.
///
/// Processing failures are logged and still acknowledged with 200 so
/// Telegram does not redeliver the same update forever.
async fn receive_update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Update>, JsonRejection>,
) -> AppResult<StatusCode> {
    let UpdateMode::Webhook { secret, .. } = &state.config.mode else {
        return Err(AppError::NotFound);
    };
    if !secrets_match(&token, &state.config.token) {
        return Err(AppError::NotFound);
    }

    let supplied = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !supplied.is_some_and(|supplied| secrets_match(supplied, secret)) {
        tracing::warn!("Webhook request with missing or wrong secret token");
        return Err(AppError::Unauthorized(
            "Invalid webhook secret token".to_string(),
        ));
    }

    let Json(update) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    tracing::debug!(update_id = update.update_id, "Webhook update received");

    state.handler.dispatch(&update).await;
    Ok(StatusCode::OK)
}

/// Mount the webhook endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/{token}", post(receive_update))
}

/// Register the webhook with Telegram, dropping any updates that queued
/// while the bot was down.
pub async fn register(api: &BotApi, config: &BotConfig) -> Result<(), TelegramError> {
    let (Some(endpoint), UpdateMode::Webhook { url, secret }) =
        (config.webhook_endpoint(), &config.mode)
    else {
        return Ok(());
    };

    api.set_webhook(&endpoint, true, Some(secret), MAX_CONNECTIONS).await?;
    tracing::info!(webhook_url = %url, "Webhook registered");
    Ok(())
}
