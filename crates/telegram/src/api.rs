//! HTTP client for the Telegram Bot API.
//!
//! Every method is a JSON `POST` to `{base_url}/bot{token}/{method}`; the
//! response envelope is unwrapped into either the `result` value or a
//! [`TelegramError::Api`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::types::{ApiResponse, Message, Update, User};

/// Public Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Timeout for ordinary (non long-poll) requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Extra time allowed on top of the long-poll timeout before the HTTP
/// request itself is abandoned.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Update kinds the bot asks Telegram to deliver.
pub const ALLOWED_UPDATES: &[&str] = &["message"];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the Bot API layer.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body).
    ///
    /// The URL is stripped because it embeds the bot token; build this
    /// variant with [`TelegramError::request`].
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// Telegram answered with `ok: false`.
    #[error("Telegram API error ({code}): {description}")]
    Api {
        code: i32,
        description: String,
        /// Flood-control wait in seconds, when Telegram supplied one.
        retry_after: Option<u64>,
    },

    /// Telegram answered `ok: true` without a `result` field.
    #[error("Telegram response for {0} had no result")]
    MissingResult(&'static str),
}

impl TelegramError {
    /// Wrap a transport error without the request URL.
    pub fn request(error: reqwest::Error) -> Self {
        TelegramError::Request(error.without_url())
    }

    /// How long Telegram asked us to wait before retrying, if at all.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::Api {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Whether the token was rejected. Retrying cannot help.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TelegramError::Api { code: 401, .. })
    }
}

/// Unwrap a Bot API envelope into its result.
pub fn into_result<T>(method: &'static str, response: ApiResponse<T>) -> Result<T, TelegramError> {
    if !response.ok {
        return Err(TelegramError::Api {
            code: response.error_code.unwrap_or_default(),
            description: response
                .description
                .unwrap_or_else(|| "no description".to_string()),
            retry_after: response.parameters.and_then(|p| p.retry_after),
        });
    }
    response.result.ok_or(TelegramError::MissingResult(method))
}

// ---------------------------------------------------------------------------
// BotApi
// ---------------------------------------------------------------------------

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct BotApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for BotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token grants full control of the bot; keep it out of logs.
        f.debug_struct("BotApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BotApi {
    /// Create a client against the public Bot API.
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Create a client against a custom Bot API server (self-hosted
    /// `telegram-bot-api`, or a stub in tests).
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TelegramError::request)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// The bot token this client authenticates with.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Fetch the bot's own user record. Used as a startup connectivity
    /// and token check.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({}), None).await
    }

    /// Long-poll for updates starting at `offset`.
    ///
    /// Waits up to `timeout_secs` for new updates before returning an empty
    /// list.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let request_timeout = Duration::from_secs(timeout_secs) + LONG_POLL_GRACE;
        self.call("getUpdates", &body, Some(request_timeout)).await
    }

    /// Send a text message, optionally as a reply to `reply_to` in the same
    /// chat. The reply is still sent if the original was deleted.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<Message, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }
        self.call("sendMessage", &body, None).await
    }

    /// Remove any registered webhook so `getUpdates` can be used.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, TelegramError> {
        self.call(
            "deleteWebhook",
            &json!({ "drop_pending_updates": drop_pending_updates }),
            None,
        )
        .await
    }

    /// Register `url` as the webhook target.
    ///
    /// Telegram echoes `secret_token` in the
    /// `X-Telegram-Bot-Api-Secret-Token` header of every delivery and opens
    /// at most `max_connections` simultaneous deliveries.
    pub async fn set_webhook(
        &self,
        url: &str,
        drop_pending_updates: bool,
        secret_token: Option<&str>,
        max_connections: u32,
    ) -> Result<bool, TelegramError> {
        let mut body = json!({
            "url": url,
            "drop_pending_updates": drop_pending_updates,
            "allowed_updates": ALLOWED_UPDATES,
            "max_connections": max_connections,
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        self.call("setWebhook", &body, None).await
    }

    // ---- private helpers ----

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// POST `body` to `method` and unwrap the envelope.
    ///
    /// Telegram returns the JSON envelope for 4xx/5xx errors too, so the
    /// body is parsed regardless of HTTP status.
    async fn call<B, T>(
        &self,
        method: &'static str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(TelegramError::request)?;
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(TelegramError::request)?;

        if !status.is_success() {
            tracing::debug!(method, status = status.as_u16(), "Telegram returned error status");
        }
        into_result(method, envelope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
