#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use dedup_bot::config::{BotConfig, DetectionConfig, ServerConfig, UpdateMode};
use dedup_bot::handler::{MessageHandler, Notifier};
use dedup_bot::router::build_app_router;
use dedup_bot::state::AppState;
use dedup_db::{DbPool, DbTarget};
use dedup_telegram::{TelegramError, Update};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_TOKEN: &str = "123456:test-token";
pub const TEST_SECRET: &str = "test-secret";
pub const TEST_CHAT: i64 = -1001234;

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// A reply captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct SentReply {
    pub chat_id: i64,
    pub reply_to: i64,
    pub text: String,
}

/// Captures replies instead of calling Telegram.
#[derive(Default)]
pub struct RecordingNotifier {
    replies: Mutex<Vec<SentReply>>,
}

impl RecordingNotifier {
    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn reply(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<(), TelegramError> {
        self.replies.lock().unwrap().push(SentReply {
            chat_id,
            reply_to,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Always fails, as if Telegram rejected the reply.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn reply(&self, _chat_id: i64, _reply_to: i64, _text: &str) -> Result<(), TelegramError> {
        Err(TelegramError::Api {
            code: 400,
            description: "Bad Request: chat not found".to_string(),
            retry_after: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Build a test `BotConfig` with default detection settings.
pub fn test_config(mode: UpdateMode) -> BotConfig {
    BotConfig {
        token: TEST_TOKEN.to_string(),
        telegram_api_url: "http://127.0.0.1:1".to_string(),
        database: DbTarget::Sqlite {
            path: PathBuf::from("unused.db"),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        },
        mode,
        detection: DetectionConfig::default(),
        retention_interval_secs: 3600,
        poll_timeout_secs: 0,
    }
}

pub fn webhook_mode() -> UpdateMode {
    UpdateMode::Webhook {
        url: "https://bot.example.com".to_string(),
        secret: TEST_SECRET.to_string(),
    }
}

/// Open a migrated SQLite database in a temporary directory.
pub async fn test_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let target = DbTarget::Sqlite {
        path: dir.path().join("messages.db"),
    };
    let pool = dedup_db::create_pool(&target).await.expect("open sqlite");
    dedup_db::run_migrations(&pool).await.expect("migrate");
    (dir, pool)
}

/// Everything a test needs to drive the bot without Telegram.
pub struct TestBot {
    /// Keeps the SQLite file alive.
    pub dir: TempDir,
    pub pool: DbPool,
    pub config: Arc<BotConfig>,
    pub notifier: Arc<RecordingNotifier>,
    pub handler: Arc<MessageHandler>,
}

impl TestBot {
    pub async fn new(mode: UpdateMode) -> Self {
        let (dir, pool) = test_pool().await;
        let config = Arc::new(test_config(mode));
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = Arc::new(MessageHandler::new(
            pool.clone(),
            notifier.clone(),
            config.detection.clone(),
        ));
        Self {
            dir,
            pool,
            config,
            notifier,
            handler,
        }
    }

    /// Build the full application router, mirroring `main.rs`.
    pub fn app(&self) -> Router {
        build_app_router(AppState {
            pool: self.pool.clone(),
            config: Arc::clone(&self.config),
            handler: Arc::clone(&self.handler),
        })
    }
}

/// A group text message update as Telegram would send it.
pub fn text_update(
    update_id: i64,
    chat_id: i64,
    message_id: i64,
    user_id: i64,
    first_name: &str,
    text: &str,
) -> Update {
    serde_json::from_value(text_update_json(
        update_id, chat_id, message_id, user_id, first_name, text,
    ))
    .expect("valid update json")
}

pub fn text_update_json(
    update_id: i64,
    chat_id: i64,
    message_id: i64,
    user_id: i64,
    first_name: &str,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": {"id": user_id, "is_bot": false, "first_name": first_name},
            "chat": {"id": chat_id, "type": "supergroup", "title": "Test Group"},
            "date": 1771730483,
            "text": text,
        }
    })
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(
    app: Router,
    uri: &str,
    secret: Option<&str>,
    body: String,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-telegram-bot-api-secret-token", secret);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
