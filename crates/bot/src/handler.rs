//! Duplicate detection for incoming Telegram messages.
//!
//! [`MessageHandler`] is shared by both update sources (long polling and
//! webhook). For each eligible text message it either records the content
//! hash or, when the same content was posted in the same chat inside the
//! duplicate window, replies with a notice naming the first poster.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use dedup_core::duplicate_detection::{self, DuplicateNotice};
use dedup_core::hashing::message_hash;
use dedup_core::types::{ChatId, Timestamp};
use dedup_db::models::message::NewMessage;
use dedup_db::repositories::MessageRepo;
use dedup_db::DbPool;
use dedup_telegram::{BotApi, TelegramError, Update};
use tokio::sync::Mutex;

use crate::config::DetectionConfig;
use crate::error::BotError;

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Sends replies back to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn reply(&self, chat_id: ChatId, reply_to: i64, text: &str) -> Result<(), TelegramError>;
}

#[async_trait]
impl Notifier for BotApi {
    async fn reply(&self, chat_id: ChatId, reply_to: i64, text: &str) -> Result<(), TelegramError> {
        self.send_message(chat_id, text, Some(reply_to)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why an update was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoMessage,
    NoText,
    Command,
    NoSender,
    TooShort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    Ignored(IgnoreReason),
    /// First sighting inside the window; the message was stored.
    Recorded,
    /// Seen before inside the window; a notice was sent.
    Duplicate(DuplicateNotice),
}

// ---------------------------------------------------------------------------
// MessageHandler
// ---------------------------------------------------------------------------

pub struct MessageHandler {
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    detection: DetectionConfig,
    /// Held across lookup and insert so concurrent webhook deliveries of
    /// the same text cannot both be recorded.
    detect_lock: Mutex<()>,
}

impl MessageHandler {
    pub fn new(pool: DbPool, notifier: Arc<dyn Notifier>, detection: DetectionConfig) -> Self {
        Self {
            pool,
            notifier,
            detection,
            detect_lock: Mutex::new(()),
        }
    }

    /// Process one update at the current time.
    pub async fn handle_update(&self, update: &Update) -> Result<HandleOutcome, BotError> {
        let now = Utc::now().naive_utc().trunc_subsecs(0);
        self.handle_update_at(update, now).await
    }

    /// Process one update as if it arrived at `now` (UTC).
    pub async fn handle_update_at(
        &self,
        update: &Update,
        now: Timestamp,
    ) -> Result<HandleOutcome, BotError> {
        let Some(message) = &update.message else {
            return Ok(HandleOutcome::Ignored(IgnoreReason::NoMessage));
        };
        let Some(text) = &message.text else {
            return Ok(HandleOutcome::Ignored(IgnoreReason::NoText));
        };
        if message.is_command() {
            return Ok(HandleOutcome::Ignored(IgnoreReason::Command));
        }
        let Some(sender) = &message.from else {
            return Ok(HandleOutcome::Ignored(IgnoreReason::NoSender));
        };
        if !duplicate_detection::is_eligible(text, self.detection.min_chars) {
            return Ok(HandleOutcome::Ignored(IgnoreReason::TooShort));
        }

        let chat_id = message.chat.id;
        let user_name = duplicate_detection::display_name(&sender.first_name, sender.id);
        let hash = message_hash(text);
        let since = duplicate_detection::window_cutoff(now, self.detection.window_hours);

        let guard = self.detect_lock.lock().await;
        let existing = MessageRepo::find_recent(&self.pool, chat_id, &hash, since).await?;
        if let Some(existing) = existing {
            drop(guard);
            let notice = DuplicateNotice {
                original_text: existing.message_text,
                original_user_name: existing.user_name,
                original_time: existing.timestamp,
                current_user_name: user_name,
                current_time: now,
            };

            self.notifier
                .reply(
                    chat_id,
                    message.message_id,
                    &notice.render(&self.detection.display_offset),
                )
                .await?;

            tracing::info!(chat_id, message_id = message.message_id, "Duplicate detected");
            return Ok(HandleOutcome::Duplicate(notice));
        }

        MessageRepo::upsert(
            &self.pool,
            &NewMessage {
                chat_id,
                message_hash: hash,
                message_text: text.clone(),
                user_id: sender.id,
                timestamp: now,
                user_name,
            },
        )
        .await?;
        drop(guard);

        tracing::debug!(chat_id, message_id = message.message_id, "Message recorded");
        Ok(HandleOutcome::Recorded)
    }

    /// Process an update, logging instead of returning failures.
    pub async fn dispatch(&self, update: &Update) {
        match self.handle_update(update).await {
            Ok(HandleOutcome::Ignored(reason)) => {
                tracing::trace!(update_id = update.update_id, ?reason, "Update ignored");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(update_id = update.update_id, error = %e, "Error handling message");
            }
        }
    }
}
