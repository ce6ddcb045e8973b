//! Tracked message models.
//!
//! Maps to the `messages` table created by [`crate::run_migrations`].

use dedup_core::types::{ChatId, Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageRecord {
    pub chat_id: ChatId,
    pub message_hash: String,
    pub message_text: String,
    pub user_id: UserId,
    /// When the message was recorded (UTC).
    pub timestamp: Timestamp,
    pub user_name: String,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for recording a new message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub message_hash: String,
    pub message_text: String,
    pub user_id: UserId,
    pub timestamp: Timestamp,
    pub user_name: String,
}
