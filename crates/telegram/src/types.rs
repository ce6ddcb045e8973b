//! Bot API objects, limited to the fields the bot reads.
//!
//! Unknown fields are ignored by serde, so full Telegram payloads
//! deserialize cleanly.

use serde::{Deserialize, Serialize};

/// Entity type Telegram uses for `/command` tokens.
pub const ENTITY_BOT_COMMAND: &str = "bot_command";

/// An incoming update.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    /// New incoming message. Edited messages and channel posts arrive in
    /// other fields and are ignored.
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Sender; absent for messages sent on behalf of a chat.
    #[serde(default)]
    pub from: Option<User>,
    /// Unix time the message was sent.
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// Whether the message starts with a bot command (`/start`, `/help@bot`).
    pub fn is_command(&self) -> bool {
        self.entities
            .first()
            .is_some_and(|e| e.kind == ENTITY_BOT_COMMAND && e.offset == 0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

// ---------------------------------------------------------------------------
// API envelope
// ---------------------------------------------------------------------------

/// Every Bot API response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i32>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

/// Extra error details (flood control, group migration).
#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after a 429.
    #[serde(default)]
    pub retry_after: Option<u64>,
}
