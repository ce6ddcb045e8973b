//! Minimal Telegram Bot API client.
//!
//! Covers the handful of methods the bot needs: identity check, long
//! polling, webhook registration, and sending replies.

pub mod api;
pub mod backoff;
pub mod types;

pub use api::{BotApi, TelegramError};
pub use types::{Chat, Message, MessageEntity, Update, User};
