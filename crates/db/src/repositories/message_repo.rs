//! Repository for the `messages` table.

use dedup_core::types::{ChatId, Timestamp};

use crate::models::message::{MessageRecord, NewMessage};
use crate::{DbPool, SQLITE_TIMESTAMP_FORMAT};

/// Column list shared across queries to avoid repetition.
///
/// `user_name` is coalesced because rows written before the column existed
/// may hold NULL.
const COLUMNS: &str = "\
    chat_id, message_hash, message_text, user_id, timestamp, \
    COALESCE(user_name, 'Unknown') AS user_name";

/// SQLite stores timestamps as text; bind them in the same layout SQLite
/// itself uses so comparisons stay chronological.
fn sqlite_timestamp(ts: Timestamp) -> String {
    ts.format(SQLITE_TIMESTAMP_FORMAT).to_string()
}

/// Provides the queries used by duplicate detection and retention.
pub struct MessageRepo;

impl MessageRepo {
    /// Find a message with the same hash in the same chat recorded after
    /// `since`. At most one row exists per (chat, hash).
    pub async fn find_recent(
        pool: &DbPool,
        chat_id: ChatId,
        message_hash: &str,
        since: Timestamp,
    ) -> Result<Option<MessageRecord>, sqlx::Error> {
        match pool {
            DbPool::Postgres(pool) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM messages
                     WHERE chat_id = $1 AND message_hash = $2 AND timestamp > $3
                     LIMIT 1"
                );
                sqlx::query_as::<_, MessageRecord>(&query)
                    .bind(chat_id)
                    .bind(message_hash)
                    .bind(since)
                    .fetch_optional(pool)
                    .await
            }
            DbPool::Sqlite(pool) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM messages
                     WHERE chat_id = ? AND message_hash = ? AND timestamp > ?
                     LIMIT 1"
                );
                sqlx::query_as::<_, MessageRecord>(&query)
                    .bind(chat_id)
                    .bind(message_hash)
                    .bind(sqlite_timestamp(since))
                    .fetch_optional(pool)
                    .await
            }
        }
    }

    /// Record a message, replacing any older row with the same chat and
    /// hash.
    ///
    /// Callers only insert after [`find_recent`](Self::find_recent) came back
    /// empty, so a conflicting row is outside the duplicate window and is
    /// overwritten to start a new window.
    pub async fn upsert(pool: &DbPool, body: &NewMessage) -> Result<(), sqlx::Error> {
        match pool {
            DbPool::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO messages
                        (chat_id, message_hash, message_text, user_id, timestamp, user_name)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (chat_id, message_hash) DO UPDATE SET
                        message_text = EXCLUDED.message_text,
                        user_id      = EXCLUDED.user_id,
                        timestamp    = EXCLUDED.timestamp,
                        user_name    = EXCLUDED.user_name",
                )
                .bind(body.chat_id)
                .bind(&body.message_hash)
                .bind(&body.message_text)
                .bind(body.user_id)
                .bind(body.timestamp)
                .bind(&body.user_name)
                .execute(pool)
                .await?;
            }
            DbPool::Sqlite(pool) => {
                sqlx::query(
                    "INSERT INTO messages
                        (chat_id, message_hash, message_text, user_id, timestamp, user_name)
                     VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT (chat_id, message_hash) DO UPDATE SET
                        message_text = excluded.message_text,
                        user_id      = excluded.user_id,
                        timestamp    = excluded.timestamp,
                        user_name    = excluded.user_name",
                )
                .bind(body.chat_id)
                .bind(&body.message_hash)
                .bind(&body.message_text)
                .bind(body.user_id)
                .bind(sqlite_timestamp(body.timestamp))
                .bind(&body.user_name)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Delete messages recorded before `cutoff`. Returns the number of
    /// rows removed.
    pub async fn delete_older_than(pool: &DbPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = match pool {
            DbPool::Postgres(pool) => {
                sqlx::query("DELETE FROM messages WHERE timestamp < $1")
                    .bind(cutoff)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
            DbPool::Sqlite(pool) => {
                sqlx::query("DELETE FROM messages WHERE timestamp < ?")
                    .bind(sqlite_timestamp(cutoff))
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
        };
        Ok(result)
    }

    /// Count tracked messages in a chat.
    pub async fn count_by_chat(pool: &DbPool, chat_id: ChatId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = match pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
                    .bind(chat_id)
                    .fetch_one(pool)
                    .await?
            }
            DbPool::Sqlite(pool) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
                    .bind(chat_id)
                    .fetch_one(pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Count all tracked messages.
    pub async fn count_all(pool: &DbPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = match pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages")
                    .fetch_one(pool)
                    .await?
            }
            DbPool::Sqlite(pool) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages")
                    .fetch_one(pool)
                    .await?
            }
        };
        Ok(count)
    }
}
