/// Telegram chat identifier (groups are negative).
pub type ChatId = i64;

/// Telegram user identifier.
pub type UserId = i64;

/// Stored timestamps are naive UTC wall-clock values, matching the
/// `TIMESTAMP`/`DATETIME` columns of both backends.
pub type Timestamp = chrono::NaiveDateTime;
