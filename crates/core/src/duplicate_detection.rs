//! Duplicate message detection rules and reply formatting.
//!
//! Pure domain logic: eligibility checks, time-window arithmetic, and the
//! notice sent back to the chat when a repeated text is found. No database
//! or network access.

use chrono::{Duration, FixedOffset, TimeZone};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{Timestamp, UserId};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Messages shorter than this (after trimming) are never tracked.
pub const MIN_MESSAGE_CHARS: usize = 5;

/// A repeated text is flagged if the first copy is younger than this.
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;

/// Stored messages older than this are purged.
pub const RETENTION_DAYS: i64 = 7;

/// Reply timestamps are shown in Asia/Jakarta time (UTC+7, no DST).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Largest offset any real time zone uses.
pub const MAX_UTC_OFFSET_HOURS: i32 = 14;

/// Format used for both timestamps in the duplicate notice.
pub const NOTICE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Whether a text is long enough to be tracked.
///
/// Length is counted in characters of the trimmed text, so a phone number
/// such as `08123` qualifies while `ok` does not.
pub fn is_eligible(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() >= min_chars
}

/// Name shown for a sender: the first name, or the numeric id when the
/// first name is empty.
pub fn display_name(first_name: &str, user_id: UserId) -> String {
    if first_name.is_empty() {
        user_id.to_string()
    } else {
        first_name.to_string()
    }
}

/// Oldest timestamp still inside the duplicate window.
pub fn window_cutoff(now: Timestamp, window_hours: i64) -> Timestamp {
    now - Duration::hours(window_hours)
}

/// Timestamp before which stored messages are purged.
pub fn retention_cutoff(now: Timestamp, retention_days: i64) -> Timestamp {
    now - Duration::days(retention_days)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub fn validate_window_hours(hours: i64) -> Result<(), CoreError> {
    if hours <= 0 {
        return Err(CoreError::Validation(format!(
            "Duplicate window must be positive, got {hours} hours"
        )));
    }
    Ok(())
}

/// Retention must cover at least the duplicate window, otherwise records
/// would be purged while still able to match.
pub fn validate_retention(retention_days: i64, window_hours: i64) -> Result<(), CoreError> {
    if retention_days <= 0 {
        return Err(CoreError::Validation(format!(
            "Retention must be positive, got {retention_days} days"
        )));
    }
    if retention_days * 24 < window_hours {
        return Err(CoreError::Validation(format!(
            "Retention of {retention_days} days is shorter than the {window_hours} hour duplicate window"
        )));
    }
    Ok(())
}

pub fn validate_min_chars(min_chars: usize) -> Result<(), CoreError> {
    if min_chars == 0 {
        return Err(CoreError::Validation(
            "Minimum message length must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Build the display offset for notice timestamps.
pub fn display_offset(hours: i32) -> Result<FixedOffset, CoreError> {
    if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&hours) {
        return Err(CoreError::Validation(format!(
            "UTC offset must be between -{MAX_UTC_OFFSET_HOURS} and {MAX_UTC_OFFSET_HOURS} hours, got {hours}"
        )));
    }
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| CoreError::Validation(format!("Invalid UTC offset: {hours} hours")))
}

// ---------------------------------------------------------------------------
// Duplicate notice
// ---------------------------------------------------------------------------

/// Everything needed to tell a chat that a text was already posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateNotice {
    pub original_text: String,
    pub original_user_name: String,
    /// When the first copy was recorded (UTC).
    pub original_time: Timestamp,
    pub current_user_name: String,
    /// When the repeat arrived (UTC).
    pub current_time: Timestamp,
}

impl DuplicateNotice {
    /// Render the reply text, showing both times in `offset`.
    pub fn render(&self, offset: &FixedOffset) -> String {
        let original = offset
            .from_utc_datetime(&self.original_time)
            .format(NOTICE_TIME_FORMAT);
        let current = offset
            .from_utc_datetime(&self.current_time)
            .format(NOTICE_TIME_FORMAT);

        format!(
            "❌Nomor sudah pernah bergabung❌\n\
             Nomor yang terdeteksi: {}\n\
             {} : {original} (pertama kali)\n\
             {} : {current} (kali ini)",
            self.original_text, self.original_user_name, self.current_user_name,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
