use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;
use dedup_core::duplicate_detection::{
    self, DEFAULT_UTC_OFFSET_HOURS, DUPLICATE_WINDOW_HOURS, MIN_MESSAGE_CHARS, RETENTION_DAYS,
};
use dedup_core::error::CoreError;
use dedup_core::hashing::sha256_hex;
use dedup_db::DbTarget;
use dedup_telegram::api::DEFAULT_API_URL;

/// Default bind port, matching the port the container exposes.
pub const DEFAULT_PORT: u16 = 7860;

/// Default SQLite database file when no `DATABASE_URL` is given.
pub const DEFAULT_DB_PATH: &str = "messages.db";

/// Length of the webhook secret derived from the bot token.
const DERIVED_SECRET_LEN: usize = 32;

/// Telegram accepts 1-256 characters from `A-Z a-z 0-9 _ -`.
const MAX_SECRET_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7860`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

/// How updates reach the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMode {
    /// Long polling with `getUpdates`.
    Polling,
    /// Telegram pushes updates to `{url}/{token}`.
    Webhook { url: String, secret: String },
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Polling => "polling",
            UpdateMode::Webhook { .. } => "webhook",
        }
    }
}

/// Duplicate detection tuning.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub window_hours: i64,
    pub retention_days: i64,
    pub min_chars: usize,
    /// Time zone used for timestamps in duplicate notices.
    pub display_offset: FixedOffset,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_hours: DUPLICATE_WINDOW_HOURS,
            retention_days: RETENTION_DAYS,
            min_chars: MIN_MESSAGE_CHARS,
            display_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .expect("default UTC offset is in range"),
        }
    }
}

// ---------------------------------------------------------------------------
// BotConfig
// ---------------------------------------------------------------------------

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot API token.
    pub token: String,
    /// Base URL of the Bot API server.
    pub telegram_api_url: String,
    pub database: DbTarget,
    pub server: ServerConfig,
    pub mode: UpdateMode,
    pub detection: DetectionConfig,
    /// Seconds between retention purges (default: `3600`).
    pub retention_interval_secs: u64,
    /// Long-poll timeout passed to `getUpdates` (default: `30`).
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `BOT_TOKEN`                | required                   |
    /// | `TELEGRAM_API_URL`         | `https://api.telegram.org` |
    /// | `DATABASE_URL`             | unset (use SQLite)         |
    /// | `DB_PATH`                  | `messages.db`              |
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `7860`                     |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `USE_WEBHOOK`              | `false`                    |
    /// | `WEBHOOK_URL`              | unset (poll instead)       |
    /// | `WEBHOOK_SECRET`           | derived from the token     |
    /// | `DUPLICATE_WINDOW_HOURS`   | `24`                       |
    /// | `RETENTION_DAYS`           | `7`                        |
    /// | `MIN_MESSAGE_CHARS`        | `5`                        |
    /// | `DISPLAY_UTC_OFFSET_HOURS` | `7`                        |
    /// | `RETENTION_INTERVAL_SECS`  | `3600`                     |
    /// | `POLL_TIMEOUT_SECS`        | `30`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let telegram_api_url =
            get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let database = match get("DATABASE_URL") {
            Some(url) => DbTarget::Postgres { url },
            None => DbTarget::Sqlite {
                path: PathBuf::from(get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into())),
            },
        };

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            request_timeout_secs: parse_or(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                30,
            )?,
        };

        let mode = Self::update_mode(
            &token,
            get("USE_WEBHOOK"),
            get("WEBHOOK_URL"),
            get("WEBHOOK_SECRET"),
        )?;

        let window_hours = parse_or(
            "DUPLICATE_WINDOW_HOURS",
            get("DUPLICATE_WINDOW_HOURS"),
            DUPLICATE_WINDOW_HOURS,
        )?;
        let retention_days = parse_or("RETENTION_DAYS", get("RETENTION_DAYS"), RETENTION_DAYS)?;
        let min_chars = parse_or("MIN_MESSAGE_CHARS", get("MIN_MESSAGE_CHARS"), MIN_MESSAGE_CHARS)?;
        let offset_hours = parse_or(
            "DISPLAY_UTC_OFFSET_HOURS",
            get("DISPLAY_UTC_OFFSET_HOURS"),
            DEFAULT_UTC_OFFSET_HOURS,
        )?;

        duplicate_detection::validate_window_hours(window_hours)?;
        duplicate_detection::validate_retention(retention_days, window_hours)?;
        duplicate_detection::validate_min_chars(min_chars)?;
        let display_offset = duplicate_detection::display_offset(offset_hours)?;

        let retention_interval_secs: u64 =
            parse_or("RETENTION_INTERVAL_SECS", get("RETENTION_INTERVAL_SECS"), 3600)?;
        if retention_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RETENTION_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }

        let poll_timeout_secs = parse_or("POLL_TIMEOUT_SECS", get("POLL_TIMEOUT_SECS"), 30)?;

        Ok(Self {
            token,
            telegram_api_url,
            database,
            server,
            mode,
            detection: DetectionConfig {
                window_hours,
                retention_days,
                min_chars,
                display_offset,
            },
            retention_interval_secs,
            poll_timeout_secs,
        })
    }

    /// Webhook mode needs both `USE_WEBHOOK=true` and a `WEBHOOK_URL`;
    /// without the URL the bot falls back to polling.
    fn update_mode(
        token: &str,
        use_webhook: Option<String>,
        webhook_url: Option<String>,
        webhook_secret: Option<String>,
    ) -> Result<UpdateMode, ConfigError> {
        let wants_webhook = use_webhook.is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if !wants_webhook {
            return Ok(UpdateMode::Polling);
        }

        let Some(url) = webhook_url else {
            tracing::warn!("WEBHOOK_URL not set, falling back to polling");
            return Ok(UpdateMode::Polling);
        };

        let secret = match webhook_secret {
            Some(secret) => {
                validate_secret(&secret)?;
                secret
            }
            None => derive_secret(token),
        };

        Ok(UpdateMode::Webhook {
            url: url.trim_end_matches('/').to_string(),
            secret,
        })
    }

    /// Full URL Telegram should deliver webhook updates to.
    pub fn webhook_endpoint(&self) -> Option<String> {
        match &self.mode {
            UpdateMode::Webhook { url, .. } => Some(format!("{url}/{}", self.token)),
            UpdateMode::Polling => None,
        }
    }
}

/// Deterministic secret so restarts keep the same webhook registration.
fn derive_secret(token: &str) -> String {
    let mut secret = sha256_hex(token.as_bytes());
    secret.truncate(DERIVED_SECRET_LEN);
    secret
}

fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    let valid_chars = secret
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if secret.len() > MAX_SECRET_LEN || !valid_chars {
        return Err(ConfigError::Invalid {
            var: "WEBHOOK_SECRET",
            value: "<redacted>".into(),
            reason: "must be 1-256 characters of A-Z, a-z, 0-9, _ or -".into(),
        });
    }
    Ok(())
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
