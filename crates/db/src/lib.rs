//! Storage for tracked messages.
//!
//! The bot runs against PostgreSQL when a database URL is configured and
//! falls back to a local SQLite file otherwise. [`DbPool`] hides which
//! backend is in use; repositories dispatch on it.

use std::path::PathBuf;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};

pub mod models;
pub mod repositories;

/// Format used for SQLite `DATETIME` text values. Matches SQLite's own
/// `datetime()` output so string comparison orders chronologically.
pub const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where to store messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// PostgreSQL connection URL.
    Postgres { url: String },
    /// SQLite database file, created if missing.
    Sqlite { path: PathBuf },
}

impl DbTarget {
    pub fn backend(&self) -> DbBackend {
        match self {
            DbTarget::Postgres { .. } => DbBackend::Postgres,
            DbTarget::Sqlite { .. } => DbBackend::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Postgres,
    Sqlite,
}

impl DbBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbBackend::Postgres => "postgresql",
            DbBackend::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for DbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pool for whichever backend is configured.
///
/// Cheaply cloneable; both variants are reference-counted pools.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    pub fn backend(&self) -> DbBackend {
        match self {
            DbPool::Postgres(_) => DbBackend::Postgres,
            DbPool::Sqlite(_) => DbBackend::Sqlite,
        }
    }

    /// Close every connection in the pool, waiting for checked-out ones.
    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Create a connection pool for the given target.
pub async fn create_pool(target: &DbTarget) -> Result<DbPool, sqlx::Error> {
    match target {
        DbTarget::Postgres { url } => {
            tracing::info!("Connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await?;
            Ok(DbPool::Postgres(pool))
        }
        DbTarget::Sqlite { path } => {
            tracing::info!(path = %path.display(), "Connecting to SQLite");
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5));
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;
            Ok(DbPool::Sqlite(pool))
        }
    }
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    match pool {
        DbPool::Postgres(pool) => {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        DbPool::Sqlite(pool) => {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const PG_CREATE_MESSAGES: &str = "\
    CREATE TABLE IF NOT EXISTS messages (
        id SERIAL PRIMARY KEY,
        chat_id BIGINT,
        message_hash TEXT,
        message_text TEXT,
        user_id BIGINT,
        timestamp TIMESTAMP,
        user_name TEXT DEFAULT 'Unknown',
        UNIQUE(chat_id, message_hash)
    )";

const PG_ADD_USER_NAME: &str =
    "ALTER TABLE messages ADD COLUMN IF NOT EXISTS user_name TEXT DEFAULT 'Unknown'";

const SQLITE_CREATE_MESSAGES: &str = "\
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER,
        message_hash TEXT,
        message_text TEXT,
        user_id INTEGER,
        timestamp DATETIME,
        user_name TEXT DEFAULT 'Unknown',
        UNIQUE(chat_id, message_hash)
    )";

const SQLITE_HAS_USER_NAME: &str =
    "SELECT COUNT(*) FROM pragma_table_info('messages') WHERE name = 'user_name'";

const SQLITE_ADD_USER_NAME: &str =
    "ALTER TABLE messages ADD COLUMN user_name TEXT DEFAULT 'Unknown'";

const CREATE_TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp)";

/// Create the `messages` table if needed and bring older tables up to date.
///
/// Idempotent: safe to run on every start, including against databases
/// created before the `user_name` column existed.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    match pool {
        DbPool::Postgres(pool) => {
            sqlx::query(PG_CREATE_MESSAGES).execute(pool).await?;
            sqlx::query(PG_ADD_USER_NAME).execute(pool).await?;
            sqlx::query(CREATE_TIMESTAMP_INDEX).execute(pool).await?;
        }
        DbPool::Sqlite(pool) => {
            sqlx::query(SQLITE_CREATE_MESSAGES).execute(pool).await?;

            let (has_user_name,): (i64,) = sqlx::query_as(SQLITE_HAS_USER_NAME)
                .fetch_one(pool)
                .await?;
            if has_user_name == 0 {
                tracing::info!("Adding user_name column to legacy messages table");
                sqlx::query(SQLITE_ADD_USER_NAME).execute(pool).await?;
            }

            sqlx::query(CREATE_TIMESTAMP_INDEX).execute(pool).await?;
        }
    }

    tracing::info!(backend = %pool.backend(), "Database schema ready");
    Ok(())
}
