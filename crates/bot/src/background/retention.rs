//! Periodic purge of old tracked messages.
//!
//! Deletes rows from `messages` older than the configured retention period
//! on a fixed interval using `tokio::time::interval`. The first purge runs
//! immediately at startup.

use std::time::Duration;

use chrono::Utc;
use dedup_core::duplicate_detection;
use dedup_db::repositories::MessageRepo;
use dedup_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Delete messages older than `retention_days` once.
///
/// Returns the number of rows removed.
pub async fn purge_once(pool: &DbPool, retention_days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = duplicate_detection::retention_cutoff(Utc::now().naive_utc(), retention_days);
    MessageRepo::delete_older_than(pool, cutoff).await
}

/// Run the retention cleanup loop until `cancel` is triggered.
pub async fn run(pool: DbPool, retention_days: i64, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = interval.as_secs(),
        "Message retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Message retention job stopping");
                break;
            }
            _ = ticker.tick() => {
                match purge_once(&pool, retention_days).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Message retention: purged old rows");
                        } else {
                            tracing::debug!("Message retention: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Message retention: cleanup failed");
                    }
                }
            }
        }
    }
}
