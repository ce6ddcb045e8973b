//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`. All tasks accept a [`CancellationToken`]
//! for graceful shutdown.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod retention;

use std::time::Duration;

use tokio::task::JoinHandle;

/// Wait up to `timeout` for a cancelled background task to finish.
///
/// Returns `true` when the task ended normally. A panic or a task still
/// running at the deadline is logged and returns `false`.
pub async fn drain(name: &'static str, handle: JoinHandle<()>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(task = name, error = %e, "Background task panicked");
            false
        }
        Err(_) => {
            tracing::warn!(task = name, "Background task did not stop in time");
            false
        }
    }
}
