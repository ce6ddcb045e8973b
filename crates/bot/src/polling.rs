//! Long-polling update source.
//!
//! Removes any registered webhook (dropping pending updates), then loops on
//! `getUpdates`, dispatching each update in arrival order. Transient
//! failures back off exponentially; a rejected token ends the loop.

use std::sync::Arc;
use std::time::Duration;

use dedup_telegram::backoff::{Backoff, BackoffConfig};
use dedup_telegram::{BotApi, TelegramError};
use tokio_util::sync::CancellationToken;

use crate::handler::MessageHandler;

pub struct Poller {
    api: BotApi,
    handler: Arc<MessageHandler>,
    timeout_secs: u64,
    backoff: BackoffConfig,
}

impl Poller {
    pub fn new(api: BotApi, handler: Arc<MessageHandler>, timeout_secs: u64) -> Self {
        Self {
            api,
            handler,
            timeout_secs,
            backoff: BackoffConfig::default(),
        }
    }

    /// Override the retry strategy.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until `cancel` fires.
    ///
    /// Returns an error only when Telegram rejects the token.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), TelegramError> {
        let mut backoff = Backoff::new(self.backoff.clone());

        // Switch the bot to getUpdates, discarding updates queued while down.
        loop {
            match self.api.delete_webhook(true).await {
                Ok(_) => break,
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => {
                    let delay = backoff.fail(e.retry_after());
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "deleteWebhook failed, retrying"
                    );
                    if !sleep_or_cancel(delay, &cancel).await {
                        return Ok(());
                    }
                }
            }
        }
        backoff.reset();

        tracing::info!(timeout_secs = self.timeout_secs, "Starting bot with polling");

        let mut offset: Option<i64> = None;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.api.get_updates(offset, self.timeout_secs) => result,
            };

            match result {
                Ok(updates) => {
                    if backoff.failures() > 0 {
                        tracing::info!(failures = backoff.failures(), "Polling recovered");
                    }
                    backoff.reset();

                    for update in &updates {
                        offset = Some(update.update_id + 1);
                        self.handler.dispatch(update).await;
                    }
                }
                Err(e) if e.is_unauthorized() => {
                    tracing::error!(error = %e, "Bot token rejected, stopping polling");
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.fail(e.retry_after());
                    tracing::warn!(
                        error = %e,
                        attempt = backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        "getUpdates failed, backing off"
                    );
                    if !sleep_or_cancel(delay, &cancel).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Polling stopped");
        Ok(())
    }
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
