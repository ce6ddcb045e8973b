//! Exponential backoff for retrying failed Bot API calls.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Tracks consecutive failures of a retried operation.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.initial_delay;
        Self {
            config,
            current,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// A server-supplied `retry_after` wins over the computed delay.
    pub fn fail(&mut self, retry_after: Option<Duration>) -> Duration {
        self.failures += 1;
        let delay = retry_after.unwrap_or(self.current);
        self.current = next_delay(self.current, &self.config);
        delay
    }

    /// Record a success, resetting the delay.
    pub fn reset(&mut self) {
        self.current = self.config.initial_delay;
        self.failures = 0;
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
