//! Exponential backoff for pact and broker fetches.
//!
//! URLs and brokers fail transiently far more often than local files do, so
//! the verifier wraps every remote fetch in a [`RetryPolicy`].

use crate::{PactError, PactResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff settings.
///
/// The delay doubles with each attempt, starting at `initial_delay` and
/// capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Longest delay between two attempts, before jitter
    pub max_delay: Duration,
    /// Add up to a quarter of the delay at random
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Set the number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Use exact delays.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Runs fallible async operations until they succeed, fail permanently or
/// run out of retries.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Policy for `config`.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Policy with [`RetryConfig::default`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Delay before retry number `attempt` (zero based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.config.initial_delay.saturating_mul(factor).min(self.config.max_delay);
        if !self.config.jitter {
            return delay;
        }
        let quarter = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
        delay.saturating_add(Duration::from_millis(rand::thread_rng().gen_range(0..=quarter)))
    }

    /// Whether a failure on `attempt` (zero based) is worth another try.
    #[must_use]
    pub fn should_retry(&self, error: &PactError, attempt: u32) -> bool {
        attempt < self.config.max_retries && error.is_retryable()
    }

    /// Run `operation`, retrying retryable failures. `what` names the
    /// operation in log events.
    ///
    /// # Errors
    ///
    /// Returns the first permanent error, or the last error once retries
    /// are exhausted.
    pub async fn execute<F, Fut, T>(&self, what: &str, mut operation: F) -> PactResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PactResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(what, attempt, ?delay, error = %error, "Retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Configured number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
