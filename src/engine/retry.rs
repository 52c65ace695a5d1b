//! Retry budget and backoff schedule

use crate::config::SubmissionConfig;
use std::time::Duration;

/// How often and how patiently a retryable submission is repeated
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,
    /// Wait after the first failed attempt
    pub initial: Duration,
    /// Growth factor between consecutive waits
    pub multiplier: f64,
    /// Upper bound for a computed wait
    pub max: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failed attempt (1-based)
    ///
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Backoff for `attempt`, raised to the server's `Retry-After` if longer
    ///
    /// The result never exceeds `max`, whatever the server asks for.
    pub fn wait_before_retry(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff(attempt);
        match retry_after {
            Some(server) if server > backoff => server.min(self.max),
            _ => backoff,
        }
    }
}

impl From<&SubmissionConfig> for RetryPolicy {
    fn from(config: &SubmissionConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            initial: config.initial_backoff(),
            multiplier: config.backoff_multiplier,
            max: config.max_backoff(),
        }
    }
}
