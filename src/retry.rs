//! Bounded exponential-backoff retry
//!
//! Every network-touching check wraps its fetches in `retry`. The retrier
//! does not look at error kinds: any `Err` is retried until the attempt
//! budget is spent, then the last error is returned unchanged.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::thread;
use std::time::Duration;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first (default: 3)
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each time (default: 1000)
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
        }
    }

    /// Backoff before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(32);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `label` only feeds the log line emitted before each backoff.
pub fn retry<T, E, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "{}: attempt {} failed ({}), retrying in {}ms",
                    label,
                    attempt,
                    err,
                    delay.as_millis()
                );
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}
