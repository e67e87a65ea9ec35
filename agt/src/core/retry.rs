//! Exponential backoff for transient read failures.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::core::error::ClassifiedError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Retries only failures whose kind is transient (network, timeout,
/// connection refused). Anything else is returned after one attempt.
///
/// Never wrap a mutating call in this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is zero-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    pub fn with_retry<T>(
        &self,
        op: impl FnMut() -> Result<T, ClassifiedError>,
    ) -> Result<T, ClassifiedError> {
        self.run_with_sleeper(op, thread::sleep)
    }

    pub fn run_with_sleeper<T>(
        &self,
        mut op: impl FnMut() -> Result<T, ClassifiedError>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, ClassifiedError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if !err.kind().is_transient() || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        kind = %err.kind(),
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure; retrying"
                    );
                    sleep(delay);
                }
            }
        }
    }
}
