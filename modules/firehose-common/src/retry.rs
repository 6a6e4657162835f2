// Exponential backoff shared by every external call site that retries.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry. Doubles per attempt.
    pub base: Duration,
    pub max_delay: Duration,
    /// Total attempts including the first. 0 is treated as 1.
    pub max_attempts: u32,
    /// Upper bound of the random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_attempts: 3,
            jitter: Duration::from_millis(100),
        }
    }
}

impl BackoffPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Delay after the `attempt`-th consecutive failure (0-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if self.jitter.is_zero() {
            return delay;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Run `op` until it succeeds, fails with an error `retry_if` rejects, or
/// the attempt budget runs out. The last error is returned unchanged.
pub async fn with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    op_name: &str,
    mut op: F,
    retry_if: impl Fn(&PipelineError) -> bool,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < max_attempts && retry_if(&e) => {
                let delay = policy.jittered_delay_for(attempt);
                attempt += 1;
                warn!(op = op_name, attempt, ?delay, error = %e, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
