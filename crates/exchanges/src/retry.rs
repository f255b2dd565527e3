//! Retry helpers shared by all adapters
//!
//! Adapters wrap their read paths in [`query_retry`] so a flaky venue turns
//! into a logged sentinel value instead of an error bubbling into strategy code.

use crate::errors::{ExchangeError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Exponential backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retries without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before retry number `attempt` (0 based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "🔁 {} attempt {}/{} failed: {}, retrying in {:?}",
                    operation,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                if !delay.is_zero() {
                    monoio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Like [`retry`], but logs the final error and hands back `default` instead.
pub async fn query_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, default: T, op: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match retry(policy, operation, op).await {
        Ok(value) => value,
        Err(e) => {
            log_query_failure(operation, &e);
            default
        }
    }
}

fn log_query_failure(operation: &str, err: &ExchangeError) {
    error!("❌ {} failed: {}, returning default", operation, err);
}
