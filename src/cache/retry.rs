use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::QueryKey;
use crate::config::CacheConfig;
use crate::error::{ClientError, Result};

/// Bounded retry with exponential backoff for cache reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        RetryPolicy {
            max_retries: config.retry,
            base_delay: Duration::from_millis(config.retry_base_delay_in_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_in_ms),
        }
    }

    pub fn with_max_retries(self, max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            ..self
        }
    }

    /// Authorization failures go through the refresh flow, never a blind
    /// retry; only transient failures are retried.
    pub fn should_retry(&self, failures: u32, error: &ClientError) -> bool {
        failures <= self.max_retries && !error.is_unauthorized() && error.is_transient()
    }

    /// Backoff before the retry following the `failures`-th failure.
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `fetcher` until it succeeds or the policy gives up.
pub async fn run_with_retry<T, F, Fut>(policy: RetryPolicy, key: &QueryKey, fetcher: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                failures += 1;
                if !policy.should_retry(failures, &e) {
                    return Err(e);
                }
                let delay = policy.delay(failures);
                debug!(
                    key = %key,
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying query"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
