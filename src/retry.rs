//! Timeout and bounded retry for calls to external services.

use crate::config::NetworkSettings;
use crate::error::{MultitoolError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How external calls are bounded and retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&NetworkSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &NetworkSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            multiplier: settings.backoff_multiplier,
        }
    }

    /// A policy that times out but never retries.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_backoff
            .mul_f64(self.multiplier.powi(exponent))
            .min(self.max_backoff)
    }

    /// Run `op`, bounding every attempt by the timeout and retrying
    /// retryable failures with exponential backoff.
    pub async fn run<T, F, Fut>(&self, service: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(MultitoolError::Timeout {
                    service: service.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        "{} call failed (attempt {}), retrying in {:?}: {}",
                        service, attempt, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
