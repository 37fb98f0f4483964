//! Retry policy for document-store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// delay * 2^attempt
    Exponential,
    /// delay * (attempt + 1)
    Linear,
}

/// How many times, and how far apart, to retry a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes a single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt + 1`.
    pub fn wait_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential => self.delay.saturating_mul(2u32.saturating_pow(attempt)),
            Backoff::Linear => self.delay.saturating_mul(attempt.saturating_add(1)),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// retries are exhausted. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let wait = self.wait_for(attempt);
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what,
                        err,
                        attempt + 1,
                        self.max_retries,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 0 {
                        warn!("{} failed after {} attempts: {}", what, attempt + 1, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}
