//! Submission retry policy.
//!
//! A failed call is retried only when the failure is transient: the attempt
//! timed out, the connection failed, or the server answered 408, 502, 503 or
//! 504. Everything else, including every other 4xx, is returned at once.
//! Delays double from `base_delay`, so the defaults wait 2 s, 4 s, then 8 s.

use std::future::Future;
use std::time::Duration;

use crate::api_client::{ClientError, ClientResult};

/// Retry and timeout settings for API calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    ///
    /// `operation` receives the 1-based attempt number. Each attempt is cut
    /// off after `attempt_timeout` and reported as [`ClientError::Timeout`].
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> ClientResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut retry = 0;

        loop {
            let attempt = retry + 1;
            let result = match tokio::time::timeout(self.attempt_timeout, operation(attempt)).await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(self.attempt_timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    log::warn!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        what,
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    if retry > 0 {
                        log::error!("{} failed after {} attempts: {}", what, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
