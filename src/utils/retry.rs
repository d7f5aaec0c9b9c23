//! Retry with exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; `0` is treated as `1`
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Sleep after the failed attempt with index `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// The error of the last attempt is returned as is.
pub async fn retry_request<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => {
                warn!("Attempt {}/{} failed, giving up: {}", attempt + 1, attempts, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                debug!("Retry attempt {}", attempt + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let start = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_in_op = Arc::clone(&seen);
        let result: Result<&str, String> = retry_request(&policy, move || {
            let seen = Arc::clone(&seen_in_op);
            async move {
                let mut seen = seen.lock().unwrap();
                seen.push(start.elapsed());
                if seen.len() < 3 {
                    Err(format!("failure {}", seen.len()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(300)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = Arc::new(Mutex::new(0u32));

        let calls_in_op = Arc::clone(&calls);
        let result: Result<(), String> = retry_request(&policy, move || {
            let calls = Arc::clone(&calls_in_op);
            async move {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                Err(format!("attempt {} failed", *calls))
            }
        })
        .await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let calls = Arc::new(Mutex::new(0u32));

        let calls_in_op = Arc::clone(&calls);
        let result: Result<(), &str> = retry_request(&policy, move || {
            let calls = Arc::clone(&calls_in_op);
            async move {
                *calls.lock().unwrap() += 1;
                Err("nope")
            }
        })
        .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_delay_for() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }
}
