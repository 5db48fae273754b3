//! Bounded, fixed-delay retry for single remote calls.
//!
//! The delay between attempts is constant: no jitter and no backoff growth.
//! The final failure is returned as-is so callers can classify it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Attempt budget and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Fixed pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// Sleeps `delay` after every failed attempt except the last, so an
    /// operation that always fails is delayed exactly `max_attempts - 1`
    /// times. The sleep yields to the scheduler.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the final attempt.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "remote call failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempts = max_attempts,
                        error = %e,
                        "remote call failed, attempts exhausted"
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Failure(u32);

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failure on attempt {}", self.0)
        }
    }

    /// Operation that fails until `succeed_on`, counting calls.
    fn flaky(
        calls: &Arc<AtomicU32>,
        succeed_on: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, Failure>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= succeed_on {
                std::future::ready(Ok("done"))
            } else {
                std::future::ready(Err(Failure(n)))
            }
        }
    }

    /// Asserts that exactly `n` delays elapsed in virtual time.
    fn assert_delays(start: Instant, n: u32, delay: Duration) {
        let elapsed = start.elapsed();
        assert!(elapsed >= delay * n, "expected {n} delays, elapsed {elapsed:?}");
        assert!(elapsed < delay * (n + 1), "expected {n} delays, elapsed {elapsed:?}");
    }

    #[test]
    fn default_policy_is_three_attempts_500ms() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_time_without_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryPolicy::default().run("op", flaky(&calls, 1)).await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryPolicy::default().run("op", flaky(&calls, 3)).await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_delays(start, 2, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error_after_budget_minus_one_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryPolicy::default().run("op", flaky(&calls, u32::MAX)).await;

        assert_eq!(result, Err(Failure(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_delays(start, 2, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_budget_and_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(200),
        };
        let start = Instant::now();

        let result = policy.run("op", flaky(&calls, u32::MAX)).await;

        assert_eq!(result, Err(Failure(5)));
        assert_delays(start, 4, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::from_secs(10),
        };

        let result = policy.run("op", flaky(&calls, u32::MAX)).await;

        assert_eq!(result, Err(Failure(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn works_with_async_closures_over_shared_state() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
        };

        let result: Result<u32, String> = policy
            .run("async-op", || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 2 {
                        Ok(n)
                    } else {
                        Err(format!("attempt {n}"))
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
    }
}
