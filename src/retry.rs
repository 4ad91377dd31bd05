//! Retry policy shared by every outbound call that retries.
//!
//! A policy is `{max_attempts, backoff, timeout}`; the retryable predicate is
//! supplied per call site so the same policy can retry on different errors.

use std::{future::Future, time::Duration};

use tracing::warn;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * n` after the n-th failure.
    Linear(Duration),
    /// `base * 2^(n-1)` after the n-th failure.
    Exponential(Duration),
}

impl Backoff {
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Linear(base) => base.saturating_mul(failed_attempts),
            Backoff::Exponential(base) => {
                let shift = failed_attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Per-attempt timeout callers put on their request.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Facility page scrape: 3 attempts, 1s/2s linear backoff, 5s timeout.
    pub fn scrape() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear(Duration::from_secs(1)),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Identity provider userinfo: 3 attempts, exponential backoff, 5s timeout.
    pub fn identity() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential(Duration::from_millis(500)),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Runs `op` until it succeeds, the error is not retryable, or attempts
    /// run out. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < max && retryable(&e) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(error = %e, attempt, ?delay, "attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Backoff::Linear(Duration::from_millis(1)),
            timeout: None,
        }
    }

    #[test]
    fn linear_and_exponential_delays() {
        let linear = Backoff::Linear(Duration::from_secs(1));
        assert_eq!(linear.delay(1), Duration::from_secs(1));
        assert_eq!(linear.delay(2), Duration::from_secs(2));

        let exp = Backoff::Exponential(Duration::from_millis(500));
        assert_eq!(exp.delay(1), Duration::from_millis(500));
        assert_eq!(exp.delay(2), Duration::from_millis(1000));
        assert_eq!(exp.delay(3), Duration::from_millis(2000));

    }

    #[test]
    fn presets_match_call_sites() {
        let scrape = RetryPolicy::scrape();
        assert_eq!(scrape.max_attempts, 3);
        assert_eq!(scrape.timeout, Some(Duration::from_secs(5)));
        assert!(matches!(RetryPolicy::identity().backoff, Backoff::Exponential(_)));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let out: Result<u32, String> = quick(3)
            .run(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 {
                            Err(format!("fail {attempt}"))
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(out, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let out: Result<(), String> = quick(3)
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("down".to_string()) }
                },
                |_| true,
            )
            .await;
        assert_eq!(out, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let out: Result<(), u16> = quick(3)
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(401u16) }
                },
                |status| *status == 429,
            )
            .await;
        assert_eq!(out, Err(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
