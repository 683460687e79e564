//! Bounded retry loop with exponential backoff.
//!
//! Callers classify each attempt themselves (which statuses are retryable
//! and how long to wait); [`RetryPolicy::run`] owns the attempt counting,
//! the sleeping and the exhaustion bookkeeping.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Exponential backoff: `min(base * 2^attempt, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Delay before retrying after the zero-based `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Success(T),
    /// Transient failure: wait `delay`, then try again.
    Retry { error: E, delay: Duration },
    /// Not expected to be transient; stop immediately.
    Fail(E),
}

/// Why [`RetryPolicy::run`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-retryable failure.
    Fatal(E),
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Retry loop capped at `max_attempts` total attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Run `op` until it succeeds, fails fatally or attempts run out.
    ///
    /// `op` receives the zero-based attempt number. No sleep happens after
    /// the final attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        self.run_observed(label, op, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry` each time a retryable
    /// error is actually followed by another attempt.
    pub async fn run_observed<T, E, F, Fut, R>(
        &self,
        label: &str,
        mut op: F,
        mut on_retry: R,
    ) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
        R: FnMut(&E),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt).await {
                Attempt::Success(value) => return Ok(value),
                Attempt::Fail(error) => return Err(RetryError::Fatal(error)),
                Attempt::Retry { error, delay } => {
                    if attempt + 1 >= max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt + 1,
                            last: error,
                        });
                    }

                    on_retry(&error);
                    warn!(
                        operation = label,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{}, retrying",
                        error
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
