//! Retry with exponential back-off for idempotent async operations.
//!
//! [`retry`] runs an operation until it succeeds, the caller's classifier
//! declares the error fatal, or the attempt budget is spent. The sleep before
//! attempt `n + 1` is `delay * backoff_multiplier^(n - 1)`, capped at 60 s.
//!
//! Only wrap idempotent reads: a retried write may be applied twice.

use std::future::Future;
use std::time::Duration;

const MAX_DELAY: Duration = Duration::from_secs(60);

const TRANSIENT_KEYWORDS: &[&str] = &["network", "fetch", "timeout", "timed out", "connection"];
const TRANSIENT_STATUS_CODES: &[&str] = &["429", "500", "502", "503", "504"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1_000),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration, backoff_multiplier: u32) -> Self {
        Self {
            max_attempts,
            delay,
            backoff_multiplier,
        }
    }

    /// A policy that never sleeps; used by tests and latency-critical callers.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1)
    }

    /// Sleep applied after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.backoff_multiplier.max(1).saturating_pow(exponent);
        self.delay.saturating_mul(factor).min(MAX_DELAY)
    }
}

/// Terminal failure of a retried operation: the last error and how many
/// attempts were made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.error, self.attempts)
    }
}

impl<E> std::error::Error for RetryFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Default classifier for API-style errors.
///
/// Transient: messages mentioning network/fetch/timeout/connection failures or
/// carrying a 429, 500, 502, 503 or 504 status. Everything else (validation
/// errors, 400s, malformed payloads) is fatal.
#[must_use]
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    if TRANSIENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_ascii_digit())
        .any(|run| TRANSIENT_STATUS_CODES.contains(&run))
}

/// Runs `operation` under `policy`, retrying while `should_retry` accepts the error.
///
/// # Errors
///
/// Returns [`RetryFailure`] with the last error when the error is fatal or the
/// attempt budget is exhausted.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts || !should_retry(&error) {
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
