//! Per-client request limiting.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Windows are pruned once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: usize,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Decides whether a client may make another request.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, client_key: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter keyed by client identifier, held in process memory.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &svcdir_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, client_key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > PRUNE_THRESHOLD {
            let ttl = self.window;
            windows.retain(|_, w| now.duration_since(w.started_at) < ttl);
        }

        let window = windows.entry(client_key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        let reset_after = self.window.saturating_sub(now.duration_since(window.started_at));
        if window.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_after,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - window.count,
            reset_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn eleventh_request_in_window_is_rejected() {
        let limiter = InMemoryRateLimiter::new(10, Duration::from_secs(60));
        for i in 0..10 {
            let decision = limiter.check("10.0.0.1").await;
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.remaining, 9 - i);
        }
        let decision = limiter.check("10.0.0.1").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clients_are_limited_independently() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await.allowed);
        assert!(!limiter.check("a").await.allowed);
        assert!(limiter.check("b").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await.allowed);
        assert!(!limiter.check("a").await.allowed);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("a").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_windows_are_pruned() {
        let limiter = InMemoryRateLimiter::new(5, Duration::from_secs(1));
        for i in 0..=PRUNE_THRESHOLD {
            limiter.check(&format!("client-{i}")).await;
        }
        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.check("fresh").await;

        assert_eq!(limiter.windows.lock().await.len(), 1);
    }
}
