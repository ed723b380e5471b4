mod store;

use std::sync::Arc;

use time::Duration;
use tracing::debug;

use crate::{clock::Clock, config::RateLimitConfig};

pub use store::{InMemoryWindowStore, RateLimitWindow, WindowStore};

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub count: u32,
    /// Time left until the current window resets.
    pub retry_after: Duration,
}

/// Fixed-window request counting per client identity. A request arriving
/// once `now - window_start >= window` opens a fresh window, so bursts timed
/// around a window edge can pass up to twice the limit.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
        limit: u32,
        window: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            limit,
            window,
        }
    }

    pub fn from_config(cfg: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryWindowStore::new()),
            clock,
            cfg.max_requests,
            Duration::seconds(cfg.window_seconds as i64),
        )
    }

    /// Count a request for `identity`. Rejected requests still occupy a
    /// slot; the count is never decremented.
    pub fn hit(&self, identity: &str) -> Admission {
        let now = self.clock.now();
        let window = self.window;
        let current = self.store.update(identity, &mut |existing| {
            let mut w = match existing {
                Some(w) if now - w.window_start < window => w,
                _ => RateLimitWindow {
                    window_start: now,
                    count: 0,
                },
            };
            w.count = w.count.saturating_add(1);
            w
        });

        let allowed = current.count <= self.limit;
        let retry_after = (current.window_start + window - now).max(Duration::ZERO);
        debug!(identity = %identity, count = current.count, allowed, "rate limit check");
        Admission {
            allowed,
            count: current.count,
            retry_after,
        }
    }

    #[cfg(test)]
    pub fn allow(&self, identity: &str) -> bool {
        self.hit(identity).allowed
    }

    /// Forget windows that can no longer affect a decision.
    pub fn cleanup(&self) {
        self.store.purge(self.clock.now() - self.window);
    }

    #[cfg(test)]
    pub fn tracked_identities(&self) -> usize {
        self.store.tracked()
    }

    /// Spawn a task that periodically purges expired windows so idle
    /// identities do not accumulate.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: std::time::Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                limiter.cleanup();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(clock: Arc<ManualClock>) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryWindowStore::new()),
            clock,
            5,
            Duration::seconds(60),
        )
    }

    #[test]
    fn sixth_request_in_window_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());

        for i in 1..=5 {
            let a = limiter.hit("1.2.3.4");
            assert!(a.allowed, "request {i} should pass");
            assert_eq!(a.count, i);
            clock.advance(Duration::seconds(5));
        }
        let sixth = limiter.hit("1.2.3.4");
        assert!(!sixth.allowed);
        assert_eq!(sixth.retry_after, Duration::seconds(35));
    }

    #[test]
    fn rejected_attempts_keep_counting() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock);
        for _ in 0..5 {
            assert!(limiter.allow("x"));
        }
        assert_eq!(limiter.hit("x").count, 6);
        assert_eq!(limiter.hit("x").count, 7);
        assert!(!limiter.allow("x"));
    }

    #[test]
    fn window_resets_after_expiry() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());
        for _ in 0..6 {
            limiter.hit("x");
        }
        assert!(!limiter.allow("x"));

        clock.advance(Duration::seconds(61));
        let a = limiter.hit("x");
        assert!(a.allowed);
        assert_eq!(a.count, 1);
    }

    #[test]
    fn boundary_request_opens_fresh_window() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());

        clock.advance(Duration::seconds(59));
        for _ in 0..5 {
            assert!(limiter.allow("x"));
        }
        // exactly window_start + window
        clock.advance(Duration::seconds(60));
        for _ in 0..5 {
            assert!(limiter.allow("x"));
        }
        assert!(!limiter.allow("x"));
    }

    #[test]
    fn identities_are_independent() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock);
        for _ in 0..5 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));

        let b = limiter.hit("b");
        assert!(b.allowed);
        assert_eq!(b.count, 1);
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn cleanup_forgets_expired_windows() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());
        limiter.hit("a");
        limiter.hit("b");
        assert_eq!(limiter.tracked_identities(), 2);

        clock.advance(Duration::seconds(30));
        limiter.hit("c");
        clock.advance(Duration::seconds(30));
        limiter.cleanup();
        assert_eq!(limiter.tracked_identities(), 1);
    }

    #[test]
    fn concurrent_hits_never_exceed_limit() {
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(limiter(clock));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.allow("shared"))
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(allowed, 5);
    }
}
