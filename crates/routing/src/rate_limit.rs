//! Per-session fixed-window rate limiting.
//!
//! Counters live in process memory keyed by session id. A window starts at
//! the first message and lasts `window` seconds; at the limit, further
//! checks are denied without incrementing. Stale buckets are swept
//! opportunistically every few hundred checks rather than by a background
//! task.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};

const CLEANUP_EVERY_CHECKS: u64 = 512;

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Messages left in the current window.
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_in_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    max_messages: u32,
    window: Duration,
    buckets: Arc<DashMap<String, WindowState>>,
    checks_seen: Arc<AtomicU64>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_messages: u32, window: Duration) -> Self {
        Self {
            max_messages,
            window,
            buckets: Arc::new(DashMap::new()),
            checks_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Atomic check-and-increment for one session. Two concurrent calls
    /// with one slot left cannot both pass: the bucket entry is updated
    /// under the map shard lock.
    pub fn check(&self, session_id: &str) -> RateDecision {
        self.check_at(session_id, Instant::now())
    }

    fn reset_in(&self, elapsed: Duration) -> u64 {
        let remaining = self.window.saturating_sub(elapsed);
        remaining.as_secs().max(1)
    }

    pub(crate) fn check_at(&self, session_id: &str, now: Instant) -> RateDecision {
        let decision = match self.buckets.entry(session_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                let elapsed = now.duration_since(state.started_at);
                if elapsed >= self.window {
                    state.started_at = now;
                    state.count = 1;
                    RateDecision {
                        allowed: true,
                        remaining: self.max_messages.saturating_sub(1),
                        reset_in_secs: self.window.as_secs(),
                    }
                } else if state.count < self.max_messages {
                    state.count += 1;
                    RateDecision {
                        allowed: true,
                        remaining: self.max_messages - state.count,
                        reset_in_secs: self.reset_in(elapsed),
                    }
                } else {
                    RateDecision {
                        allowed: false,
                        remaining: 0,
                        reset_in_secs: self.reset_in(elapsed),
                    }
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(WindowState {
                    started_at: now,
                    count: 1,
                });
                RateDecision {
                    allowed: true,
                    remaining: self.max_messages.saturating_sub(1),
                    reset_in_secs: self.window.as_secs(),
                }
            },
        };

        self.cleanup_if_needed(now);
        decision
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.checks_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(CLEANUP_EVERY_CHECKS) {
            return;
        }
        let stale_after = self.window.saturating_mul(3);
        self.buckets
            .retain(|_, state| now.duration_since(state.started_at) <= stale_after);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = "chat-juan_a1b2c3";

    fn limiter() -> RateLimiter {
        RateLimiter::new(20, Duration::from_secs(60))
    }

    #[test]
    fn first_check_allows_with_full_remaining() {
        let limiter = limiter();
        let decision = limiter.check(SESSION);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 19);
        assert_eq!(decision.reset_in_secs, 60);
    }

    #[test]
    fn twenty_first_check_in_window_is_denied() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..20 {
            let decision = limiter.check_at(SESSION, now);
            assert!(decision.allowed, "check {i} should pass");
        }

        let denied = limiter.check_at(SESSION, now);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_in_secs >= 1);
    }

    #[test]
    fn denied_checks_do_not_consume_the_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(SESSION, now).allowed);
        assert!(limiter.check_at(SESSION, now).allowed);
        for _ in 0..5 {
            assert!(!limiter.check_at(SESSION, now).allowed);
        }
        // Window still resets on schedule.
        assert!(
            limiter
                .check_at(SESSION, now + Duration::from_secs(61))
                .allowed
        );
    }

    #[test]
    fn window_elapse_resets_the_counter() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..20 {
            limiter.check_at(SESSION, now);
        }
        assert!(!limiter.check_at(SESSION, now).allowed);

        let decision = limiter.check_at(SESSION, now + Duration::from_secs(61));
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 19);
    }

    #[test]
    fn sessions_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("chat-juan_a1b2c3", now).allowed);
        assert!(!limiter.check_at("chat-juan_a1b2c3", now).allowed);
        assert!(limiter.check_at("chat-ana_0fff00", now).allowed);
    }

    #[test]
    fn reset_in_counts_down_within_the_window() {
        let limiter = limiter();
        let now = Instant::now();

        limiter.check_at(SESSION, now);
        let later = limiter.check_at(SESSION, now + Duration::from_secs(45));
        assert!(later.allowed);
        assert!(later.reset_in_secs <= 15);
        assert!(later.reset_in_secs >= 1);
    }
}
