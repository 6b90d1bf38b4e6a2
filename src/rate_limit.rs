use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::metrics::RATE_LIMIT_KEYS;

// How often the store gets swept for expired windows
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// Rate limit entry - one live window per key
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

// Outcome of a single check_limit call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub success: bool,
    pub remaining: u32,
    // seconds until the window resets, 0 unless over budget
    pub retry_after: u64,
}

// Fixed-window counter store, keyed by "<class>:<ip>". Windows are pinned
// at first-request time per key, so bursts at window edges can briefly see
// up to 2x the budget - accepted tradeoff of the fixed-window strategy.
//
// Counters live in process memory. Running more than one replica needs a
// shared counter store (e.g. an atomic-increment KV) instead; this one is
// scoped to a single instance.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    // Count one request against `key`. The DashMap entry holds its shard
    // locked for the whole read-modify-write, so concurrent requests for the
    // same key can never lose an increment.
    pub fn check_limit(&self, key: &str, limit: u32, window: Duration) -> RateLimitResult {
        let now = Instant::now();
        self.maybe_sweep(now);

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        // first request for this key, or the previous window expired:
        // start a fresh window
        if entry.count == 0 || now >= entry.reset_at {
            entry.count = 1;
            entry.reset_at = now + window;
            return RateLimitResult {
                success: true,
                remaining: limit.saturating_sub(1),
                retry_after: 0,
            };
        }

        entry.count += 1;

        // over budget - keep the window as-is and report when it resets
        if entry.count > limit {
            let retry_after = entry.reset_at.duration_since(now).as_secs_f64().ceil() as u64;
            return RateLimitResult {
                success: false,
                remaining: 0,
                retry_after,
            };
        }

        RateLimitResult {
            success: true,
            remaining: limit - entry.count,
            retry_after: 0,
        }
    }

    // Opportunistic cleanup: at most once per SWEEP_INTERVAL, and only if no
    // other caller is already holding the sweep clock.
    fn maybe_sweep(&self, now: Instant) {
        if let Ok(mut last) = self.last_sweep.try_lock() {
            if now.duration_since(*last) >= SWEEP_INTERVAL {
                *last = now;
                self.sweep_expired();
            }
        }
    }

    // Drop every entry whose window has passed
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.reset_at);
        RATE_LIMIT_KEYS.set(self.entries.len() as f64);
    }

    // Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn counts_down_then_denies() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        for expected in (0..5u32).rev() {
            let res = limiter.check_limit("general:1.2.3.4", 5, window);
            assert!(res.success);
            assert_eq!(res.remaining, expected);
            assert_eq!(res.retry_after, 0);
        }

        let denied = limiter.check_limit("general:1.2.3.4", 5, window);
        assert!(!denied.success);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after > 0);
    }

    #[test]
    fn denial_does_not_reset_the_window() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        limiter.check_limit("general:1.2.3.4", 1, window);
        let first_denial = limiter.check_limit("general:1.2.3.4", 1, window);
        let second_denial = limiter.check_limit("general:1.2.3.4", 1, window);

        assert!(!first_denial.success);
        assert!(!second_denial.success);
        assert!(second_denial.retry_after <= first_denial.retry_after);
    }

    #[test]
    fn window_expiry_grants_a_fresh_budget() {
        let limiter = RateLimiter::new();
        let window = Duration::from_millis(30);

        limiter.check_limit("general:1.2.3.4", 2, window);
        limiter.check_limit("general:1.2.3.4", 2, window);
        assert!(!limiter.check_limit("general:1.2.3.4", 2, window).success);

        sleep(Duration::from_millis(40));

        let fresh = limiter.check_limit("general:1.2.3.4", 2, window);
        assert!(fresh.success);
        assert_eq!(fresh.remaining, 1);
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        limiter.check_limit("general:1.2.3.4", 1, window);
        assert!(!limiter.check_limit("general:1.2.3.4", 1, window).success);

        let other = limiter.check_limit("general:5.6.7.8", 1, window);
        assert!(other.success);
        assert_eq!(other.remaining, 0);
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let limiter = RateLimiter::new();

        limiter.check_limit("stale", 5, Duration::from_millis(10));
        limiter.check_limit("live", 5, Duration::from_secs(60));
        assert_eq!(limiter.tracked_keys(), 2);

        sleep(Duration::from_millis(20));
        limiter.sweep_expired();

        assert_eq!(limiter.tracked_keys(), 1);
        // the surviving key still counts against its existing window
        let res = limiter.check_limit("live", 5, Duration::from_secs(60));
        assert_eq!(res.remaining, 3);
    }
}
