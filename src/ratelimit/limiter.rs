//! Sliding-window rate limiter
//!
//! Each key keeps the instants of its requests inside the last window. A
//! request is allowed while fewer than `limit` instants remain after pruning.
//! The whole map sits behind one mutex; the key count is capped and the key
//! with the stalest last request is evicted when the cap is exceeded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Hard cap on tracked keys
pub const DEFAULT_MAX_KEYS: usize = 10_000;

#[derive(Debug)]
pub struct IpRateLimiter {
    /// Map of key -> request instants, oldest first
    entries: Mutex<HashMap<String, VecDeque<Instant>>>,
    /// Requests allowed per window
    limit: usize,
    /// Window duration
    window: Duration,
    max_keys: usize,
}

impl IpRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            limit: limit as usize,
            window,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }

    /// Limiter with a one minute window
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    /// Record a request for `key` and report whether it may proceed
    pub fn allow(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub(crate) fn check_at(&self, key: &str, now: Instant) -> bool {
        let cutoff = now.checked_sub(self.window);
        let mut entries = self.lock();

        let recent = entries.entry(key.to_string()).or_default();
        prune(recent, cutoff);

        if recent.len() >= self.limit {
            if recent.is_empty() {
                entries.remove(key);
            }
            return false;
        }

        recent.push_back(now);

        if entries.len() > self.max_keys {
            evict_stalest(&mut entries, key);
        }

        true
    }

    /// Drop expired instants everywhere and forget idle keys
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    pub(crate) fn sweep_at(&self, now: Instant) {
        let cutoff = now.checked_sub(self.window);
        let mut entries = self.lock();
        let before = entries.len();

        entries.retain(|_, recent| {
            prune(recent, cutoff);
            !recent.is_empty()
        });

        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Rate limiter swept idle keys");
        }
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Run `sweep` once per window until the limiter is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.window.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(limiter) => limiter.sweep(),
                    None => break,
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        // A panic while holding the lock cannot leave the map structurally broken
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keep only instants strictly after `cutoff`
fn prune(recent: &mut VecDeque<Instant>, cutoff: Option<Instant>) {
    let Some(cutoff) = cutoff else {
        return;
    };
    while recent.front().is_some_and(|t| *t <= cutoff) {
        recent.pop_front();
    }
}

/// Remove empty keys and the key whose latest request is the oldest
fn evict_stalest(entries: &mut HashMap<String, VecDeque<Instant>>, keep: &str) {
    entries.retain(|_, recent| !recent.is_empty());

    let stalest = entries
        .iter()
        .filter(|(key, _)| key.as_str() != keep)
        .filter_map(|(key, recent)| recent.back().map(|last| (key, *last)))
        .min_by_key(|(_, last)| *last)
        .map(|(key, _)| key.clone());

    if let Some(key) = stalest {
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = IpRateLimiter::per_minute(3);

        assert!(limiter.allow("127.0.0.1"));
        assert!(limiter.allow("127.0.0.1"));
        assert!(limiter.allow("127.0.0.1"));

        // 4th request should be denied
        assert!(!limiter.allow("127.0.0.1"));
        assert!(!limiter.allow("127.0.0.1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = IpRateLimiter::per_minute(1);

        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn test_window_expiry() {
        let limiter = IpRateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("ip", start));
        assert!(limiter.check_at("ip", start + Duration::from_secs(1)));
        assert!(!limiter.check_at("ip", start + Duration::from_secs(30)));

        // Exactly one window after the first request it falls out
        assert!(limiter.check_at("ip", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("ip", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_denied_requests_do_not_extend_window() {
        let limiter = IpRateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check_at("ip", start));
        for secs in 1..10 {
            assert!(!limiter.check_at("ip", start + Duration::from_secs(secs)));
        }
        assert!(limiter.check_at("ip", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_limit_always_denies_and_keeps_no_state() {
        let limiter = IpRateLimiter::per_minute(0);

        assert!(!limiter.allow("a"));
        assert!(!limiter.allow("b"));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_key_cap_evicts_stalest() {
        let limiter = IpRateLimiter::per_minute(5).with_max_keys(3);
        let start = Instant::now();

        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("b", start + Duration::from_millis(1)));
        assert!(limiter.check_at("c", start + Duration::from_millis(2)));
        // "a" has a newer request than "b" now
        assert!(limiter.check_at("a", start + Duration::from_millis(3)));
        assert!(limiter.check_at("d", start + Duration::from_millis(4)));

        assert_eq!(limiter.tracked_keys(), 3);
        let entries = limiter.lock();
        assert!(!entries.contains_key("b"));
        assert!(entries.contains_key("a"));
        assert!(entries.contains_key("d"));
    }

    #[test]
    fn test_key_cap_holds_under_many_ips() {
        let limiter = IpRateLimiter::per_minute(10);
        for i in 0..(DEFAULT_MAX_KEYS + 100) {
            limiter.allow(&format!("ip-{i}"));
        }
        assert!(limiter.tracked_keys() <= DEFAULT_MAX_KEYS);
    }

    #[test]
    fn test_sweep_drops_idle_keys() {
        let limiter = IpRateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(50));
        limiter.sweep_at(start + Duration::from_secs(70));

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.lock().contains_key("fresh"));
    }

    #[test]
    fn test_concurrent_requests_respect_limit() {
        let limiter = Arc::new(IpRateLimiter::per_minute(100));
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.allow("shared"))
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(allowed, 100);
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_limiter_dropped() {
        let limiter = Arc::new(IpRateLimiter::new(1, Duration::from_millis(20)));
        let handle = limiter.spawn_sweeper();
        drop(limiter);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }
}
