// src/throttle.rs
//! Pacing and key handling for outbound explorer calls. Each client owns its
//! own instances, so tests and multiple clients never share state.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("at least one API key is required")]
    NoKeys,
}

/// Round-robin over a fixed set of API keys.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    next: AtomicUsize,
}

impl KeyRotator {
    /// Blank keys are ignored; an empty remainder is an error.
    pub fn new<I, S>(keys: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| {
                let k: String = k.into();
                k.trim().to_string()
            })
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(KeyError::NoKeys);
        }
        Ok(Self {
            keys,
            next: AtomicUsize::new(0),
        })
    }

    pub fn next_key(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[i]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Spaces calls so that consecutive starts are at least `min_interval`
/// apart (GCRA with a burst of one). A zero interval does not pace at all.
pub struct RateLimiter {
    min_interval: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl RateLimiter {
    /// Paces at `requests_per_second - 1` to stay under the provider limit.
    pub fn per_second(requests_per_second: u32) -> Self {
        let effective = requests_per_second.saturating_sub(1).max(1);
        Self::with_interval(Duration::from_millis(1000 / effective as u64))
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            limiter: Quota::with_period(min_interval).map(GovernorLimiter::direct),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub async fn execute<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        f().await
    }
}

#[derive(Debug)]
struct BreakerState {
    failures: u32,
    last_failure: Option<Instant>,
    open: bool,
}

/// Opens after `threshold` consecutive failed calls and closes again once
/// `reset_after` has passed since the last failure.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    reset_after: Duration,
    state: Mutex<BreakerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BreakerStatus {
    pub open: bool,
    pub failures: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            reset_after,
            state: Mutex::new(BreakerState {
                failures: 0,
                last_failure: None,
                open: false,
            }),
        }
    }

    pub fn is_open(&self) -> bool {
        let mut s = self.lock();
        if !s.open {
            return false;
        }
        let expired = s
            .last_failure
            .map_or(true, |t| t.elapsed() > self.reset_after);
        if expired {
            s.open = false;
            s.failures = 0;
            return false;
        }
        true
    }

    pub fn record_failure(&self) {
        let mut s = self.lock();
        s.failures += 1;
        s.last_failure = Some(Instant::now());
        if s.failures >= self.threshold && !s.open {
            s.open = true;
            warn!("Explorer circuit breaker opened after {} failures", s.failures);
        }
    }

    pub fn record_success(&self) {
        let mut s = self.lock();
        s.failures = 0;
        s.open = false;
    }

    pub fn status(&self) -> BreakerStatus {
        let s = self.lock();
        BreakerStatus {
            open: s.open,
            failures: s.failures,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_through_keys() {
        let r = KeyRotator::new(["a", "", "  ", "b", "c"]).unwrap();
        assert_eq!(r.len(), 3);
        let seen: Vec<_> = (0..5).map(|_| r.next_key().to_string()).collect();
        assert_eq!(seen, ["a", "b", "c", "a", "b"]);
    }

    #[test]
    fn independent_rotators_do_not_share_position() {
        let a = KeyRotator::new(["k1", "k2"]).unwrap();
        let b = KeyRotator::new(["k1", "k2"]).unwrap();
        assert_eq!(a.next_key(), "k1");
        assert_eq!(a.next_key(), "k2");
        assert_eq!(b.next_key(), "k1");
    }

    #[test]
    fn rejects_empty_key_set() {
        assert_eq!(KeyRotator::new(Vec::<String>::new()).unwrap_err(), KeyError::NoKeys);
        assert_eq!(KeyRotator::new([" "]).unwrap_err(), KeyError::NoKeys);
    }

    #[test]
    fn per_second_keeps_a_safety_margin() {
        assert_eq!(RateLimiter::per_second(5).min_interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::per_second(1).min_interval(), Duration::from_millis(1000));
        assert_eq!(RateLimiter::per_second(0).min_interval(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn limiter_spaces_calls() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.execute(|| async {}).await;
        }
        // two full periods, less a little for the limiter's own clock
        assert!(start.elapsed() >= Duration::from_millis(75));
    }

    #[test]
    fn breaker_opens_at_threshold_and_resets() {
        let b = CircuitBreaker::new(2, Duration::from_millis(30));
        b.record_failure();
        assert!(!b.is_open());
        b.record_failure();
        assert!(b.is_open());
        assert_eq!(b.status(), BreakerStatus { open: true, failures: 2 });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!b.is_open());
        assert_eq!(b.status().failures, 0);
    }

    #[test]
    fn success_closes_breaker() {
        let b = CircuitBreaker::new(1, Duration::from_secs(60));
        b.record_failure();
        assert!(b.is_open());
        b.record_success();
        assert!(!b.is_open());
    }
}
