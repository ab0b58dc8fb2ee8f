//! Request pacing for rate-limited APIs.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces requests at least `min_interval` apart across every caller that
/// shares this limiter.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the caller's slot comes up.
    pub async fn acquire(&self) {
        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot - now
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Exponential backoff for retry `attempt` (0-based), capped at `max`.
pub fn backoff_delay(base: Duration, attempt: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(4);
        assert_eq!(backoff_delay(base, 0, max), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 1, max), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2, max), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 5, max), max);
        assert_eq!(backoff_delay(base, 40, max), max);
    }
}
