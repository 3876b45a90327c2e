//! Token-bucket rate limiting, one instance per source adapter.
//!
//! Capacity equals the permitted requests per minute; tokens refill
//! continuously at rate/60 per second. `acquire` suspends the calling task
//! until a token is available, `try_acquire` never blocks.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, or return the wait required before one is available.
    fn take(&mut self, now: Instant) -> Option<Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64(
                (1.0 - self.tokens) / self.refill_per_sec,
            ))
        }
    }
}

/// Async token-bucket limiter.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_minute` requests, with burst capacity
    /// equal to one minute's allowance.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let capacity = f64::from(requests_per_minute.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                capacity,
                tokens: capacity,
                refill_per_sec: capacity / 60.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                bucket.take(Instant::now())
            };
            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }

    /// Consume a token if one is immediately available.
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        bucket.take(Instant::now()).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity() {
        let limiter = RateLimiter::per_minute(60);
        for _ in 0..60 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_after_wait() {
        let limiter = RateLimiter::per_minute(60);
        while limiter.try_acquire().await {}

        // 60/min refills one token per second.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_blocks_until_token() {
        let limiter = RateLimiter::per_minute(60);
        while limiter.try_acquire().await {}

        let start = Instant::now();
        limiter.acquire().await;
        let waited = Instant::now().duration_since(start);
        assert!(waited >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_clamped_to_one() {
        let limiter = RateLimiter::per_minute(0);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }
}
