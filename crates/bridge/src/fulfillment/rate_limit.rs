//! Client-side request pacing for the fulfillment API
//!
//! The fulfillment platform enforces roughly 40 requests per minute per
//! credential set. The limiter paces every outgoing request below that
//! ceiling; it is independent of the 429 retry logic, which only handles
//! the server saying no anyway.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Token-bucket request limiter
///
/// Blocks the in-flight request, not the caller's higher-level logic:
/// `acquire` sleeps just long enough for a token to become available.
pub struct RateLimiter {
    rate_per_sec: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// A limiter allowing `limit` requests per minute
    pub fn per_minute(limit: u32) -> Self {
        let capacity = f64::from(limit);
        Self {
            rate_per_sec: capacity / 60.0,
            capacity,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until a request slot is available
    pub fn acquire(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    /// Take one token, returning how long the caller must wait before
    /// proceeding. Tokens may go negative so queued callers space out
    /// rather than stampede when the bucket refills.
    fn reserve(&self, now: Instant) -> Duration {
        let mut bucket = self.bucket.lock().unwrap();

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.rate_per_sec).min(self.capacity);
        bucket.last_refill = now;

        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.rate_per_sec)
        }
    }
}
