//! Process-wide token bucket.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A single token bucket shared by every request.
///
/// Holds up to `capacity` permits and refills at `capacity / window` permits
/// per second. Starts full. Refill and consume happen under one lock.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests` per `window`.
    ///
    /// Both values are clamped to a minimum of one.
    pub fn new(requests: u32, window: Duration) -> Self {
        let capacity = f64::from(requests.max(1));
        let window = window.max(Duration::from_secs(1));

        Self {
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last: Instant::now(),
            }),
        }
    }

    /// Consumes one permit if available.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    pub(crate) fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if now > bucket.last {
            bucket.last = now;
        }

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
