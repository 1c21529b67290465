//! Token-bucket rate limiter protecting one geocoding provider.
//!
//! The limiter never sleeps: acquisition is a non-blocking check and the
//! caller decides what to do on rejection (for the hierarchical geocoder,
//! fall through to the next tier).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Token refill rate in tokens per second.
    pub requests_per_second: f64,
    /// Maximum number of tokens the bucket can hold.
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter configuration.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            ..Default::default()
        }
    }

    /// Set the burst size.
    pub fn with_burst_size(mut self, size: u32) -> Self {
        self.burst_size = size;
        self
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Non-blocking token bucket rate limiter.
pub struct RateLimiter {
    config: RateLimiterConfig,
    bucket: Mutex<Bucket>,
    /// Total acquisition attempts.
    total_requests: AtomicU64,
    /// Attempts rejected for lack of tokens.
    limited_requests: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter with a full bucket.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: config.burst_size as f64,
                last_refill: Instant::now(),
            }),
            total_requests: AtomicU64::new(0),
            limited_requests: AtomicU64::new(0),
            config,
        }
    }

    /// Try to acquire one token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_many(1)
    }

    /// Try to acquire `n` tokens without waiting.
    ///
    /// Either all `n` tokens are taken or none are.
    pub fn try_acquire_many(&self, n: u32) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);

        let needed = n as f64;
        if bucket.tokens >= needed {
            bucket.tokens -= needed;
            true
        } else {
            self.limited_requests.fetch_add(1, Ordering::Relaxed);
            debug!(
                requested = n,
                available = bucket.tokens,
                "rate limiter rejected acquisition"
            );
            false
        }
    }

    /// Estimated wait until one token becomes available.
    ///
    /// Diagnostic only; the limiter itself never sleeps.
    pub fn time_until_available(&self) -> Duration {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);

        let deficit = 1.0 - bucket.tokens;
        if deficit <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(deficit / self.config.requests_per_second)
    }

    /// Get the current number of available tokens.
    pub fn available_tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        bucket.tokens
    }

    /// Total acquisition attempts made.
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Attempts that were rejected.
    pub fn limited_requests(&self) -> u64 {
        self.limited_requests.load(Ordering::Relaxed)
    }

    /// Get the rate limit configuration.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Refill the bucket based on elapsed time, capped at the burst size.
    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        let refilled = elapsed.as_secs_f64() * self.config.requests_per_second;

        bucket.tokens = (bucket.tokens + refilled).min(self.config.burst_size as f64);
        bucket.last_refill = now;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("available_tokens", &self.available_tokens())
            .field("total_requests", &self.total_requests())
            .field("limited_requests", &self.limited_requests())
            .finish()
    }
}
