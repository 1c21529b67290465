//! Resilience primitives protecting upstream geocoding providers.
//!
//! One [`CircuitBreaker`] and one [`RateLimiter`] instance exist per
//! provider, shared across all concurrent callers. Both are non-blocking:
//! the breaker and limiter only gate admission, the orchestrator decides
//! how to fall back.

mod circuit_breaker;
mod quota;
mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use quota::DailyQuota;
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
