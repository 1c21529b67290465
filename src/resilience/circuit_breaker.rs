//! Circuit breaker protecting one geocoding provider.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally.
    Closed,
    /// Circuit is open, requests are rejected.
    Open,
    /// Circuit is half-open, a single trial call is probing recovery.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Duration to wait before transitioning from open to half-open.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker configuration.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            ..Default::default()
        }
    }

    /// Set the duration to wait in open state.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    // Reference point for the open timeout: the failure that opened (or
    // reopened) the circuit.
    last_failure_time: Option<Instant>,
    trial_in_flight: bool,
}

/// Circuit breaker for protecting against cascading failures.
///
/// All transitions happen under a single lock so concurrent callers observe
/// linearizable state. After the open timeout elapses, only the first caller
/// is granted the half-open trial; everyone else is rejected until the trial
/// resolves via [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Check whether a call may proceed, claiming the half-open trial slot
    /// when the open timeout has elapsed.
    pub fn call_allowed(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.last_failure_time.map(|at| at.elapsed());
                if matches!(elapsed, Some(e) if e >= self.config.open_timeout) {
                    info!(
                        from = %CircuitState::Open,
                        to = %CircuitState::HalfOpen,
                        "circuit breaker state transition"
                    );
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                info!(
                    from = %CircuitState::HalfOpen,
                    to = %CircuitState::Closed,
                    "circuit breaker state transition"
                );
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.last_failure_time = None;
                inner.trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                debug!(
                    failure_count = inner.failure_count,
                    threshold = self.config.failure_threshold,
                    "circuit breaker recorded failure"
                );
                if inner.failure_count >= self.config.failure_threshold {
                    info!(
                        from = %CircuitState::Closed,
                        to = %CircuitState::Open,
                        "circuit breaker state transition"
                    );
                    inner.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker trial call failed, reopening circuit");
                inner.state = CircuitState::Open;
                inner.trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Release a claimed half-open trial slot without resolving it.
    ///
    /// Used when the caller was admitted by the breaker but gave up before
    /// calling the provider (for example, its rate limiter rejected the
    /// call). Without this the trial slot would leak and the circuit would
    /// stay half-open forever.
    pub fn cancel_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen && inner.trial_in_flight {
            inner.trial_in_flight = false;
        }
    }

    /// Get the current circuit state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get the current consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Reset the circuit breaker to closed state.
    pub fn reset(&self) {
        info!("circuit breaker manually reset");
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_time = None;
        inner.trial_in_flight = false;
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .field("failure_count", &self.failure_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_closed() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.call_allowed());
    }

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::new(2));

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.call_allowed());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.call_allowed());
    }

    #[test]
    fn success_resets_failure_count() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::new(3));

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.failure_count(), 2);

        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_timeout_admits_single_trial() {
        let config = CircuitBreakerConfig::new(1).with_open_timeout(Duration::from_millis(50));
        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        assert!(!cb.call_allowed());

        std::thread::sleep(Duration::from_millis(80));

        // First caller gets the trial, concurrent callers are rejected.
        assert!(cb.call_allowed());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.call_allowed());
    }

    #[test]
    fn trial_success_closes_circuit() {
        let config = CircuitBreakerConfig::new(1).with_open_timeout(Duration::from_millis(20));
        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.call_allowed());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.call_allowed());
    }

    #[test]
    fn trial_failure_reopens_circuit() {
        let config = CircuitBreakerConfig::new(1).with_open_timeout(Duration::from_millis(20));
        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.call_allowed());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.call_allowed());
    }

    #[test]
    fn cancel_trial_releases_slot() {
        let config = CircuitBreakerConfig::new(1).with_open_timeout(Duration::from_millis(20));
        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.call_allowed());
        assert!(!cb.call_allowed());

        cb.cancel_trial();
        assert!(cb.call_allowed());
    }

    #[test]
    fn open_timeout_runs_from_the_latest_failure() {
        let config = CircuitBreakerConfig::new(1).with_open_timeout(Duration::from_millis(60));
        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        // A straggling in-flight call fails while the circuit is open; the
        // timeout restarts from this failure.
        cb.record_failure();

        std::thread::sleep(Duration::from_millis(40));
        assert!(!cb.call_allowed());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.call_allowed());
    }

    #[test]
    fn manual_reset() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::new(2));

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn state_display() {
        assert_eq!(format!("{}", CircuitState::Closed), "closed");
        assert_eq!(format!("{}", CircuitState::Open), "open");
        assert_eq!(format!("{}", CircuitState::HalfOpen), "half-open");
    }
}
