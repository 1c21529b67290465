//! Process-wide statistics for geocoding operations.

use crate::types::ProviderTier;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated across all geocoding calls.
///
/// Owned by the orchestrator and shared by reference; all counters are
/// atomics so a snapshot may be taken concurrently with active geocoding.
#[derive(Debug, Default)]
pub struct StatsCollector {
    /// Total geocode requests received.
    total_requests: AtomicU64,
    /// Requests answered from the cache tier.
    cache_hits: AtomicU64,
    /// Requests answered by the free provider.
    free_successes: AtomicU64,
    /// Requests answered by the paid provider.
    paid_successes: AtomicU64,
    /// Requests that exhausted every tier.
    failures: AtomicU64,
    /// Tier attempts rejected by a local rate limiter.
    rate_limited: AtomicU64,
    /// Tier attempts rejected by an open circuit breaker.
    circuit_rejections: AtomicU64,
}

impl StatsCollector {
    /// Creates a new collector with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an incoming geocode request.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful resolution by the given tier.
    pub fn record_success(&self, tier: ProviderTier) {
        match tier {
            ProviderTier::Cache => self.cache_hits.fetch_add(1, Ordering::Relaxed),
            ProviderTier::Free => self.free_successes.fetch_add(1, Ordering::Relaxed),
            ProviderTier::Paid => self.paid_successes.fetch_add(1, Ordering::Relaxed),
            ProviderTier::None => 0,
        };
    }

    /// Records a request that exhausted every tier without a result.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rate-limiter rejection.
    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a circuit-breaker rejection.
    pub fn record_circuit_rejection(&self) {
        self.circuit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent read-only snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let free_successes = self.free_successes.load(Ordering::Relaxed);
        let paid_successes = self.paid_successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);

        let rate = |part: u64| {
            if total_requests == 0 {
                0.0
            } else {
                part as f64 / total_requests as f64
            }
        };

        StatsSnapshot {
            total_requests,
            cache_hits,
            free_successes,
            paid_successes,
            failures,
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            circuit_rejections: self.circuit_rejections.load(Ordering::Relaxed),
            cache_hit_rate: rate(cache_hits),
            success_rate: rate(cache_hits + free_successes + paid_successes),
        }
    }
}

/// Read-only view of the collector's counters with derived rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Total geocode requests received.
    pub total_requests: u64,
    /// Requests answered from the cache tier.
    pub cache_hits: u64,
    /// Requests answered by the free provider.
    pub free_successes: u64,
    /// Requests answered by the paid provider.
    pub paid_successes: u64,
    /// Requests that exhausted every tier.
    pub failures: u64,
    /// Tier attempts rejected by a local rate limiter.
    pub rate_limited: u64,
    /// Tier attempts rejected by an open circuit breaker.
    pub circuit_rejections: u64,
    /// Fraction of requests answered from cache.
    pub cache_hit_rate: f64,
    /// Fraction of requests resolved by any tier.
    pub success_rate: f64,
}
