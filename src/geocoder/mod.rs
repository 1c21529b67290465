//! Hierarchical fallback orchestration: cache, then free, then paid.

use crate::adapters::{CacheAdapter, CacheStore, ProviderAdapter};
use crate::config::{GeocoderConfig, ProviderSettings};
use crate::error::{GeocodeError, NetworkError};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, DailyQuota, RateLimiter, RateLimiterConfig,
};
use crate::stats::{StatsCollector, StatsSnapshot};
use crate::types::{GeocodeResult, GeocodeStatus, ProviderTier};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One provider tier with its protective breaker and limiter.
struct ProviderSlot {
    adapter: Arc<dyn ProviderAdapter>,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    quota: Option<DailyQuota>,
    request_timeout: Duration,
}

impl ProviderSlot {
    fn new(
        adapter: Arc<dyn ProviderAdapter>,
        settings: &ProviderSettings,
        daily_quota: Option<u64>,
    ) -> Self {
        Self {
            adapter,
            breaker: CircuitBreaker::new(
                CircuitBreakerConfig::new(settings.failure_threshold)
                    .with_open_timeout(settings.circuit_timeout),
            ),
            limiter: RateLimiter::new(
                RateLimiterConfig::new(settings.requests_per_second)
                    .with_burst_size(settings.burst_size),
            ),
            quota: daily_quota.map(DailyQuota::new),
            request_timeout: settings.request_timeout,
        }
    }
}

/// Resolves addresses through the cache, free, and paid tiers in order.
///
/// The geocoder is stateless per call except for the shared breaker,
/// limiter, and stats objects, so one instance serves any number of
/// concurrent callers. Collaborators are injected as trait objects, which
/// is also how tests substitute doubles.
pub struct HierarchicalGeocoder {
    cache: CacheAdapter,
    tiers: Vec<ProviderSlot>,
    stats: Arc<StatsCollector>,
}

impl HierarchicalGeocoder {
    /// Build a geocoder from configuration and injected collaborators.
    pub fn new(
        config: &GeocoderConfig,
        cache_store: Arc<dyn CacheStore>,
        free: Arc<dyn ProviderAdapter>,
        paid: Arc<dyn ProviderAdapter>,
    ) -> Self {
        Self {
            cache: CacheAdapter::new(cache_store, config.cache_ttl),
            tiers: vec![
                ProviderSlot::new(free, &config.free, None),
                ProviderSlot::new(paid, &config.paid, config.paid_daily_quota),
            ],
            stats: Arc::new(StatsCollector::new()),
        }
    }

    /// Resolve a single address.
    ///
    /// Never fails: every call yields a [`GeocodeResult`] whose `status`
    /// communicates the outcome. Tiers are always attempted strictly in the
    /// order cache, free, paid; successful provider results are written
    /// through to the cache.
    pub async fn geocode(&self, address: &str) -> GeocodeResult {
        let started = Instant::now();
        self.stats.record_request();

        match self.cache.lookup(address).await {
            Ok(Some(hit)) => {
                self.stats.record_cache_hit();
                debug!(address, "resolved from cache");
                return hit.with_response_time(elapsed_ms(started));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "cache lookup failed, treating as miss");
            }
        }

        let mut terminal_status: Option<GeocodeStatus> = None;

        for slot in &self.tiers {
            let tier = slot.adapter.tier();
            match self.try_tier(slot, address).await {
                Ok(result) => {
                    self.stats.record_success(tier);
                    debug!(address, provider = %tier, "resolved by provider");
                    if result.status.is_resolved() {
                        if let Err(err) = self.cache.store(address, &result).await {
                            warn!(error = %err, "cache write-through failed");
                        }
                    }
                    return result.with_response_time(elapsed_ms(started));
                }
                Err(err) => {
                    debug!(address, provider = %tier, error = %err, "tier failed, falling back");
                    merge_status(&mut terminal_status, GeocodeStatus::from_error(&err));
                }
            }
        }

        self.stats.record_failure();
        let status = terminal_status.unwrap_or(GeocodeStatus::Failed);
        GeocodeResult::failure(status, ProviderTier::None).with_response_time(elapsed_ms(started))
    }

    /// Run the breaker, limiter, call sequence for one tier.
    async fn try_tier(
        &self,
        slot: &ProviderSlot,
        address: &str,
    ) -> Result<GeocodeResult, GeocodeError> {
        let tier = slot.adapter.tier();

        // Spent quota is a whole-day condition; reject before touching the
        // breaker or spending a limiter token.
        if slot.quota.as_ref().is_some_and(DailyQuota::is_exhausted) {
            return Err(GeocodeError::QuotaExceeded {
                message: format!("daily quota for the {} provider is exhausted", tier),
            });
        }

        if !slot.breaker.call_allowed() {
            self.stats.record_circuit_rejection();
            return Err(GeocodeError::CircuitOpen {
                provider: tier.to_string(),
            });
        }

        if !slot.limiter.try_acquire() {
            self.stats.record_rate_limited();
            // The breaker admitted us; hand the half-open trial slot back
            // since no call will be made.
            slot.breaker.cancel_trial();
            return Err(GeocodeError::RateLimited {
                retry_after: Some(slot.limiter.time_until_available()),
            });
        }

        if let Some(quota) = &slot.quota {
            if let Err(err) = quota.charge() {
                slot.breaker.cancel_trial();
                return Err(err);
            }
        }

        match tokio::time::timeout(slot.request_timeout, slot.adapter.geocode(address)).await {
            Ok(Ok(result)) => {
                slot.breaker.record_success();
                Ok(result)
            }
            Ok(Err(err)) => {
                if err.counts_as_provider_failure() {
                    slot.breaker.record_failure();
                } else if matches!(err, GeocodeError::NotFound) {
                    // The provider answered; it is healthy.
                    slot.breaker.record_success();
                } else {
                    slot.breaker.cancel_trial();
                }
                Err(err)
            }
            Err(_) => {
                slot.breaker.record_failure();
                Err(GeocodeError::Network(NetworkError::Timeout {
                    elapsed: slot.request_timeout,
                }))
            }
        }
    }

    /// Read-only snapshot of the accumulated statistics.
    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared handle to the stats collector.
    pub fn stats(&self) -> Arc<StatsCollector> {
        Arc::clone(&self.stats)
    }
}

impl std::fmt::Debug for HierarchicalGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalGeocoder")
            .field("tiers", &self.tiers.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Keep the most specific terminal status across failed tiers.
///
/// Outcomes from tiers that actually answered outrank pre-call rejections,
/// so a paid-provider failure is reported over an open free-tier circuit.
fn merge_status(current: &mut Option<GeocodeStatus>, candidate: GeocodeStatus) {
    let replace = match current {
        Some(existing) => candidate.specificity() >= existing.specificity(),
        None => true,
    };
    if replace {
        *current = Some(candidate);
    }
}
