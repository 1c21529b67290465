//! Configuration for the hierarchical geocoder.
//!
//! All tuning lives in an explicit [`GeocoderConfig`] struct; there are no
//! hidden globals. Provider API keys are held in [`SecretString`] so they
//! never appear in debug output.

use crate::adapters::DEFAULT_CACHE_TTL;
use crate::error::{ConfigurationError, GeocodeError};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Per-provider tuning: rate limit, circuit breaker, and request timeout.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// The provider's geocode endpoint.
    pub endpoint: Url,
    /// API key, when the provider requires one.
    pub api_key: Option<SecretString>,
    /// Token-bucket refill rate.
    pub requests_per_second: f64,
    /// Token-bucket burst capacity.
    pub burst_size: u32,
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a half-open trial.
    pub circuit_timeout: Duration,
    /// Per-request deadline for calls to this provider.
    pub request_timeout: Duration,
}

impl ProviderSettings {
    /// Defaults for an OpenStreetMap-style free provider: one request per
    /// second with a small burst allowance.
    pub fn free_default() -> Self {
        Self {
            endpoint: Url::parse("https://nominatim.openstreetmap.org/search")
                .expect("static URL parses"),
            api_key: None,
            requests_per_second: 1.0,
            burst_size: 3,
            failure_threshold: 5,
            circuit_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Defaults for a commercial paid provider.
    pub fn paid_default() -> Self {
        Self {
            endpoint: Url::parse("https://maps.googleapis.com/maps/api/geocode/json")
                .expect("static URL parses"),
            api_key: None,
            requests_per_second: 50.0,
            burst_size: 10,
            failure_threshold: 5,
            circuit_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn validate(&self, provider: &str) -> Result<(), ConfigurationError> {
        if self.requests_per_second <= 0.0 || self.burst_size == 0 {
            return Err(ConfigurationError::InvalidRateLimit {
                provider: provider.to_string(),
                rate: self.requests_per_second,
                burst: self.burst_size,
            });
        }
        if self.failure_threshold == 0 {
            return Err(ConfigurationError::InvalidThreshold {
                provider: provider.to_string(),
                threshold: self.failure_threshold,
            });
        }
        Ok(())
    }
}

/// Configuration for the hierarchical geocoder and batch coordinator.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Free-tier provider settings.
    pub free: ProviderSettings,
    /// Paid-tier provider settings.
    pub paid: ProviderSettings,
    /// Daily request quota for the paid provider (None = unlimited).
    pub paid_daily_quota: Option<u64>,
    /// Time-to-live for cached results.
    pub cache_ttl: Duration,
    /// Maximum concurrent lookups during batch resolution.
    pub batch_concurrency: usize,
    /// Overall deadline for a batch (None = no deadline).
    pub batch_deadline: Option<Duration>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            free: ProviderSettings::free_default(),
            paid: ProviderSettings::paid_default(),
            paid_daily_quota: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            batch_concurrency: 8,
            batch_deadline: None,
        }
    }
}

impl GeocoderConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GeocoderConfigBuilder {
        GeocoderConfigBuilder::default()
    }
}

/// Builder for [`GeocoderConfig`] with a validating `build()`.
#[derive(Debug, Default)]
pub struct GeocoderConfigBuilder {
    config: GeocoderConfig,
}

impl GeocoderConfigBuilder {
    /// Replace the free-provider settings.
    pub fn free(mut self, settings: ProviderSettings) -> Self {
        self.config.free = settings;
        self
    }

    /// Replace the paid-provider settings.
    pub fn paid(mut self, settings: ProviderSettings) -> Self {
        self.config.paid = settings;
        self
    }

    /// Set the free provider's endpoint from a URL string.
    pub fn free_endpoint(mut self, url: &str) -> Result<Self, GeocodeError> {
        self.config.free.endpoint = parse_endpoint(url)?;
        Ok(self)
    }

    /// Set the paid provider's endpoint from a URL string.
    pub fn paid_endpoint(mut self, url: &str) -> Result<Self, GeocodeError> {
        self.config.paid.endpoint = parse_endpoint(url)?;
        Ok(self)
    }

    /// Set the paid provider's API key.
    pub fn paid_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.paid.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Cap paid-provider usage per UTC day.
    pub fn paid_daily_quota(mut self, quota: u64) -> Self {
        self.config.paid_daily_quota = Some(quota);
        self
    }

    /// Set the cache TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Set the batch concurrency limit.
    pub fn batch_concurrency(mut self, limit: usize) -> Self {
        self.config.batch_concurrency = limit;
        self
    }

    /// Set the overall batch deadline.
    pub fn batch_deadline(mut self, deadline: Duration) -> Self {
        self.config.batch_deadline = Some(deadline);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<GeocoderConfig, GeocodeError> {
        self.config.free.validate("free")?;
        self.config.paid.validate("paid")?;
        if self.config.batch_concurrency == 0 {
            return Err(GeocodeError::Configuration(
                ConfigurationError::InvalidConcurrency { value: 0 },
            ));
        }
        Ok(self.config)
    }
}

fn parse_endpoint(url: &str) -> Result<Url, GeocodeError> {
    Url::parse(url).map_err(|err| {
        GeocodeError::Configuration(ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
            details: err.to_string(),
        })
    })
}
