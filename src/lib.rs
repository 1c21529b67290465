//! Hierarchical Geocoding Resilience Layer
//!
//! Turns a free-text address into coordinates by trying, in order, a local
//! cache, a free-but-rate-limited provider, and a paid fallback provider.
//! Each upstream dependency is protected by a circuit breaker and a
//! token-bucket rate limiter.
//!
//! # Features
//!
//! - **Hierarchical fallback**: cache, then free, then paid — minimizing
//!   latency and cost before reaching for higher-reliability tiers
//! - **Failure isolation**: per-provider circuit breakers with a
//!   single-trial half-open policy
//! - **Admission control**: non-blocking per-provider token buckets
//! - **Quality model**: normalized confidence scores comparable across
//!   providers
//! - **Batch resolution**: concurrency-bounded, order-preserving, with an
//!   optional overall deadline
//! - **Observability**: atomic counters with derived hit and success rates
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use geocoding::{
//!     BatchCoordinator, FreeProviderAdapter, GeocoderConfig, HierarchicalGeocoder,
//!     PaidProviderAdapter, ReqwestTransport,
//! };
//! use geocoding::mocks::MemoryCacheStore;
//! use secrecy::SecretString;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), geocoding::GeocodeError> {
//!     let config = GeocoderConfig::builder()
//!         .paid_api_key("my-api-key")
//!         .build()?;
//!
//!     let free_transport = Arc::new(ReqwestTransport::new(config.free.request_timeout)?);
//!     let paid_transport = Arc::new(ReqwestTransport::new(config.paid.request_timeout)?);
//!
//!     let free = Arc::new(FreeProviderAdapter::new(
//!         free_transport,
//!         config.free.endpoint.clone(),
//!     ));
//!     let paid = Arc::new(PaidProviderAdapter::new(
//!         paid_transport,
//!         config.paid.endpoint.clone(),
//!         SecretString::new("my-api-key".to_string()),
//!     ));
//!
//!     let geocoder = Arc::new(HierarchicalGeocoder::new(
//!         &config,
//!         Arc::new(MemoryCacheStore::new()),
//!         free,
//!         paid,
//!     ));
//!
//!     let result = geocoder.geocode("1600 Amphitheatre Parkway, Mountain View, CA").await;
//!     println!("{:?} at {:?}", result.status, result.coordinates());
//!
//!     let batch = BatchCoordinator::from_config(Arc::clone(&geocoder), &config);
//!     let results = batch
//!         .geocode_batch(&["A St".to_string(), "B Ave".to_string()])
//!         .await;
//!     assert_eq!(results.len(), 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod batch;
pub mod config;
pub mod error;
pub mod geocoder;
pub mod mocks;
pub mod resilience;
pub mod stats;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use adapters::{
    CacheAdapter, CacheStore, FreeProviderAdapter, PaidProviderAdapter, ProviderAdapter,
    DEFAULT_CACHE_TTL,
};
pub use batch::BatchCoordinator;
pub use config::{GeocoderConfig, GeocoderConfigBuilder, ProviderSettings};
pub use error::{ConfigurationError, GeocodeError, NetworkError, ProviderError};
pub use geocoder::HierarchicalGeocoder;
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, DailyQuota, RateLimiter,
    RateLimiterConfig,
};
pub use stats::{StatsCollector, StatsSnapshot};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    cache_key, AddressComponents, GeocodeResult, GeocodeResultBuilder, GeocodeStatus, MatchType,
    Precision, ProviderTier,
};

/// Result type alias for geocoding operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all major types are exported
        let _ = std::any::type_name::<GeocodeError>();
        let _ = std::any::type_name::<GeocoderConfig>();
        let _ = std::any::type_name::<GeocodeResult>();
        let _ = std::any::type_name::<HierarchicalGeocoder>();
        let _ = std::any::type_name::<BatchCoordinator>();
        let _ = std::any::type_name::<CircuitBreaker>();
        let _ = std::any::type_name::<RateLimiter>();
    }
}
