//! Integration tests for batch coordination.

use async_trait::async_trait;
use geocoding::mocks::{MemoryCacheStore, MockOutcome, MockProviderAdapter};
use geocoding::{
    BatchCoordinator, GeocodeError, GeocodeResult, GeocodeStatus, GeocoderConfig,
    HierarchicalGeocoder, NetworkError, Precision, ProviderAdapter, ProviderSettings,
    ProviderTier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn test_settings() -> ProviderSettings {
    ProviderSettings {
        requests_per_second: 10_000.0,
        burst_size: 10_000,
        failure_threshold: 1_000,
        circuit_timeout: Duration::from_secs(60),
        request_timeout: Duration::from_secs(5),
        ..ProviderSettings::free_default()
    }
}

fn test_config() -> GeocoderConfig {
    GeocoderConfig::builder()
        .free(test_settings())
        .paid(test_settings())
        .build()
        .unwrap()
}

/// Test provider that parses addresses of the form `"lat;lon;delay_ms"`,
/// sleeps for the embedded delay, and tracks how many calls are in flight.
struct ScriptedProvider {
    tier: ProviderTier,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    fn new(tier: ProviderTier) -> Self {
        Self {
            tier,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn tier(&self) -> ProviderTier {
        self.tier
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = async {
            let mut parts = address.split(';');
            let lat: f64 = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or(GeocodeError::Network(NetworkError::Connection {
                    message: format!("unparseable scripted address: {}", address),
                }))?;
            let lon: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
            let delay_ms: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            GeocodeResult::builder(self.tier)
                .coordinates(lat, lon)
                .precision(Precision::Rooftop)
                .build()
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn scripted_geocoder(config: GeocoderConfig) -> (Arc<HierarchicalGeocoder>, Arc<ScriptedProvider>) {
    let free = Arc::new(ScriptedProvider::new(ProviderTier::Free));
    let paid = Arc::new(MockProviderAdapter::with_default(
        ProviderTier::Paid,
        MockOutcome::NetworkFailure,
    ));
    let geocoder = Arc::new(HierarchicalGeocoder::new(
        &config,
        Arc::new(MemoryCacheStore::new()),
        Arc::clone(&free) as Arc<dyn ProviderAdapter>,
        paid,
    ));
    (geocoder, free)
}

#[tokio::test]
async fn results_preserve_input_order() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 2);

    // The first address is the slowest, so completion order is the reverse
    // of input order.
    let addresses = vec![
        "10.0;1.0;120".to_string(),
        "20.0;2.0;60".to_string(),
        "30.0;3.0;1".to_string(),
    ];
    let results = batch.geocode_batch(&addresses).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].coordinates(), Some((10.0, 1.0)));
    assert_eq!(results[1].coordinates(), Some((20.0, 2.0)));
    assert_eq!(results[2].coordinates(), Some((30.0, 3.0)));
}

#[tokio::test]
async fn one_failure_never_aborts_the_batch() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 4);

    let addresses = vec![
        "1.0;1.0;1".to_string(),
        "not an address".to_string(),
        "3.0;3.0;1".to_string(),
    ];
    let results = batch.geocode_batch(&addresses).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, GeocodeStatus::Success);
    assert_eq!(results[1].status, GeocodeStatus::Failed);
    assert_eq!(results[1].coordinates(), None);
    assert_eq!(results[2].status, GeocodeStatus::Success);
}

#[tokio::test]
async fn concurrency_limit_bounds_in_flight_calls() {
    let (geocoder, free) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 3);

    let addresses: Vec<String> = (0..12).map(|i| format!("{}.0;0.0;30", i)).collect();
    let results = batch.geocode_batch(&addresses).await;

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r.status == GeocodeStatus::Success));
    assert!(
        free.max_in_flight() <= 3,
        "observed {} concurrent calls",
        free.max_in_flight()
    );
}

#[tokio::test]
async fn deadline_cancels_outstanding_and_preserves_completed() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 4).with_deadline(Duration::from_millis(150));

    let addresses = vec![
        "1.0;1.0;1".to_string(),
        "2.0;2.0;1".to_string(),
        "3.0;3.0;5000".to_string(),
    ];
    let results = batch.geocode_batch(&addresses).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, GeocodeStatus::Success);
    assert_eq!(results[1].status, GeocodeStatus::Success);
    assert_eq!(results[2].status, GeocodeStatus::Failed);
    assert_eq!(results[2].provider, ProviderTier::None);
}

#[tokio::test]
async fn from_config_applies_concurrency_and_deadline() {
    let config = GeocoderConfig::builder()
        .free(test_settings())
        .paid(test_settings())
        .batch_concurrency(3)
        .batch_deadline(Duration::from_millis(150))
        .build()
        .unwrap();
    let (geocoder, _) = scripted_geocoder(config.clone());
    let batch = BatchCoordinator::from_config(geocoder, &config);
    assert_eq!(batch.concurrency_limit(), 3);

    let addresses = vec!["1.0;1.0;1".to_string(), "2.0;2.0;5000".to_string()];
    let results = batch.geocode_batch(&addresses).await;

    // The configured deadline cancelled the slow lookup.
    assert_eq!(results[0].status, GeocodeStatus::Success);
    assert_eq!(results[1].status, GeocodeStatus::Failed);
}

#[tokio::test]
async fn empty_batch_returns_empty_results() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 2);

    let results = batch.geocode_batch(&[]).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn zero_concurrency_is_clamped_to_one() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(geocoder, 0);
    assert_eq!(batch.concurrency_limit(), 1);

    let results = batch.geocode_batch(&["5.0;6.0;1".to_string()]).await;
    assert_eq!(results[0].coordinates(), Some((5.0, 6.0)));
}

#[tokio::test]
async fn batch_shares_breaker_and_stats_with_single_calls() {
    let (geocoder, _) = scripted_geocoder(test_config());
    let batch = BatchCoordinator::new(Arc::clone(&geocoder), 2);

    let addresses = vec!["7.0;8.0;1".to_string(), "9.0;10.0;1".to_string()];
    batch.geocode_batch(&addresses).await;

    let stats = geocoder.get_stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.free_successes, 2);
    assert_eq!(stats.success_rate, 1.0);
}
