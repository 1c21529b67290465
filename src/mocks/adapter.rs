//! Mock provider adapter with scripted outcomes.

use crate::adapters::ProviderAdapter;
use crate::error::{GeocodeError, NetworkError, ProviderError};
use crate::types::{GeocodeResult, Precision, ProviderTier};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// A scripted outcome for one `geocode` call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Resolve to the given coordinates with the given precision.
    Success {
        /// Latitude to return.
        latitude: f64,
        /// Longitude to return.
        longitude: f64,
        /// Precision of the match (drives confidence and status).
        precision: Precision,
    },
    /// Provider answers but has no match.
    NotFound,
    /// Connection-level failure.
    NetworkFailure,
    /// Non-success HTTP status.
    HttpFailure(u16),
    /// Provider-reported quota breach.
    QuotaExceeded,
}

impl MockOutcome {
    /// Shorthand for a rooftop-precision success.
    pub fn rooftop(latitude: f64, longitude: f64) -> Self {
        MockOutcome::Success {
            latitude,
            longitude,
            precision: Precision::Rooftop,
        }
    }

    fn into_result(self, tier: ProviderTier) -> Result<GeocodeResult, GeocodeError> {
        match self {
            MockOutcome::Success {
                latitude,
                longitude,
                precision,
            } => GeocodeResult::builder(tier)
                .coordinates(latitude, longitude)
                .precision(precision)
                .build(),
            MockOutcome::NotFound => Err(GeocodeError::NotFound),
            MockOutcome::NetworkFailure => Err(GeocodeError::Network(NetworkError::Connection {
                message: "mock connection failure".to_string(),
            })),
            MockOutcome::HttpFailure(status) => {
                Err(GeocodeError::Provider(ProviderError::HttpStatus {
                    status,
                    message: "mock http failure".to_string(),
                }))
            }
            MockOutcome::QuotaExceeded => Err(GeocodeError::QuotaExceeded {
                message: "mock quota breach".to_string(),
            }),
        }
    }
}

/// Provider adapter double that replays scripted outcomes and records the
/// addresses it was asked to resolve.
pub struct MockProviderAdapter {
    tier: ProviderTier,
    outcomes: Mutex<Vec<MockOutcome>>,
    default_outcome: Option<MockOutcome>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockProviderAdapter {
    /// Create an adapter for the given tier with no scripted outcomes.
    pub fn new(tier: ProviderTier) -> Self {
        Self {
            tier,
            outcomes: Mutex::new(Vec::new()),
            default_outcome: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create an adapter that replays `outcomes` in order.
    pub fn with_outcomes(tier: ProviderTier, outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            ..Self::new(tier)
        }
    }

    /// Create an adapter that always produces `outcome`.
    pub fn with_default(tier: ProviderTier, outcome: MockOutcome) -> Self {
        Self {
            default_outcome: Some(outcome),
            ..Self::new(tier)
        }
    }

    /// Delay every call, simulating a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue another outcome.
    pub fn queue_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().push(outcome);
    }

    /// Number of `geocode` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The addresses this adapter was asked to resolve, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    fn tier(&self) -> ProviderTier {
        self.tier
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        self.calls.lock().push(address.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut outcomes = self.outcomes.lock();
            if outcomes.is_empty() {
                self.default_outcome.clone()
            } else {
                Some(outcomes.remove(0))
            }
        };

        match outcome {
            Some(outcome) => outcome.into_result(self.tier),
            None => Err(GeocodeError::Network(NetworkError::Connection {
                message: "no mock outcome available".to_string(),
            })),
        }
    }
}

impl std::fmt::Debug for MockProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProviderAdapter")
            .field("tier", &self.tier)
            .field("queued_outcomes", &self.outcomes.lock().len())
            .field("recorded_calls", &self.calls.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeocodeStatus;

    #[tokio::test]
    async fn replays_outcomes_and_records_calls() {
        let adapter = MockProviderAdapter::with_outcomes(
            ProviderTier::Free,
            vec![MockOutcome::rooftop(1.0, 2.0), MockOutcome::NotFound],
        );

        let result = adapter.geocode("first address").await.unwrap();
        assert_eq!(result.status, GeocodeStatus::Success);
        assert_eq!(result.coordinates(), Some((1.0, 2.0)));

        let err = adapter.geocode("second address").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound));

        assert_eq!(adapter.calls(), vec!["first address", "second address"]);
    }

    #[tokio::test]
    async fn default_outcome_repeats() {
        let adapter = MockProviderAdapter::with_default(
            ProviderTier::Paid,
            MockOutcome::HttpFailure(500),
        );

        for _ in 0..3 {
            let err = adapter.geocode("x").await.unwrap_err();
            assert!(err.counts_as_provider_failure());
        }
        assert_eq!(adapter.call_count(), 3);
    }
}
