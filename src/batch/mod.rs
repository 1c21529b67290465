//! Concurrency-bounded, order-preserving batch resolution.

use crate::config::GeocoderConfig;
use crate::geocoder::HierarchicalGeocoder;
use crate::types::{GeocodeResult, GeocodeStatus, ProviderTier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Dispatches batches of addresses through a shared [`HierarchicalGeocoder`]
/// with a bounded number of in-flight lookups.
///
/// Results come back in input order regardless of completion order, and a
/// single address's failure never aborts the batch: every position receives
/// a [`GeocodeResult`].
pub struct BatchCoordinator {
    geocoder: Arc<HierarchicalGeocoder>,
    concurrency_limit: usize,
    deadline: Option<Duration>,
}

impl BatchCoordinator {
    /// Create a coordinator with the given concurrency limit (clamped to at
    /// least one in-flight lookup).
    pub fn new(geocoder: Arc<HierarchicalGeocoder>, concurrency_limit: usize) -> Self {
        Self {
            geocoder,
            concurrency_limit: concurrency_limit.max(1),
            deadline: None,
        }
    }

    /// Create a coordinator from configuration, taking the concurrency limit
    /// and the optional batch deadline from it.
    pub fn from_config(geocoder: Arc<HierarchicalGeocoder>, config: &GeocoderConfig) -> Self {
        Self {
            geocoder,
            concurrency_limit: config.batch_concurrency.max(1),
            deadline: config.batch_deadline,
        }
    }

    /// Set an overall deadline for each batch. On expiry, outstanding
    /// lookups are cancelled and their slots filled with failed results;
    /// completed slots are preserved.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Resolve every address, returning one result per input position.
    pub async fn geocode_batch(&self, addresses: &[String]) -> Vec<GeocodeResult> {
        let deadline = self.deadline.map(|d| Instant::now() + d);
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();

        for (index, address) in addresses.iter().enumerate() {
            let geocoder = Arc::clone(&self.geocoder);
            let semaphore = Arc::clone(&semaphore);
            let address = address.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, geocoder.geocode(&address).await)
            });
        }

        let mut slots: Vec<Option<GeocodeResult>> =
            (0..addresses.len()).map(|_| None).collect();

        while !tasks.is_empty() {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            outstanding = tasks.len(),
                            "batch deadline exceeded, cancelling outstanding lookups"
                        );
                        tasks.abort_all();
                        // Drain so results that finished racing the deadline
                        // are still preserved.
                        while let Some(result) = tasks.join_next().await {
                            if let Ok((index, result)) = result {
                                slots[index] = Some(result);
                            }
                        }
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match joined {
                Some(Ok((index, result))) => slots[index] = Some(result),
                Some(Err(err)) if err.is_cancelled() => {}
                Some(Err(err)) => warn!(error = %err, "geocode task failed to join"),
                None => break,
            }
        }

        debug!(
            total = addresses.len(),
            completed = slots.iter().filter(|s| s.is_some()).count(),
            "batch finished"
        );

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    GeocodeResult::failure(GeocodeStatus::Failed, ProviderTier::None)
                })
            })
            .collect()
    }

    /// The configured concurrency limit.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("concurrency_limit", &self.concurrency_limit)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
