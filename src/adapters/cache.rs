//! Cache tier adapter.

use crate::adapters::CacheStore;
use crate::error::GeocodeError;
use crate::types::{cache_key, GeocodeResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default time-to-live for cached results: one week.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache tier: stable-keyed lookups and write-through storage against an
/// external key-value store.
pub struct CacheAdapter {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CacheAdapter {
    /// Create a cache adapter with the given store and TTL.
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a cache adapter with the default one-week TTL.
    pub fn with_default_ttl(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, DEFAULT_CACHE_TTL)
    }

    /// Look up a previously resolved address.
    ///
    /// A hit is re-branded as a cache result (`provider == Cache`,
    /// `cached == true`).
    pub async fn lookup(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        let key = cache_key(address);
        match self.store.get(&key).await? {
            Some(stored) => {
                debug!(key = %key, "cache hit");
                Ok(Some(stored.into_cached()))
            }
            None => {
                debug!(key = %key, "cache miss");
                Ok(None)
            }
        }
    }

    /// Write a freshly resolved result through to the store.
    pub async fn store(&self, address: &str, result: &GeocodeResult) -> Result<(), GeocodeError> {
        let key = cache_key(address);
        self.store.set(&key, result, self.ttl).await
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for CacheAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAdapter")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryCacheStore;
    use crate::types::{Precision, ProviderTier};

    fn sample_result() -> GeocodeResult {
        GeocodeResult::builder(ProviderTier::Free)
            .coordinates(37.42, -122.08)
            .precision(Precision::Rooftop)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn lookup_miss_returns_none() {
        let adapter = CacheAdapter::with_default_ttl(Arc::new(MemoryCacheStore::new()));
        let hit = adapter.lookup("missing address").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn stored_result_comes_back_as_cache_hit() {
        let adapter = CacheAdapter::with_default_ttl(Arc::new(MemoryCacheStore::new()));
        let address = "1600 Amphitheatre Parkway, Mountain View, CA";

        adapter.store(address, &sample_result()).await.unwrap();
        let hit = adapter.lookup(address).await.unwrap().unwrap();

        assert!(hit.cached);
        assert_eq!(hit.provider, ProviderTier::Cache);
        assert_eq!(hit.coordinates(), Some((37.42, -122.08)));
    }

    #[tokio::test]
    async fn lookup_canonicalizes_the_address() {
        let adapter = CacheAdapter::with_default_ttl(Arc::new(MemoryCacheStore::new()));
        adapter
            .store("1600 Amphitheatre Parkway", &sample_result())
            .await
            .unwrap();

        let hit = adapter
            .lookup("  1600   AMPHITHEATRE parkway ")
            .await
            .unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let store = Arc::new(MemoryCacheStore::new());
        let adapter = CacheAdapter::new(Arc::clone(&store) as Arc<dyn CacheStore>, Duration::ZERO);

        adapter.store("somewhere", &sample_result()).await.unwrap();
        let hit = adapter.lookup("somewhere").await.unwrap();
        assert!(hit.is_none());
    }
}
