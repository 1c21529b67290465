//! Provider and cache adapters.
//!
//! A [`ProviderAdapter`] normalizes one upstream provider's responses into
//! [`GeocodeResult`] values. Adapters never retry; retry and fallback policy
//! lives entirely in the hierarchical geocoder.

mod cache;
mod free;
mod paid;

pub use cache::{CacheAdapter, DEFAULT_CACHE_TTL};
pub use free::FreeProviderAdapter;
pub use paid::PaidProviderAdapter;

use crate::error::GeocodeError;
use crate::types::{GeocodeResult, ProviderTier};
use async_trait::async_trait;
use std::time::Duration;

/// A geocoding provider normalized behind a common interface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The tier this adapter represents.
    fn tier(&self) -> ProviderTier;

    /// Resolve a free-text address into a normalized result.
    ///
    /// Fails with a typed [`GeocodeError`] on any non-success condition;
    /// a provider that answers but has no match returns
    /// [`GeocodeError::NotFound`].
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError>;
}

/// External key-value store backing the cache tier.
///
/// The store is responsible for its own synchronization and TTL expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a previously stored result.
    async fn get(&self, key: &str) -> Result<Option<GeocodeResult>, GeocodeError>;

    /// Store a result under `key` for at most `ttl`.
    async fn set(&self, key: &str, result: &GeocodeResult, ttl: Duration)
        -> Result<(), GeocodeError>;
}
