//! Test doubles for the geocoding resilience layer.
//!
//! The geocoder takes its collaborators by trait object, so tests substitute
//! these doubles without any runtime patching.

mod adapter;
mod cache;
mod transport;

pub use adapter::{MockOutcome, MockProviderAdapter};
pub use cache::MemoryCacheStore;
pub use transport::{MockResponse, MockTransport};
