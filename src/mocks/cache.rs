//! In-memory TTL cache store for tests and demos.

use crate::adapters::CacheStore;
use crate::error::GeocodeError;
use crate::types::GeocodeResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    result: GeocodeResult,
    expires_at: Instant,
}

/// TTL-aware in-memory implementation of [`CacheStore`].
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    fail_next: Mutex<bool>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Make the next `get` or `set` fail, for exercising cache-error paths.
    pub fn fail_next_operation(&self) {
        *self.fail_next.lock() = true;
    }

    fn take_failure(&self) -> Result<(), GeocodeError> {
        let mut fail = self.fail_next.lock();
        if *fail {
            *fail = false;
            return Err(GeocodeError::Cache {
                message: "simulated cache failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        self.take_failure()?;

        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.result.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        result: &GeocodeResult,
        ttl: Duration,
    ) -> Result<(), GeocodeError> {
        self.take_failure()?;

        self.entries.lock().insert(
            key.to_string(),
            Entry {
                result: result.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}
