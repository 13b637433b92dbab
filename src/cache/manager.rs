//! TTL cache over a key/value store
//!
//! Provides a `TtlCache` that stores serializable data as JSON entries stamped
//! with their write time. Freshness is decided at read time against a TTL the
//! caller supplies, so one store can hold entries with different lifetimes.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::store::{KeyValueStore, StoreError};

/// Errors that can occur when writing to the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The payload could not be serialized
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing store rejected the write
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Wrapper stored for every cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Write time in epoch milliseconds
    pub timestamp: i64,
    /// The cached payload, stored verbatim
    pub data: T,
}

/// Cache of JSON payloads with per-read expiry
///
/// Reads never fail: a missing, expired, unparseable or rejected entry is a
/// miss, and everything but a missing entry is also evicted from the store.
#[derive(Debug, Clone)]
pub struct TtlCache<S> {
    store: S,
}

impl<S: KeyValueStore> TtlCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cached payload if it is no older than `ttl_minutes`
    ///
    /// # Arguments
    /// * `key` - Cache key (e.g., "f1PracticeSessions_2025")
    /// * `ttl_minutes` - Maximum age of the entry in minutes
    pub fn get(&self, key: &str, ttl_minutes: u64) -> Option<Value> {
        self.get_validated(key, ttl_minutes, |_| true)
    }

    /// Like `get`, but additionally runs `check` over a fresh payload
    ///
    /// A payload that fails `check` is evicted and reported as a miss.
    pub fn get_validated<F>(&self, key: &str, ttl_minutes: u64, check: F) -> Option<Value>
    where
        F: FnOnce(&Value) -> bool,
    {
        let entry = self.read_entry(key)?;

        let age_ms = Utc::now().timestamp_millis() - entry.timestamp;
        let ttl_ms = i64::try_from(ttl_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60_000);

        if age_ms > ttl_ms {
            debug!(key, age_ms, ttl_ms, "cache entry expired, evicting");
            self.store.remove(key);
            return None;
        }

        if !check(&entry.data) {
            warn!(key, "cached payload failed validation, evicting");
            self.store.remove(key);
            return None;
        }

        debug!(key, age_ms, "cache hit");
        Some(entry.data)
    }

    /// Returns the cached payload decoded into `T`
    ///
    /// A payload that does not decode into `T` is treated as corrupt.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, ttl_minutes: u64) -> Option<T> {
        let data = self.get(key, ttl_minutes)?;
        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "cached payload has unexpected shape, evicting");
                self.store.remove(key);
                None
            }
        }
    }

    /// Writes `data` under `key` stamped with the current time
    ///
    /// Fully replaces any prior entry under the same key.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            timestamp: Utc::now().timestamp_millis(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        self.store.set(key, &json)?;
        debug!(key, "cache entry written");
        Ok(())
    }

    /// Removes a single entry
    pub fn remove(&self, key: &str) {
        self.store.remove(key);
    }

    /// Removes every entry in the backing store, returning how many were removed
    pub fn clear(&self) -> usize {
        let keys = self.store.keys();
        for key in &keys {
            self.store.remove(key);
        }
        keys.len()
    }

    fn read_entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key, error = %err, "corrupt cache entry, evicting");
                self.store.remove(key);
                None
            }
        }
    }
}
