//! TTL cache for upstream JSON payloads
//!
//! This module provides a `TtlCache` that stores `{timestamp, data}` entries in
//! an injected key/value store. Reads older than the caller's TTL, entries that
//! cannot be parsed, and payloads that fail a domain check are evicted and
//! reported as a miss. None of those conditions surface as errors.

mod manager;
mod store;
mod validate;

pub use manager::{CacheEntry, CacheError, TtlCache};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use validate::{key_year, payload_year, year_matches};
