//! Resilient HTTP fetching for rate-limited JSON APIs
//!
//! This module provides a `Fetcher` that issues GET requests and transparently
//! retries on HTTP 429 and transient failures using capped exponential backoff.
//! Only failures that outlast the retry budget reach the caller.

mod client;

pub use client::{FetchError, Fetcher, RetryPolicy};
