//! Retrying JSON fetcher
//!
//! Wraps a `reqwest::Client` with a retry loop. Rate-limit responses are
//! treated as backpressure rather than errors, but still consume an attempt.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::delay::{Backoff, MAX_BACKOFF};

/// Default number of attempts per fetch
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Errors that survive the retry budget
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a non-success status other than 429
    #[error("upstream returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// URL of the request that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// HTTP status, if the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_delay: Duration,
    /// Ceiling for any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and initial delay, default cap
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Default::default()
        }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Outcome of a single attempt that did not fail outright
enum Attempt<T> {
    Body(T),
    RateLimited,
}

/// HTTP client that retries rate-limited and failed requests
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Creates a Fetcher with the default retry policy
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches `url` and returns the parsed JSON body
    ///
    /// # Returns
    /// * `Ok(Some(value))` - The upstream answered with a 2xx JSON body
    /// * `Ok(None)` - Every attempt was rate limited; callers treat this as "no data"
    /// * `Err(FetchError)` - The final attempt failed with a non-429 error
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Option<Value>, FetchError> {
        self.fetch_json(url).await
    }

    /// Fetches `url` and decodes the body into `T`
    ///
    /// Same retry semantics as `fetch_with_retry`. A body that does not decode
    /// into `T` counts as a retryable failure.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, FetchError> {
        let attempts = self.policy.attempts();
        let mut backoff = Backoff::with_cap(self.policy.initial_delay, self.policy.max_delay);

        for attempt in 1..=attempts {
            let is_last = attempt == attempts;
            debug!(url = %url, attempt, attempts, "fetching");

            match self.attempt::<T>(url).await {
                Ok(Attempt::Body(body)) => return Ok(Some(body)),
                Ok(Attempt::RateLimited) => {
                    if is_last {
                        warn!(url = %url, attempts, "still rate limited after final attempt, giving up");
                        break;
                    }
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = backoff.current_delay().as_millis() as u64,
                        "rate limited, backing off"
                    );
                    backoff.wait().await;
                }
                Err(err) => {
                    if is_last {
                        error!(url = %url, attempts, error = %err, "fetch failed, retries exhausted");
                        return Err(err);
                    }
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = backoff.current_delay().as_millis() as u64,
                        error = %err,
                        "fetch failed, retrying"
                    );
                    backoff.wait().await;
                }
            }
        }

        Ok(None)
    }

    /// Performs one GET and classifies the result
    async fn attempt<T: DeserializeOwned>(&self, url: &str) -> Result<Attempt<T>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_str(&text)
            .map(Attempt::Body)
            .map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            })
    }
}
