//! Runtime configuration
//!
//! Collects the upstream root, retry policy, pacing and cache location into a
//! `Config`, and turns it into a ready-to-use `Loader`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{FileStore, KeyValueStore, MemoryStore, TtlCache};
use crate::cli::Cli;
use crate::fetch::{Fetcher, RetryPolicy};
use crate::openf1::loader::DEFAULT_PACING;
use crate::openf1::{Endpoints, Loader, OPENF1_BASE_URL};

/// Where cached payloads live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// The XDG cache directory
    Default,
    /// A caller-chosen directory
    Dir(PathBuf),
    /// Process memory only; nothing survives the run
    Memory,
}

/// Settings for a loader run
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenF1 API root
    pub base_url: String,
    /// Retry behaviour of every upstream request
    pub retry: RetryPolicy,
    /// Pause between successive per-session lookups
    pub pacing: Duration,
    pub cache: CacheLocation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: OPENF1_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            pacing: DEFAULT_PACING,
            cache: CacheLocation::Default,
        }
    }
}

impl Config {
    /// Applies command-line overrides on top of the defaults
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Config::default();

        if let Some(base_url) = &cli.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(retries) = cli.retries {
            config.retry.max_retries = retries;
        }
        if let Some(ms) = cli.initial_delay_ms {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = cli.pace_ms {
            config.pacing = Duration::from_millis(ms);
        }

        config.cache = if cli.no_cache {
            CacheLocation::Memory
        } else if let Some(dir) = &cli.cache_dir {
            CacheLocation::Dir(dir.clone())
        } else {
            CacheLocation::Default
        };

        config
    }

    /// Opens the backing store for the configured cache location
    ///
    /// Falls back to an in-memory store when no cache directory can be
    /// determined for the current user.
    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match &self.cache {
            CacheLocation::Memory => Arc::new(MemoryStore::new()),
            CacheLocation::Dir(dir) => Arc::new(FileStore::with_dir(dir.clone())),
            CacheLocation::Default => match FileStore::new() {
                Some(store) => {
                    debug!(dir = %store.dir().display(), "using cache directory");
                    Arc::new(store)
                }
                None => {
                    warn!("no cache directory available, caching in memory only");
                    Arc::new(MemoryStore::new())
                }
            },
        }
    }

    /// Builds a loader wired to this configuration
    pub fn loader(&self) -> Loader<Arc<dyn KeyValueStore>> {
        let fetcher = Fetcher::new().with_policy(self.retry.clone());
        let cache = TtlCache::new(self.open_store());
        Loader::new(fetcher, cache, Endpoints::new(self.base_url.clone())).with_pacing(self.pacing)
    }
}
