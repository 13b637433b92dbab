//! Cache-first loading of OpenF1 data
//!
//! Every lookup follows the same sequence: ask the TTL cache, fall back to the
//! retrying fetcher on a miss, then write the upstream payload back under the
//! lookup's key. Per-session lookups in a season run one after another with a
//! deliberate pause in between to stay under the upstream rate limit.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    drivers_key, fastest_lap_key, Driver, Endpoints, FastestLap, Lap, Session, SessionKind,
    SESSION_DETAIL_TTL_MINUTES,
};
use crate::cache::{year_matches, KeyValueStore, TtlCache};
use crate::delay::pause;
use crate::fetch::{FetchError, Fetcher};

/// Default pause between successive per-session lookups
pub const DEFAULT_PACING: Duration = Duration::from_millis(200);

/// Errors that can occur while loading data
#[derive(Debug, Error)]
pub enum LoadError {
    /// The upstream could not be reached within the retry budget
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The upstream answered with JSON of an unexpected shape
    #[error("unexpected response shape for '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A session paired with its fastest lap, if one could be determined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionFastestLap {
    pub session: Session,
    pub fastest_lap: Option<FastestLap>,
}

/// Loads sessions, drivers and fastest laps through the TTL cache
#[derive(Debug, Clone)]
pub struct Loader<S> {
    fetcher: Fetcher,
    cache: TtlCache<S>,
    endpoints: Endpoints,
    pacing: Duration,
}

impl<S: KeyValueStore> Loader<S> {
    pub fn new(fetcher: Fetcher, cache: TtlCache<S>, endpoints: Endpoints) -> Self {
        Self {
            fetcher,
            cache,
            endpoints,
            pacing: DEFAULT_PACING,
        }
    }

    /// Sets the pause inserted between per-session upstream lookups
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn cache(&self) -> &TtlCache<S> {
        &self.cache
    }

    /// Lists the sessions of `kind` in `year`
    ///
    /// Cached lists whose records belong to a different season are discarded
    /// and refetched.
    pub async fn sessions(&self, year: i32, kind: SessionKind) -> Result<Vec<Session>, LoadError> {
        let key = kind.cache_key(year);
        let url = self.endpoints.sessions(year, kind);
        self.load_list(&key, kind.ttl_minutes(), &url, true).await
    }

    /// Lists the practice sessions in `year`
    pub async fn practice_sessions(&self, year: i32) -> Result<Vec<Session>, LoadError> {
        self.sessions(year, SessionKind::Practice).await
    }

    /// Lists the drivers entered in a session
    pub async fn drivers(&self, session_key: u32) -> Result<Vec<Driver>, LoadError> {
        let key = drivers_key(session_key);
        let url = self.endpoints.drivers(session_key);
        self.load_list(&key, SESSION_DETAIL_TTL_MINUTES, &url, false).await
    }

    /// Finds the fastest lap of a session, with the driver who set it
    ///
    /// Returns `Ok(None)` when the session has no timed laps yet.
    pub async fn fastest_lap(&self, session_key: u32) -> Result<Option<FastestLap>, LoadError> {
        if let Some(cached) = self.cached_fastest_lap(session_key) {
            return Ok(Some(cached));
        }
        self.fetch_fastest_lap(session_key).await
    }

    /// Lists the sessions of `kind` in `year` with each session's fastest lap
    ///
    /// The session list is loaded first. Sessions are then visited in order;
    /// a failure for one session is logged and leaves its lap empty rather
    /// than aborting the season.
    pub async fn fastest_laps(
        &self,
        year: i32,
        kind: SessionKind,
    ) -> Result<Vec<SessionFastestLap>, LoadError> {
        let sessions = self.sessions(year, kind).await?;
        let mut results = Vec::with_capacity(sessions.len());
        let mut fetched_any = false;

        for session in sessions {
            let session_key = session.session_key;

            let fastest_lap = match self.cached_fastest_lap(session_key) {
                Some(hit) => Some(hit),
                None => {
                    if fetched_any {
                        pause(self.pacing).await;
                    }
                    fetched_any = true;

                    match self.fetch_fastest_lap(session_key).await {
                        Ok(lap) => lap,
                        Err(err) => {
                            warn!(session_key, error = %err, "could not load fastest lap");
                            None
                        }
                    }
                }
            };

            results.push(SessionFastestLap {
                session,
                fastest_lap,
            });
        }

        Ok(results)
    }

    fn cached_fastest_lap(&self, session_key: u32) -> Option<FastestLap> {
        self.cache
            .get_as(&fastest_lap_key(session_key), SESSION_DETAIL_TTL_MINUTES)
    }

    async fn fetch_fastest_lap(&self, session_key: u32) -> Result<Option<FastestLap>, LoadError> {
        let laps: Vec<Lap> = self.fetch_list("laps", &self.endpoints.laps(session_key)).await?;

        let Some(mut fastest) = FastestLap::from_laps(&laps) else {
            debug!(session_key, laps = laps.len(), "no timed laps");
            return Ok(None);
        };

        pause(self.pacing).await;
        fastest.driver = self.lookup_driver(session_key, fastest.driver_number).await;

        if let Err(err) = self.cache.set(&fastest_lap_key(session_key), &fastest) {
            warn!(session_key, error = %err, "failed to cache fastest lap");
        }

        info!(
            session_key,
            driver_number = fastest.driver_number,
            lap_duration = fastest.lap_duration,
            "fastest lap loaded"
        );
        Ok(Some(fastest))
    }

    /// Driver details are decoration; a failed lookup leaves them empty
    async fn lookup_driver(&self, session_key: u32, driver_number: u32) -> Option<Driver> {
        let url = self.endpoints.driver(session_key, driver_number);
        match self.fetch_list::<Driver>("drivers", &url).await {
            Ok(drivers) => drivers.into_iter().next(),
            Err(err) => {
                warn!(session_key, driver_number, error = %err, "driver lookup failed");
                None
            }
        }
    }

    /// Cache-first load of a JSON array, storing the upstream payload verbatim
    async fn load_list<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_minutes: u64,
        url: &str,
        check_year: bool,
    ) -> Result<Vec<T>, LoadError> {
        let cached = if check_year {
            self.cache
                .get_validated(key, ttl_minutes, |data| year_matches(key, data))
        } else {
            self.cache.get(key, ttl_minutes)
        };

        if let Some(data) = cached {
            match serde_json::from_value::<Vec<T>>(data) {
                Ok(records) => {
                    debug!(key, records = records.len(), "served from cache");
                    return Ok(records);
                }
                Err(err) => {
                    warn!(key, error = %err, "cached payload has unexpected shape, evicting");
                    self.cache.remove(key);
                }
            }
        }

        let Some(payload) = self.fetcher.fetch_with_retry(url).await? else {
            warn!(key, "upstream returned no data");
            return Ok(Vec::new());
        };

        let records = decode_list(key, payload.clone())?;
        if let Err(err) = self.cache.set(key, &payload) {
            warn!(key, error = %err, "failed to cache payload");
        }

        info!(key, records = records.len(), "loaded from upstream");
        Ok(records)
    }

    /// Uncached fetch of a JSON array
    async fn fetch_list<T: DeserializeOwned>(&self, what: &str, url: &str) -> Result<Vec<T>, LoadError> {
        match self.fetcher.fetch_with_retry(url).await? {
            Some(payload) => decode_list(what, payload),
            None => Ok(Vec::new()),
        }
    }
}

fn decode_list<T: DeserializeOwned>(key: &str, payload: Value) -> Result<Vec<T>, LoadError> {
    serde_json::from_value(payload).map_err(|source| LoadError::Decode {
        key: key.to_string(),
        source,
    })
}
