//! OpenF1 data model and endpoint construction
//!
//! This module contains the record types returned by the OpenF1 API, the
//! session kinds the loader knows how to request, and the cache key and TTL
//! conventions for each of them.

pub mod loader;

pub use loader::{LoadError, Loader, SessionFastestLap};

use serde::{Deserialize, Serialize};

/// Public OpenF1 API root
pub const OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";

/// TTL for session-list lookups, in minutes
pub const SESSION_TTL_MINUTES: u64 = 60;

/// TTL for qualifying lookups, in minutes
pub const QUALIFYING_TTL_MINUTES: u64 = 1440;

/// TTL for per-session lookups (fastest lap, drivers) of past sessions
pub const SESSION_DETAIL_TTL_MINUTES: u64 = 1440;

/// A single F1 session (practice, qualifying, sprint or race)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier of the session
    pub session_key: u32,
    /// e.g. "Practice 1", "Sprint Qualifying", "Race"
    pub session_name: Option<String>,
    /// e.g. "Practice", "Qualifying", "Race"
    pub session_type: Option<String>,
    /// ISO 8601 start time
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub year: Option<i32>,
    pub meeting_key: Option<u32>,
    pub circuit_short_name: Option<String>,
    pub country_name: Option<String>,
    pub location: Option<String>,
}

/// A single lap driven in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub session_key: u32,
    pub driver_number: u32,
    pub lap_number: u32,
    /// Lap time in seconds; missing for out-laps and incomplete laps
    pub lap_duration: Option<f64>,
}

/// A driver entry for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_number: u32,
    pub full_name: Option<String>,
    /// Three-letter abbreviation, e.g. "VER"
    pub name_acronym: Option<String>,
    pub team_name: Option<String>,
    pub session_key: Option<u32>,
}

/// The quickest timed lap of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestLap {
    pub session_key: u32,
    pub driver_number: u32,
    pub lap_number: u32,
    /// Lap time in seconds
    pub lap_duration: f64,
    /// Driver details, when the driver lookup succeeded
    pub driver: Option<Driver>,
}

impl FastestLap {
    /// Picks the lap with the smallest recorded duration
    ///
    /// Laps without a duration, or with a non-positive or non-finite one, are
    /// ignored. Returns `None` when no lap qualifies.
    pub fn from_laps(laps: &[Lap]) -> Option<Self> {
        laps.iter()
            .filter_map(|lap| {
                lap.lap_duration
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .map(|d| (lap, d))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(lap, duration)| FastestLap {
                session_key: lap.session_key,
                driver_number: lap.driver_number,
                lap_number: lap.lap_number,
                lap_duration: duration,
                driver: None,
            })
    }
}

/// The session families the loader can list for a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Practice,
    Qualifying,
    Sprint,
    Race,
}

impl SessionKind {
    /// Parses a user-supplied kind name (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "practice" | "fp" => Some(SessionKind::Practice),
            "qualifying" | "quali" | "q" => Some(SessionKind::Qualifying),
            "sprint" => Some(SessionKind::Sprint),
            "race" => Some(SessionKind::Race),
            _ => None,
        }
    }

    /// Query string filter selecting this kind on the sessions endpoint
    ///
    /// Sprints are reported by OpenF1 with `session_type=Race`, so sprint,
    /// qualifying and race lookups filter by session name instead.
    pub fn query(&self) -> &'static str {
        match self {
            SessionKind::Practice => "session_type=Practice",
            SessionKind::Qualifying => "session_name=Qualifying",
            SessionKind::Sprint => "session_name=Sprint",
            SessionKind::Race => "session_name=Race",
        }
    }

    /// Cache key for this kind's session list in `year`
    pub fn cache_key(&self, year: i32) -> String {
        let domain = match self {
            SessionKind::Practice => "f1PracticeSessions",
            SessionKind::Qualifying => "f1QualifyingSessions",
            SessionKind::Sprint => "f1SprintSessions",
            SessionKind::Race => "f1RaceSessions",
        };
        format!("{}_{}", domain, year)
    }

    pub fn ttl_minutes(&self) -> u64 {
        match self {
            SessionKind::Qualifying => QUALIFYING_TTL_MINUTES,
            _ => SESSION_TTL_MINUTES,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Practice => "Practice",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Race => "Race",
        }
    }
}

/// Cache key for the fastest lap of a session
pub fn fastest_lap_key(session_key: u32) -> String {
    format!("fastestLap_{}", session_key)
}

/// Cache key for the driver list of a session
pub fn drivers_key(session_key: u32) -> String {
    format!("f1Drivers_{}", session_key)
}

/// Builds OpenF1 request URLs against a configurable root
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(OPENF1_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/sessions?year=..&<kind filter>`
    pub fn sessions(&self, year: i32, kind: SessionKind) -> String {
        format!("{}/sessions?year={}&{}", self.base_url, year, kind.query())
    }

    /// `/laps?session_key=..`
    pub fn laps(&self, session_key: u32) -> String {
        format!("{}/laps?session_key={}", self.base_url, session_key)
    }

    /// `/drivers?session_key=..`
    pub fn drivers(&self, session_key: u32) -> String {
        format!("{}/drivers?session_key={}", self.base_url, session_key)
    }

    /// `/drivers?session_key=..&driver_number=..`
    pub fn driver(&self, session_key: u32, driver_number: u32) -> String {
        format!(
            "{}/drivers?session_key={}&driver_number={}",
            self.base_url, session_key, driver_number
        )
    }
}
