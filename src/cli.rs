//! Command-line interface parsing for pitwall
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! an `Action` with validated session kinds.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::openf1::SessionKind;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified session kind is not recognized
    #[error("Invalid session kind: '{0}'. Valid kinds: practice, qualifying, sprint, race")]
    InvalidKind(String),
}

/// pitwall - Formula 1 sessions and fastest laps from the OpenF1 API
#[derive(Parser, Debug)]
#[command(name = "pitwall")]
#[command(about = "Formula 1 sessions and fastest laps from the OpenF1 API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OpenF1 API root
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory for cached responses (defaults to the XDG cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep cached responses in memory only
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Attempts per upstream request
    #[arg(long, global = true, value_name = "N")]
    pub retries: Option<u32>,

    /// Wait before the first retry, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub initial_delay_ms: Option<u64>,

    /// Pause between per-session lookups, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub pace_ms: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the sessions of one kind for one or more seasons
    ///
    /// Examples:
    ///   pitwall sessions --year 2025
    ///   pitwall sessions --year 2024 2025 --kind qualifying
    Sessions {
        /// Season(s) to list
        #[arg(long = "year", required = true, num_args = 1.., value_name = "YEAR")]
        years: Vec<i32>,

        /// practice, qualifying, sprint or race
        #[arg(long, default_value = "practice", value_name = "KIND")]
        kind: String,
    },

    /// Show the fastest lap of every session of one kind in a season
    FastestLaps {
        #[arg(long, value_name = "YEAR")]
        year: i32,

        /// practice, qualifying, sprint or race
        #[arg(long, default_value = "race", value_name = "KIND")]
        kind: String,
    },

    /// List the drivers entered in a session
    Drivers {
        #[arg(long, value_name = "KEY")]
        session_key: u32,
    },

    /// Manage the local response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommand {
    /// Remove every cached entry
    Clear,
}

/// Validated work requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Sessions { years: Vec<i32>, kind: SessionKind },
    FastestLaps { year: i32, kind: SessionKind },
    Drivers { session_key: u32 },
    ClearCache,
}

/// Parses a session kind argument.
///
/// # Returns
/// * `Ok(SessionKind)` if the string matches a known kind
/// * `Err(CliError::InvalidKind)` otherwise
pub fn parse_kind_arg(s: &str) -> Result<SessionKind, CliError> {
    SessionKind::from_str(s).ok_or_else(|| CliError::InvalidKind(s.to_string()))
}

impl Action {
    /// Creates an Action from parsed CLI arguments
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        match &cli.command {
            Command::Sessions { years, kind } => Ok(Action::Sessions {
                years: years.clone(),
                kind: parse_kind_arg(kind)?,
            }),
            Command::FastestLaps { year, kind } => Ok(Action::FastestLaps {
                year: *year,
                kind: parse_kind_arg(kind)?,
            }),
            Command::Drivers { session_key } => Ok(Action::Drivers {
                session_key: *session_key,
            }),
            Command::Cache {
                action: CacheCommand::Clear,
            } => Ok(Action::ClearCache),
        }
    }
}
