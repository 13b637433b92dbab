//! pitwall - Formula 1 sessions and fastest laps from the OpenF1 API
//!
//! Loads session lists, driver entries and fastest laps through a local TTL
//! cache, retrying the rate-limited upstream with exponential backoff.

use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use pitwall::cli::{Action, Cli};
use pitwall::config::Config;
use pitwall::openf1::LoadError;
use pitwall::report;

/// Log filter used when `RUST_LOG` is unset
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pitwall=debug"
    } else {
        "pitwall=info"
    }
}

/// Sends log output to stderr so stdout stays clean for results
///
/// `RUST_LOG` takes precedence over the `--verbose` flag.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(action: Action, config: &Config) -> Result<(), LoadError> {
    let loader = config.loader();

    match action {
        Action::Sessions { years, kind } => {
            // Different seasons are independent keys and may load concurrently
            let results = join_all(years.iter().map(|year| loader.sessions(*year, kind))).await;

            for (year, result) in years.iter().zip(results) {
                let sessions = result?;
                println!("{} {} sessions ({})", year, kind.label(), sessions.len());
                for session in &sessions {
                    println!("  {}", report::format_session(session));
                }
            }
        }
        Action::FastestLaps { year, kind } => {
            let entries = loader.fastest_laps(year, kind).await?;
            println!("{} {} fastest laps", year, kind.label());
            for entry in &entries {
                println!("  {}", report::format_fastest_lap(entry));
            }
        }
        Action::Drivers { session_key } => {
            let drivers = loader.drivers(session_key).await?;
            println!("Drivers in session #{} ({})", session_key, drivers.len());
            for driver in &drivers {
                println!("  {}", report::format_driver(driver));
            }
        }
        Action::ClearCache => {
            let removed = loader.cache().clear();
            println!("Removed {} cached entries", removed);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let action = match Action::from_cli(&cli) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };
    let config = Config::from_cli(&cli);

    match run(action, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("could not load data: {}", e);
            ExitCode::FAILURE
        }
    }
}
