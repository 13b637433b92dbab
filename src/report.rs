//! Plain-text rendering of loaded data for the terminal

use crate::openf1::{Driver, Session, SessionFastestLap};

/// Formats a lap time in seconds as `m:ss.mmm`
pub fn format_lap_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, secs, millis)
}

/// Start date of a session without the time part
fn session_date(session: &Session) -> &str {
    session
        .date_start
        .as_deref()
        .and_then(|date| date.get(..10))
        .unwrap_or("----------")
}

fn session_place(session: &Session) -> &str {
    session
        .circuit_short_name
        .as_deref()
        .or(session.location.as_deref())
        .or(session.country_name.as_deref())
        .unwrap_or("?")
}

pub fn format_session(session: &Session) -> String {
    format!(
        "{}  {:<18} {:<20} #{}",
        session_date(session),
        session.session_name.as_deref().unwrap_or("?"),
        session_place(session),
        session.session_key
    )
}

pub fn format_driver(driver: &Driver) -> String {
    format!(
        "#{:<3} {:<4} {:<24} {}",
        driver.driver_number,
        driver.name_acronym.as_deref().unwrap_or("---"),
        driver.full_name.as_deref().unwrap_or("?"),
        driver.team_name.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

pub fn format_fastest_lap(entry: &SessionFastestLap) -> String {
    let session = format!(
        "{}  {:<18} {:<20}",
        session_date(&entry.session),
        entry.session.session_name.as_deref().unwrap_or("?"),
        session_place(&entry.session)
    );

    match &entry.fastest_lap {
        Some(lap) => {
            let who = lap
                .driver
                .as_ref()
                .and_then(|d| d.name_acronym.clone().or_else(|| d.full_name.clone()))
                .unwrap_or_else(|| format!("#{}", lap.driver_number));
            format!(
                "{} {}  {} (lap {})",
                session,
                format_lap_time(lap.lap_duration),
                who,
                lap.lap_number
            )
        }
        None => format!("{} no timed laps", session),
    }
}
