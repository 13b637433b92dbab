//! Cooperative pauses and capped exponential backoff
//!
//! `pause` is the single suspension primitive used both between retry attempts
//! and for deliberate pacing between successive upstream requests. `Backoff`
//! tracks the per-call retry state.

use std::time::Duration;

/// Upper bound for any single backoff wait
pub const MAX_BACKOFF: Duration = Duration::from_millis(8000);

/// Suspends the current task for `duration`
///
/// A zero duration returns immediately without yielding to the timer.
pub async fn pause(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}

/// Retry state for a single fetch invocation
///
/// Starts at `initial` and doubles after every retryable outcome, never
/// exceeding `cap`. Not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    /// Number of delays handed out so far
    attempt: u32,
    /// Delay that the next call to `advance` will return
    current_delay: Duration,
    cap: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial`, capped at `MAX_BACKOFF`
    pub fn new(initial: Duration) -> Self {
        Self::with_cap(initial, MAX_BACKOFF)
    }

    /// Creates a backoff with a custom cap
    ///
    /// An `initial` larger than `cap` is clamped down to `cap`.
    pub fn with_cap(initial: Duration, cap: Duration) -> Self {
        Self {
            attempt: 0,
            current_delay: initial.min(cap),
            cap,
        }
    }

    /// Returns the delay to wait now and doubles the next one up to the cap
    pub fn advance(&mut self) -> Duration {
        let delay = self.current_delay;
        self.current_delay = self.current_delay.saturating_mul(2).min(self.cap);
        self.attempt += 1;
        delay
    }

    /// Number of delays handed out so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay the next `advance` will return
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Waits for the current delay, then advances the state
    pub async fn wait(&mut self) -> Duration {
        let delay = self.advance();
        pause(delay).await;
        delay
    }
}
