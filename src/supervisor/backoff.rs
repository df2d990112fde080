//! Restart history and exponential backoff.
//!
//! A sliding window of restart timestamps drives both the backoff delay
//! and the rate check that can force escalation.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct BackoffOptions {
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    pub max_restarts: u32,
    pub time_window: Duration,
    pub escalate_on_exceeded: bool,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            max_restarts: 3,
            time_window: Duration::from_secs(60),
            escalate_on_exceeded: true,
        }
    }
}

/// Timestamped restart history for a single child, with exponential
/// backoff and sliding-window rate limiting.
#[derive(Debug, Clone, Default)]
pub struct RestartHistory {
    restarts: VecDeque<DateTime<Utc>>,
}

impl RestartHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_restart(&mut self, at: DateTime<Utc>) {
        self.restarts.push_back(at);
    }

    pub fn reset(&mut self) {
        self.restarts.clear();
    }

    /// Restarts within `window` of `now`, counting backward.
    pub fn restarts_in_window(&self, now: DateTime<Utc>, window: Duration) -> u32 {
        self.restarts
            .iter()
            .filter(|t| {
                now.signed_duration_since(**t)
                    .to_std()
                    .map(|age| age <= window)
                    .unwrap_or(false)
            })
            .count() as u32
    }

    /// `InitialBackoff * Multiplier^(k-1)` where `k` is the current
    /// restart count, clamped to `MaxBackoff`. Empty history yields
    /// `InitialBackoff`.
    pub fn calculate_backoff(&self, options: &BackoffOptions) -> Duration {
        let k = self.restarts.len() as i32;
        if k == 0 {
            return options.initial_backoff;
        }
        let proposed_millis =
            options.initial_backoff.as_millis() as f64 * options.backoff_multiplier.powi(k - 1);
        let proposed = Duration::from_millis(proposed_millis.max(0.0) as u64);
        proposed.min(options.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_then_clamps() {
        let options = BackoffOptions {
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(1),
            ..Default::default()
        };
        let mut history = RestartHistory::new();
        let now = Utc::now();
        assert_eq!(history.calculate_backoff(&options), Duration::from_millis(100));

        history.record_restart(now);
        assert_eq!(history.calculate_backoff(&options), Duration::from_millis(100));

        history.record_restart(now);
        assert_eq!(history.calculate_backoff(&options), Duration::from_millis(200));

        for _ in 0..10 {
            history.record_restart(now);
        }
        assert_eq!(history.calculate_backoff(&options), Duration::from_secs(1));
    }

    #[test]
    fn reset_clears_history() {
        let options = BackoffOptions::default();
        let mut history = RestartHistory::new();
        history.record_restart(Utc::now());
        history.record_restart(Utc::now());
        history.reset();
        assert_eq!(history.calculate_backoff(&options), options.initial_backoff);
    }

    #[test]
    fn restarts_in_window_excludes_old_entries() {
        let mut history = RestartHistory::new();
        let now = Utc::now();
        history.record_restart(now - chrono::Duration::seconds(120));
        history.record_restart(now - chrono::Duration::seconds(5));
        let count = history.restarts_in_window(now, Duration::from_secs(60));
        assert_eq!(count, 1);
    }
}
