//! Client-side adaptive throttle.
//!
//! Widens or narrows the delay a caller should leave between content saves
//! based on the quota reported by the content store. Snapshots snap the
//! delay to a threshold table; error signals double it up to a ceiling.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::RateLimitSnapshot;

/// Delay when quota usage is healthy.
pub const BASELINE_DELAY: Duration = Duration::from_millis(30_000);

/// Upper bound for error-driven backoff.
pub const MAX_DELAY: Duration = Duration::from_millis(300_000);

/// (usage percent strictly above, delay), highest first.
const THRESHOLDS: [(f64, Duration); 3] = [
    (90.0, Duration::from_millis(120_000)),
    (80.0, Duration::from_millis(60_000)),
    (60.0, Duration::from_millis(45_000)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Critical,
    Warning,
    Caution,
}

/// Human-facing quota warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWarning {
    pub level: WarningLevel,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AdaptiveThrottle {
    current_delay: Duration,
    rate_limit: Option<RateLimitSnapshot>,
}

impl Default for AdaptiveThrottle {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveThrottle {
    pub fn new() -> Self {
        Self {
            current_delay: BASELINE_DELAY,
            rate_limit: None,
        }
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        self.rate_limit.as_ref()
    }

    /// Set the delay from the threshold table for this snapshot's usage.
    pub fn observe(&mut self, snapshot: RateLimitSnapshot) {
        self.current_delay = delay_for_usage(snapshot.usage_percent());
        self.rate_limit = Some(snapshot);
    }

    /// A save failed: double the delay, capped at [`MAX_DELAY`].
    pub fn record_error(&mut self) {
        self.current_delay = self.current_delay.saturating_mul(2).min(MAX_DELAY);
    }

    /// Back to baseline, forgetting the last snapshot.
    pub fn reset(&mut self) {
        self.current_delay = BASELINE_DELAY;
        self.rate_limit = None;
    }

    pub fn warning(&self) -> Option<RateLimitWarning> {
        let snapshot = self.rate_limit?;
        let usage = snapshot.usage_percent();
        let (level, message) = if usage > 90.0 {
            (
                WarningLevel::Critical,
                format!(
                    "Only {} saves left until {}. Saving is slowed down to avoid hitting the limit.",
                    snapshot.remaining,
                    snapshot.reset_at.format("%H:%M UTC")
                ),
            )
        } else if usage > 80.0 {
            (
                WarningLevel::Warning,
                format!(
                    "{} saves left in this window; autosave frequency reduced.",
                    snapshot.remaining
                ),
            )
        } else if usage > 60.0 {
            (
                WarningLevel::Caution,
                format!("{:.0}% of the save quota used.", usage),
            )
        } else {
            return None;
        };

        Some(RateLimitWarning {
            level,
            remaining: snapshot.remaining,
            reset_at: snapshot.reset_at,
            message,
        })
    }
}

/// Threshold table lookup; never interpolates.
pub fn delay_for_usage(usage_percent: f64) -> Duration {
    THRESHOLDS
        .iter()
        .find(|(above, _)| usage_percent > *above)
        .map(|(_, delay)| *delay)
        .unwrap_or(BASELINE_DELAY)
}
