//! Millisecond time formatting for the player screen

use crate::types::PlaybackSpeed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formats milliseconds as `m:ss`
///
/// Minutes are not wrapped into hours, so a 75 minute position reads `75:03`.
pub fn format_clock(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    format!("{}:{:02}", minutes, seconds)
}

/// Formats milliseconds as `H:MM:SS` (always shows hours)
pub fn format_hms(millis: u64) -> String {
    RemainingTime::from_millis(millis).to_string()
}

/// Wall-clock time left in a book, split into display components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RemainingTime {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl RemainingTime {
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Splits a millisecond span into whole hours, minutes and seconds
    pub fn from_millis(millis: u64) -> Self {
        let total_seconds = millis / 1000;
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
        }
    }

    /// Time left listening from `position_ms` to `duration_ms` at `speed`
    ///
    /// A position past the end yields zero rather than wrapping.
    pub fn compute(position_ms: u64, duration_ms: u64, speed: PlaybackSpeed) -> Self {
        let left = duration_ms.saturating_sub(position_ms);
        let scaled = (left as f64 / speed.value()).floor();
        Self::from_millis(scaled as u64)
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}
