//! Playback-related domain models

use crate::error::PlayerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback speed restricted to the multipliers offered by the player
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    /// Every multiplier the player accepts, slowest first
    pub const ALLOWED: [f64; 6] = [0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

    pub const NORMAL: Self = Self(1.0);

    /// Creates a speed from one of the allowed multipliers
    pub fn new(value: f64) -> Result<Self, PlayerError> {
        Self::ALLOWED
            .iter()
            .copied()
            .find(|allowed| (allowed - value).abs() < 1e-9)
            .map(Self)
            .ok_or(PlayerError::InvalidSpeed { value })
    }

    /// Returns the multiplier
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_normal(&self) -> bool {
        *self == Self::NORMAL
    }

    /// The next faster multiplier, wrapping back to the slowest
    pub fn next(&self) -> Self {
        let index = Self::ALLOWED
            .iter()
            .position(|allowed| *allowed == self.0)
            .unwrap_or(1);
        Self(Self::ALLOWED[(index + 1) % Self::ALLOWED.len()])
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for PlaybackSpeed {
    type Error = PlayerError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}
