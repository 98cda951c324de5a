//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use storyplayer_core::PlaybackSpeed;

/// Playback controller tuning and transport preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Speed a freshly loaded book starts at
    pub default_speed: f64,

    /// How often the engine reports position, in milliseconds
    pub status_interval_ms: u64,

    /// Minimum gap between position saves while playing, in milliseconds
    pub save_throttle_ms: u64,

    /// Drift allowed between stored and live position before a corrective
    /// seek on returning to the foreground, in milliseconds
    pub resume_tolerance_ms: u64,

    /// Upper bound on a single audio engine call, in milliseconds
    pub engine_timeout_ms: u64,

    /// Seconds skipped by the "back" control
    pub jump_back_secs: u64,

    /// Seconds skipped by the "forward" control
    pub jump_forward_secs: u64,

    /// Reopen the last book when the player starts
    pub restore_on_start: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            status_interval_ms: 1000,
            save_throttle_ms: 1000,
            resume_tolerance_ms: 1500,
            engine_timeout_ms: 15_000,
            jump_back_secs: 15,
            jump_forward_secs: 30,
            restore_on_start: true,
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::one_of(
                &self.default_speed,
                &PlaybackSpeed::ALLOWED,
                "player.default_speed",
            ),
            Validator::in_range(self.status_interval_ms, 100, 5000, "player.status_interval_ms"),
            Validator::in_range(self.save_throttle_ms, 1000, 60_000, "player.save_throttle_ms"),
            Validator::in_range(
                self.resume_tolerance_ms,
                0,
                10_000,
                "player.resume_tolerance_ms",
            ),
            Validator::in_range(self.engine_timeout_ms, 100, 120_000, "player.engine_timeout_ms"),
            Validator::in_range(self.jump_back_secs, 1, 300, "player.jump_back_secs"),
            Validator::in_range(self.jump_forward_secs, 1, 300, "player.jump_forward_secs"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.default_speed = other.default_speed;
        self.status_interval_ms = other.status_interval_ms;
        self.save_throttle_ms = other.save_throttle_ms;
        self.resume_tolerance_ms = other.resume_tolerance_ms;
        self.engine_timeout_ms = other.engine_timeout_ms;
        self.jump_back_secs = other.jump_back_secs;
        self.jump_forward_secs = other.jump_forward_secs;
        self.restore_on_start = other.restore_on_start;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}

impl PlayerConfig {
    /// The default speed as a validated multiplier, normal speed if invalid
    pub fn speed(&self) -> PlaybackSpeed {
        PlaybackSpeed::new(self.default_speed).unwrap_or_else(|e| {
            log::warn!("{}, falling back to normal speed", e);
            PlaybackSpeed::NORMAL
        })
    }

    /// Copy with every out-of-range field replaced by its default
    ///
    /// Loading keeps invalid values so a hand-edited file can be fixed; this
    /// is what the player actually runs with.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            default_speed: self.speed().value(),
            status_interval_ms: or_default(
                Validator::in_range(self.status_interval_ms, 100, 5000, "player.status_interval_ms"),
                self.status_interval_ms,
                defaults.status_interval_ms,
            ),
            save_throttle_ms: or_default(
                Validator::in_range(self.save_throttle_ms, 1000, 60_000, "player.save_throttle_ms"),
                self.save_throttle_ms,
                defaults.save_throttle_ms,
            ),
            resume_tolerance_ms: or_default(
                Validator::in_range(
                    self.resume_tolerance_ms,
                    0,
                    10_000,
                    "player.resume_tolerance_ms",
                ),
                self.resume_tolerance_ms,
                defaults.resume_tolerance_ms,
            ),
            engine_timeout_ms: or_default(
                Validator::in_range(self.engine_timeout_ms, 100, 120_000, "player.engine_timeout_ms"),
                self.engine_timeout_ms,
                defaults.engine_timeout_ms,
            ),
            jump_back_secs: or_default(
                Validator::in_range(self.jump_back_secs, 1, 300, "player.jump_back_secs"),
                self.jump_back_secs,
                defaults.jump_back_secs,
            ),
            jump_forward_secs: or_default(
                Validator::in_range(self.jump_forward_secs, 1, 300, "player.jump_forward_secs"),
                self.jump_forward_secs,
                defaults.jump_forward_secs,
            ),
            restore_on_start: self.restore_on_start,
        }
    }
}

fn or_default<T: std::fmt::Display>(
    check: Result<(), ValidationError>,
    value: T,
    default: T,
) -> T {
    match check {
        Ok(()) => value,
        Err(e) => {
            log::warn!("{}, using default {}", e, default);
            default
        }
    }
}
