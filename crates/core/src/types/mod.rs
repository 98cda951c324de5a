//! Domain types for storyplayer
//!
//! This module contains all domain models organized by responsibility:
//! - `book`: the book descriptor handed to the player
//! - `playback`: playback speed
//! - `time`: millisecond formatting and remaining-time computation
//! - `common`: shared traits

mod book;
mod common;
mod playback;
mod time;

pub use book::BookDescriptor;
pub use common::Validator;
pub use playback::PlaybackSpeed;
pub use time::{format_clock, format_hms, RemainingTime};
