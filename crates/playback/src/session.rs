//! Playback session state
//!
//! The session is owned by the controller task and mutated only there. It
//! keeps `position_ms <= duration_ms` at all times.

use serde::Serialize;
use std::fmt;
use storyplayer_core::{BookDescriptor, ErrorDescriptor, PlaybackSpeed, RemainingTime};

/// Whether audio is opened and controllable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportState {
    Idle,
    Loading,
    Ready,
    Error,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Tag distinguishing successive loads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session #{}", self.0)
    }
}

/// Read-only view of the session published to observers
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub session_id: SessionId,
    pub book: Option<BookDescriptor>,
    pub transport_state: TransportState,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub speed: PlaybackSpeed,
    pub remaining: RemainingTime,
    pub last_error: Option<ErrorDescriptor>,
}

impl PlaybackSnapshot {
    pub fn is_ready(&self) -> bool {
        self.transport_state == TransportState::Ready
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        PlaybackSession::new().snapshot()
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    id: SessionId,
    book: Option<BookDescriptor>,
    transport_state: TransportState,
    is_playing: bool,
    position_ms: u64,
    duration_ms: u64,
    speed: PlaybackSpeed,
    last_error: Option<ErrorDescriptor>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::default(),
            book: None,
            transport_state: TransportState::Idle,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            speed: PlaybackSpeed::NORMAL,
            last_error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn book(&self) -> Option<&BookDescriptor> {
        self.book.as_ref()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport_state
    }

    pub fn is_ready(&self) -> bool {
        self.transport_state == TransportState::Ready
    }

    /// Playing flag, only ever true while ready
    pub fn is_playing(&self) -> bool {
        self.is_ready() && self.is_playing
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn last_error(&self) -> Option<&ErrorDescriptor> {
        self.last_error.as_ref()
    }

    /// Starts a new load and returns the id that tags its status events
    pub fn begin_load(&mut self, book: BookDescriptor) -> SessionId {
        self.id = self.id.next();
        self.book = Some(book);
        self.transport_state = TransportState::Loading;
        self.is_playing = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.speed = PlaybackSpeed::NORMAL;
        self.last_error = None;
        self.id
    }

    /// Marks the load complete, clamping the restored position
    pub fn finish_load(&mut self, duration_ms: u64, restore_position_ms: u64) {
        self.transport_state = TransportState::Ready;
        self.is_playing = false;
        self.duration_ms = duration_ms;
        self.position_ms = restore_position_ms.min(duration_ms);
    }

    pub fn fail(&mut self, error: ErrorDescriptor) {
        self.transport_state = TransportState::Error;
        self.is_playing = false;
        self.last_error = Some(error);
    }

    /// Back to idle. The session id is kept so it keeps increasing.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Self::new();
        self.id = id;
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }

    /// Clamps any target, negative included, into `[0, duration]`
    pub fn clamp(&self, target_ms: i64) -> u64 {
        u64::try_from(target_ms).unwrap_or(0).min(self.duration_ms)
    }

    /// Seek target for a relative jump, before clamping
    pub fn jump_target(&self, delta_secs: i64) -> i64 {
        let current = i64::try_from(self.position_ms).unwrap_or(i64::MAX);
        current.saturating_add(delta_secs.saturating_mul(1000))
    }

    /// Updates the position, clamped to the duration
    pub fn set_position(&mut self, position_ms: u64) -> u64 {
        self.position_ms = position_ms.min(self.duration_ms);
        self.position_ms
    }

    /// Applies an engine report for the current session
    pub fn apply_status(&mut self, position_ms: u64, is_playing: bool) {
        self.set_position(position_ms);
        self.is_playing = is_playing;
    }

    /// End of book: stopped at the final position, still ready for replay
    pub fn finish(&mut self) {
        self.is_playing = false;
        self.position_ms = self.duration_ms;
    }

    pub fn remaining(&self) -> RemainingTime {
        RemainingTime::compute(self.position_ms, self.duration_ms, self.speed)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session_id: self.id,
            book: self.book.clone(),
            transport_state: self.transport_state,
            is_playing: self.is_playing(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            speed: self.speed,
            remaining: self.remaining(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}
