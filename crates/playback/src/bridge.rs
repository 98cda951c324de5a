//! Status update bridge
//!
//! Engines report status through a [`StatusSink`] handed to them at open time.
//! Each sink is stamped with the session it was created for, so reports that
//! arrive after a newer load can be recognised and dropped by the controller.

use crate::session::SessionId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Engine-native status callback payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    pub position_ms: u64,
    pub is_playing: bool,
    pub did_just_finish: bool,
}

impl EngineStatus {
    pub fn playing(position_ms: u64) -> Self {
        Self {
            position_ms,
            is_playing: true,
            did_just_finish: false,
        }
    }

    pub fn paused(position_ms: u64) -> Self {
        Self {
            position_ms,
            is_playing: false,
            did_just_finish: false,
        }
    }

    pub fn finished(position_ms: u64) -> Self {
        Self {
            position_ms,
            is_playing: false,
            did_just_finish: true,
        }
    }
}

/// A status report tagged with the session that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub session: SessionId,
    pub status: EngineStatus,
}

/// Status cadences below this are raised to it
pub const MIN_STATUS_INTERVAL: Duration = Duration::from_millis(100);

type Forward = Arc<dyn Fn(StatusReport) -> bool + Send + Sync>;

/// Creates per-session sinks that forward into one destination
#[derive(Clone)]
pub struct StatusBridge {
    forward: Forward,
    interval: Duration,
}

impl StatusBridge {
    /// Intervals below [`MIN_STATUS_INTERVAL`] are raised to it
    pub fn new<F>(interval: Duration, forward: F) -> Self
    where
        F: Fn(StatusReport) -> bool + Send + Sync + 'static,
    {
        Self {
            forward: Arc::new(forward),
            interval: interval.max(MIN_STATUS_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sink(&self, session: SessionId) -> StatusSink {
        StatusSink {
            session,
            forward: Arc::clone(&self.forward),
            interval: self.interval,
        }
    }
}

impl fmt::Debug for StatusBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBridge")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Where an engine sends status callbacks for one opened track
#[derive(Clone)]
pub struct StatusSink {
    session: SessionId,
    forward: Forward,
    interval: Duration,
}

impl StatusSink {
    /// A sink feeding a plain channel, for engines tested on their own
    pub fn channel(
        session: SessionId,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<StatusReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = StatusBridge::new(interval, move |report| tx.send(report).is_ok());
        (bridge.sink(session), rx)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Requested cadence of free-running status reports
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forwards a report. Returns false once nobody is listening.
    pub fn report(&self, status: EngineStatus) -> bool {
        (self.forward)(StatusReport {
            session: self.session,
            status,
        })
    }
}

impl fmt::Debug for StatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSink")
            .field("session", &self.session)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
