//! Application lifecycle monitor
//!
//! Hosts report foreground/background changes with [`LifecycleMonitor::notify`].
//! Only edges are published; repeating the current state is ignored.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// In the foreground
    Active,
    /// In the background, audio may keep playing
    Suspended,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

pub struct LifecycleMonitor {
    current: Mutex<AppState>,
    events: broadcast::Sender<AppState>,
}

impl LifecycleMonitor {
    /// A monitor for an application that starts in the foreground
    pub fn new() -> Self {
        Self::with_state(AppState::Active)
    }

    pub fn with_state(initial: AppState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: Mutex::new(initial),
            events,
        }
    }

    pub fn current(&self) -> AppState {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a host notification. Returns true if it was a transition.
    pub fn notify(&self, state: AppState) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == state {
            log::debug!("Ignoring repeated {} notification", state);
            return false;
        }

        log::info!("App {} -> {}", *current, state);
        *current = state;
        // Sent under the lock so subscribers see edges in order
        let _ = self.events.send(state);
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.events.subscribe()
    }
}

impl Default for LifecycleMonitor {
    fn default() -> Self {
        Self::new()
    }
}
