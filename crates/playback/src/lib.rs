//! Playback controller for storyplayer
//!
//! Owns audio transport state for one book at a time, keeps it in step with a
//! durable position store and reconciles it across foreground/background
//! transitions.
//!
//! ```rust,no_run
//! use storyplayer_core::BookDescriptor;
//! use storyplayer_playback::{
//!     ControllerConfig, PlaybackController, PositionStore, SimulatedEngine,
//! };
//!
//! # async fn demo() -> storyplayer_core::PlayerResult<()> {
//! let engine = SimulatedEngine::new().with_audio("dune.mp3", 600_000);
//! let controller = PlaybackController::spawn(
//!     engine,
//!     PositionStore::in_memory(),
//!     ControllerConfig::default(),
//! );
//!
//! controller.load(BookDescriptor::new("Dune", "dune.mp3")).await?;
//! controller.play().await?;
//! controller.jump(-15).await?;
//! # Ok(())
//! # }
//! ```

mod autosave;
mod bridge;
mod controller;
mod engine;
mod error;
mod lifecycle;
mod session;
mod simulated;
mod store;

pub use autosave::{SaveThrottle, MIN_SAVE_INTERVAL};
pub use bridge::{EngineStatus, StatusBridge, StatusReport, StatusSink, MIN_STATUS_INTERVAL};
pub use controller::{ControllerConfig, ControllerHandle, PlaybackController, MIN_ENGINE_TIMEOUT};
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use lifecycle::{AppState, LifecycleMonitor};
pub use session::{PlaybackSession, PlaybackSnapshot, SessionId, TransportState};
pub use simulated::{EngineCall, EngineOp, SimulatedEngine};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, PersistedPlaybackState, PositionStore,
    LAST_BOOK_KEY, LAST_POSITION_KEY,
};
pub use storyplayer_core::{BookDescriptor, PlaybackSpeed, PlayerError, PlayerResult};
