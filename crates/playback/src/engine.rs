//! Audio engine capability surface
//!
//! The controller never decodes audio itself. It drives an engine through this
//! trait and receives out-of-band status through the [`StatusSink`] given to
//! `open`.

use crate::bridge::StatusSink;
use crate::error::EngineResult;
use async_trait::async_trait;
use storyplayer_core::PlaybackSpeed;

#[async_trait]
pub trait AudioEngine: Send + 'static {
    /// Opens `uri` positioned at `initial_position_ms` and returns its
    /// duration in milliseconds, 0 when it cannot be determined.
    ///
    /// Any previously opened track has already been closed by the caller.
    async fn open(
        &mut self,
        uri: &str,
        initial_position_ms: u64,
        sink: StatusSink,
    ) -> EngineResult<u64>;

    async fn resume(&mut self) -> EngineResult<()>;

    async fn pause(&mut self) -> EngineResult<()>;

    async fn set_position(&mut self, position_ms: u64) -> EngineResult<()>;

    async fn set_rate(&mut self, speed: PlaybackSpeed) -> EngineResult<()>;

    /// Releases the open track. Status reports stop after this returns.
    async fn close(&mut self) -> EngineResult<()>;
}
