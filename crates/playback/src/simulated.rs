//! Simulated audio engine
//!
//! Plays a catalogue of silent tracks of known duration on the tokio clock.
//! Clones share state, so a caller can keep one clone to inspect recorded
//! calls, inject failures and push status reports by hand while the
//! controller owns another.

use crate::bridge::{EngineStatus, StatusSink};
use crate::engine::AudioEngine;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use storyplayer_core::PlaybackSpeed;
use tokio::time::MissedTickBehavior;

/// Engine operation, used to target failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Open,
    Resume,
    Pause,
    SetPosition,
    SetRate,
    Close,
}

/// A call received by the engine, in order of arrival
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Open {
        uri: String,
        initial_position_ms: u64,
    },
    Resume,
    Pause,
    SetPosition(u64),
    SetRate(f64),
    Close,
}

impl EngineCall {
    pub fn op(&self) -> EngineOp {
        match self {
            Self::Open { .. } => EngineOp::Open,
            Self::Resume => EngineOp::Resume,
            Self::Pause => EngineOp::Pause,
            Self::SetPosition(_) => EngineOp::SetPosition,
            Self::SetRate(_) => EngineOp::SetRate,
            Self::Close => EngineOp::Close,
        }
    }
}

struct OpenTrack {
    duration_ms: u64,
    position_ms: u64,
    playing: bool,
    rate: f64,
    sink: StatusSink,
    generation: u64,
    valid: bool,
}

#[derive(Default)]
struct Inner {
    tracks: HashMap<String, u64>,
    calls: Vec<EngineCall>,
    failures: HashMap<EngineOp, VecDeque<EngineError>>,
    current: Option<OpenTrack>,
    generation: u64,
    ticking: bool,
    open_delay: Option<Duration>,
}

impl Inner {
    fn record(&mut self, call: EngineCall) -> EngineResult<()> {
        let op = call.op();
        self.calls.push(call);
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn open_track(&mut self) -> EngineResult<&mut OpenTrack> {
        match self.current.as_mut() {
            Some(track) if track.valid => Ok(track),
            Some(_) => Err(EngineError::HandleInvalid(
                "track handle was invalidated".to_string(),
            )),
            None => Err(EngineError::HandleInvalid("no track is open".to_string())),
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedEngine {
    /// An engine whose open tracks advance on their own while playing
    pub fn new() -> Self {
        let engine = Self {
            inner: Arc::default(),
        };
        lock(&engine.inner).ticking = true;
        engine
    }

    /// An engine that only reports status when told to via `push_status`
    pub fn manual() -> Self {
        Self {
            inner: Arc::default(),
        }
    }

    pub fn with_audio(self, uri: impl Into<String>, duration_ms: u64) -> Self {
        self.add_audio(uri, duration_ms);
        self
    }

    /// Makes `uri` openable. A duration of 0 simulates an unknown duration.
    pub fn add_audio(&self, uri: impl Into<String>, duration_ms: u64) {
        lock(&self.inner).tracks.insert(uri.into(), duration_ms);
    }

    /// Fails the next call of `op` with `error`. Failures queue per operation.
    pub fn fail_next(&self, op: EngineOp, error: EngineError) {
        lock(&self.inner)
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Delays every subsequent open by `delay`
    pub fn set_open_delay(&self, delay: Duration) {
        lock(&self.inner).open_delay = Some(delay);
    }

    /// Makes the open track unusable, as if the OS reclaimed it
    pub fn invalidate_handle(&self) {
        if let Some(track) = lock(&self.inner).current.as_mut() {
            track.valid = false;
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn count(&self, op: EngineOp) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner).calls.clear();
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).current.is_some()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.inner)
            .current
            .as_ref()
            .is_some_and(|track| track.playing)
    }

    pub fn position_ms(&self) -> Option<u64> {
        lock(&self.inner)
            .current
            .as_ref()
            .map(|track| track.position_ms)
    }

    /// Sends `status` through the open track's sink
    ///
    /// Returns false when no track is open or the receiver is gone.
    pub fn push_status(&self, status: EngineStatus) -> bool {
        let sink = lock(&self.inner)
            .current
            .as_ref()
            .map(|track| track.sink.clone());
        sink.is_some_and(|sink| sink.report(status))
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn open(
        &mut self,
        uri: &str,
        initial_position_ms: u64,
        sink: StatusSink,
    ) -> EngineResult<u64> {
        let delay = {
            let mut state = lock(&self.inner);
            state.record(EngineCall::Open {
                uri: uri.to_string(),
                initial_position_ms,
            })?;
            state.open_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (duration_ms, generation, ticking) = {
            let mut state = lock(&self.inner);
            let Some(&duration_ms) = state.tracks.get(uri) else {
                return Err(EngineError::OpenFailed {
                    uri: uri.to_string(),
                    reason: "no such audio".to_string(),
                });
            };

            state.generation += 1;
            let generation = state.generation;
            state.current = Some(OpenTrack {
                duration_ms,
                position_ms: initial_position_ms.min(duration_ms),
                playing: false,
                rate: PlaybackSpeed::NORMAL.value(),
                sink: sink.clone(),
                generation,
                valid: true,
            });
            (duration_ms, generation, state.ticking)
        };

        if ticking && duration_ms > 0 {
            tokio::spawn(run_ticker(
                Arc::clone(&self.inner),
                generation,
                sink.interval(),
            ));
        }

        Ok(duration_ms)
    }

    async fn resume(&mut self) -> EngineResult<()> {
        let mut state = lock(&self.inner);
        state.record(EngineCall::Resume)?;
        state.open_track()?.playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult<()> {
        let mut state = lock(&self.inner);
        state.record(EngineCall::Pause)?;
        state.open_track()?.playing = false;
        Ok(())
    }

    async fn set_position(&mut self, position_ms: u64) -> EngineResult<()> {
        let mut state = lock(&self.inner);
        state.record(EngineCall::SetPosition(position_ms))?;
        let track = state.open_track()?;
        track.position_ms = position_ms.min(track.duration_ms);
        Ok(())
    }

    async fn set_rate(&mut self, speed: PlaybackSpeed) -> EngineResult<()> {
        let mut state = lock(&self.inner);
        state.record(EngineCall::SetRate(speed.value()))?;
        state.open_track()?.rate = speed.value();
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        let mut state = lock(&self.inner);
        state.record(EngineCall::Close)?;
        match state.current.take() {
            Some(track) if !track.valid => Err(EngineError::HandleInvalid(
                "track handle was invalidated".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Advances the open track while it plays and reports each step
async fn run_ticker(inner: Arc<Mutex<Inner>>, generation: u64, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let (sink, status) = {
            let mut state = lock(&inner);
            let Some(track) = state
                .current
                .as_mut()
                .filter(|track| track.generation == generation && track.valid)
            else {
                break;
            };
            if !track.playing {
                continue;
            }

            let step = (interval.as_millis() as f64 * track.rate).round() as u64;
            track.position_ms = track.position_ms.saturating_add(step).min(track.duration_ms);

            let status = if track.position_ms >= track.duration_ms {
                track.playing = false;
                EngineStatus::finished(track.position_ms)
            } else {
                EngineStatus::playing(track.position_ms)
            };
            (track.sink.clone(), status)
        };

        if !sink.report(status) {
            break;
        }
    }
}
