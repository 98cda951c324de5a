//! Shared helpers for playback integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyplayer_playback::{
    AudioEngine, BookDescriptor, ControllerConfig, ControllerHandle, EngineResult, KeyValueStore,
    MemoryStore, PlaybackController, PlaybackSpeed, PositionStore, SimulatedEngine, StatusSink,
    StoreError, StoreResult, LAST_POSITION_KEY,
};

pub const DUNE_URI: &str = "file:///books/dune.mp3";
pub const EMMA_URI: &str = "file:///books/emma.mp3";
pub const DUNE_MS: u64 = 600_000;
pub const EMMA_MS: u64 = 1_200_000;

pub fn dune() -> BookDescriptor {
    BookDescriptor::new("Dune", DUNE_URI).with_author("Frank Herbert")
}

pub fn emma() -> BookDescriptor {
    BookDescriptor::new("Emma", EMMA_URI).with_author("Jane Austen")
}

pub fn library(engine: SimulatedEngine) -> SimulatedEngine {
    engine.with_audio(DUNE_URI, DUNE_MS).with_audio(EMMA_URI, EMMA_MS)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Memory store that counts writes and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    position_writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn position_writes(&self) -> usize {
        self.position_writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read refused".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write refused".to_string()));
        }
        if key == LAST_POSITION_KEY {
            self.position_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set(key, value).await
    }
}

/// Simulated engine that also keeps every sink it was handed
#[derive(Clone)]
pub struct CapturingEngine {
    pub engine: SimulatedEngine,
    sinks: Arc<Mutex<Vec<StatusSink>>>,
}

impl CapturingEngine {
    pub fn new(engine: SimulatedEngine) -> Self {
        Self {
            engine,
            sinks: Arc::default(),
        }
    }

    pub fn sink(&self, index: usize) -> StatusSink {
        self.sinks.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl AudioEngine for CapturingEngine {
    async fn open(&mut self, uri: &str, initial_position_ms: u64, sink: StatusSink) -> EngineResult<u64> {
        self.sinks.lock().unwrap().push(sink.clone());
        self.engine.open(uri, initial_position_ms, sink).await
    }

    async fn resume(&mut self) -> EngineResult<()> {
        self.engine.resume().await
    }

    async fn pause(&mut self) -> EngineResult<()> {
        self.engine.pause().await
    }

    async fn set_position(&mut self, position_ms: u64) -> EngineResult<()> {
        self.engine.set_position(position_ms).await
    }

    async fn set_rate(&mut self, speed: PlaybackSpeed) -> EngineResult<()> {
        self.engine.set_rate(speed).await
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.engine.close().await
    }
}

pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        default_speed: PlaybackSpeed::NORMAL,
        status_interval: Duration::from_secs(1),
        save_throttle: Duration::from_secs(1),
        resume_tolerance_ms: 1500,
        engine_timeout: Duration::from_secs(5),
    }
}

/// A controller wired to a manual engine and a recording store
pub struct Harness {
    pub controller: ControllerHandle,
    pub engine: SimulatedEngine,
    pub backend: Arc<RecordingStore>,
    pub store: PositionStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self::build(library(SimulatedEngine::manual()), config)
    }

    pub fn build(engine: SimulatedEngine, config: ControllerConfig) -> Self {
        init_logging();
        let backend = Arc::new(RecordingStore::default());
        let store = PositionStore::new(backend.clone());
        let controller = PlaybackController::spawn(engine.clone(), store.clone(), config);
        Self {
            controller,
            engine,
            backend,
            store,
        }
    }

    /// Loads Dune and starts it playing
    pub async fn playing_dune(&self) {
        self.controller.load(dune()).await.unwrap();
        self.controller.play().await.unwrap();
    }

    pub async fn stored(&self) -> Option<(BookDescriptor, u64)> {
        self.store.load().await.unwrap()
    }
}

/// Lets spawned tasks run until the runtime is idle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
