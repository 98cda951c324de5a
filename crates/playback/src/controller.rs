//! Playback controller
//!
//! One task owns the [`PlaybackSession`] and the engine. Host commands, engine
//! status reports and lifecycle edges all travel through the same mailbox and
//! are handled strictly in arrival order. Callers talk to the task through a
//! cloneable [`ControllerHandle`].

use crate::autosave::SaveThrottle;
use crate::bridge::{StatusBridge, StatusReport};
use crate::engine::AudioEngine;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{AppState, LifecycleMonitor};
use crate::session::{PlaybackSession, PlaybackSnapshot};
use crate::store::PositionStore;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storyplayer_core::{
    format_clock, BookDescriptor, PlaybackSpeed, PlayerError, PlayerResult, Validator,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Engine call timeouts below this are raised to it
pub const MIN_ENGINE_TIMEOUT: Duration = Duration::from_millis(100);

/// Controller tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Speed applied to every freshly loaded book
    pub default_speed: PlaybackSpeed,
    /// Cadence requested from the engine for status reports
    pub status_interval: Duration,
    /// Minimum gap between saves while playing
    pub save_throttle: Duration,
    /// Drift tolerated before a corrective seek on returning to the foreground
    pub resume_tolerance_ms: u64,
    /// Upper bound on any single engine call
    pub engine_timeout: Duration,
}

impl ControllerConfig {
    /// Engine timeout with [`MIN_ENGINE_TIMEOUT`] applied
    pub fn effective_engine_timeout(&self) -> Duration {
        self.engine_timeout.max(MIN_ENGINE_TIMEOUT)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_speed: PlaybackSpeed::NORMAL,
            status_interval: Duration::from_secs(1),
            save_throttle: Duration::from_secs(1),
            resume_tolerance_ms: 1500,
            engine_timeout: Duration::from_secs(15),
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Load {
        book: BookDescriptor,
        reply: Reply<PlayerResult<()>>,
    },
    Play {
        reply: Reply<PlayerResult<()>>,
    },
    Pause {
        reply: Reply<PlayerResult<()>>,
    },
    Seek {
        target_ms: i64,
        reply: Reply<PlayerResult<()>>,
    },
    Jump {
        delta_secs: i64,
        reply: Reply<PlayerResult<()>>,
    },
    SetSpeed {
        speed: PlaybackSpeed,
        reply: Reply<PlayerResult<()>>,
    },
    Unload {
        reply: Reply<PlayerResult<()>>,
    },
    RestoreLastSession {
        reply: Reply<Option<BookDescriptor>>,
    },
    Refresh {
        reply: Reply<PlaybackSnapshot>,
    },
    Shutdown {
        reply: Option<Reply<()>>,
    },
}

enum Message {
    Command(Command),
    Status(StatusReport),
    Lifecycle(AppState),
}

/// Entry point for starting a controller
pub struct PlaybackController;

impl PlaybackController {
    /// Spawns the controller task on the current tokio runtime
    pub fn spawn<E: AudioEngine>(
        engine: E,
        store: PositionStore,
        mut config: ControllerConfig,
    ) -> ControllerHandle {
        config.engine_timeout = config.effective_engine_timeout();
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());

        let status_tx = tx.downgrade();
        let bridge = StatusBridge::new(config.status_interval, move |report| {
            status_tx
                .upgrade()
                .is_some_and(|tx| tx.send(Message::Status(report)).is_ok())
        });

        let actor = ControllerTask {
            engine: Box::new(engine),
            store,
            throttle: SaveThrottle::new(config.save_throttle),
            config,
            session: PlaybackSession::new(),
            bridge,
            handle_open: false,
            hold_paused: false,
            last_saved: None,
            app_state: AppState::Active,
            snapshot_tx,
            rx,
        };
        tokio::spawn(actor.run());

        ControllerHandle {
            inner: Arc::new(HandleInner {
                tx,
                snapshot_rx,
            }),
        }
    }
}

struct HandleInner {
    tx: mpsc::UnboundedSender<Message>,
    snapshot_rx: watch::Receiver<PlaybackSnapshot>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self
            .tx
            .send(Message::Command(Command::Shutdown { reply: None }));
    }
}

/// Cloneable handle to a running controller
///
/// Dropping the last clone shuts the controller down.
#[derive(Clone)]
pub struct ControllerHandle {
    inner: Arc<HandleInner>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        operation: &'static str,
        make: impl FnOnce(Reply<PlayerResult<T>>) -> Command,
    ) -> PlayerResult<T> {
        let (reply, response) = oneshot::channel();
        if self.inner.tx.send(Message::Command(make(reply))).is_err() {
            return Err(stopped(operation));
        }
        response.await.unwrap_or_else(|_| Err(stopped(operation)))
    }

    /// Opens `book`, replacing whatever is loaded, and restores its position
    pub async fn load(&self, book: BookDescriptor) -> PlayerResult<()> {
        self.request("load", |reply| Command::Load { book, reply })
            .await
    }

    pub async fn play(&self) -> PlayerResult<()> {
        self.request("play", |reply| Command::Play { reply }).await
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        self.request("pause", |reply| Command::Pause { reply }).await
    }

    /// Seeks to `target_ms`, clamped into the book
    pub async fn seek(&self, target_ms: i64) -> PlayerResult<()> {
        self.request("seek", |reply| Command::Seek { target_ms, reply })
            .await
    }

    /// Seeks relative to the current position
    pub async fn jump(&self, delta_secs: i64) -> PlayerResult<()> {
        self.request("jump", |reply| Command::Jump { delta_secs, reply })
            .await
    }

    /// Rejects multipliers outside the allowed set before anything is sent
    pub async fn set_speed(&self, multiplier: f64) -> PlayerResult<()> {
        let speed = PlaybackSpeed::new(multiplier)?;
        self.request("set speed", |reply| Command::SetSpeed { speed, reply })
            .await
    }

    pub async fn unload(&self) -> PlayerResult<()> {
        self.request("unload", |reply| Command::Unload { reply })
            .await
    }

    /// Loads the last saved book, if any, at its saved position
    pub async fn restore_last_session(&self) -> Option<BookDescriptor> {
        let (reply, response) = oneshot::channel();
        let message = Message::Command(Command::RestoreLastSession { reply });
        if self.inner.tx.send(message).is_err() {
            return None;
        }
        response.await.ok().flatten()
    }

    /// Latest published state, without waiting on the controller
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.snapshot_rx.borrow().clone()
    }

    /// State after every message queued before this call has been handled
    pub async fn refresh(&self) -> PlaybackSnapshot {
        let (reply, response) = oneshot::channel();
        let message = Message::Command(Command::Refresh { reply });
        if self.inner.tx.send(message).is_err() {
            return self.snapshot();
        }
        match response.await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.snapshot_rx.clone()
    }

    /// Forwards lifecycle edges from `monitor` into the controller
    pub fn attach_lifecycle(&self, monitor: &LifecycleMonitor) -> JoinHandle<()> {
        let mut events = monitor.subscribe();
        let tx = self.inner.tx.downgrade();

        tokio::spawn(async move {
            loop {
                let state = match events.recv().await {
                    Ok(state) => state,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} lifecycle events", missed);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let delivered = tx
                    .upgrade()
                    .is_some_and(|tx| tx.send(Message::Lifecycle(state)).is_ok());
                if !delivered {
                    break;
                }
            }
        })
    }

    /// Unloads and stops the controller. Safe to call more than once.
    pub async fn shutdown(&self) {
        let (reply, response) = oneshot::channel();
        let message = Message::Command(Command::Shutdown { reply: Some(reply) });
        if self.inner.tx.send(message).is_ok() {
            let _ = response.await;
        }
    }
}

fn stopped(operation: &'static str) -> PlayerError {
    PlayerError::engine_call(operation, "playback controller has shut down")
}

fn not_loaded(operation: &'static str) -> PlayerError {
    PlayerError::engine_call(operation, "no audio loaded")
}

/// Runs an engine call, turning an overrun into [`EngineError::Timeout`]
async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = EngineResult<T>>,
) -> EngineResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

struct ControllerTask {
    engine: Box<dyn AudioEngine>,
    store: PositionStore,
    config: ControllerConfig,
    session: PlaybackSession,
    bridge: StatusBridge,
    throttle: SaveThrottle,
    handle_open: bool,
    /// Set by a host pause; playing reports are not trusted until the next play
    hold_paused: bool,
    /// Audio uri and position of this controller's latest successful write
    last_saved: Option<(String, u64)>,
    app_state: AppState,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl ControllerTask {
    async fn run(mut self) {
        info!("Playback controller started");
        let mut shutdown_reply = None;

        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Command(Command::Shutdown { reply }) => {
                    shutdown_reply = reply;
                    break;
                }
                Message::Command(command) => self.handle_command(command).await,
                Message::Status(report) => self.on_status_update(report).await,
                Message::Lifecycle(state) => self.on_lifecycle(state).await,
            }
            self.publish();
        }

        self.unload().await;
        self.publish();
        info!("Playback controller stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Load { book, reply } => {
                let result = self.load(book).await;
                self.respond(reply, result);
            }
            Command::Play { reply } => {
                let result = self.play().await;
                self.respond(reply, result);
            }
            Command::Pause { reply } => {
                let result = self.pause().await;
                self.respond(reply, result);
            }
            Command::Seek { target_ms, reply } => {
                let result = self.seek(target_ms).await;
                self.respond(reply, result);
            }
            Command::Jump { delta_secs, reply } => {
                let result = self.jump(delta_secs).await;
                self.respond(reply, result);
            }
            Command::SetSpeed { speed, reply } => {
                let result = self.set_speed(speed).await;
                self.respond(reply, result);
            }
            Command::Unload { reply } => {
                self.unload().await;
                self.respond(reply, Ok(()));
            }
            Command::RestoreLastSession { reply } => {
                let restored = self.restore_last_session().await;
                self.respond(reply, restored);
            }
            Command::Refresh { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            // Handled by the run loop
            Command::Shutdown { .. } => {}
        }
    }

    /// Publishes first so callers observe the state their reply describes
    fn respond<T>(&self, reply: Reply<T>, value: T) {
        self.publish();
        let _ = reply.send(value);
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    async fn load(&mut self, book: BookDescriptor) -> PlayerResult<()> {
        self.unload().await;

        let session = self.session.begin_load(book.clone());
        self.publish();
        info!("Loading '{}' ({})", book.display_title(), session);

        if let Err(problems) = book.validate() {
            return self.fail_load(format!("invalid book: {}", problems.join("; ")));
        }

        let restore_ms = match self.store.load().await {
            Ok(Some((stored, position_ms))) if stored.same_audio(&book) => position_ms,
            Ok(_) => 0,
            Err(e) => {
                warn!("{}, starting from the beginning", e.into_player_error("read"));
                0
            }
        };

        let sink = self.bridge.sink(session);
        let opened = bounded(
            self.config.engine_timeout,
            "open",
            self.engine.open(&book.audio_uri, restore_ms, sink),
        )
        .await;

        let duration_ms = match opened {
            Ok(0) => {
                self.handle_open = true;
                self.close_engine().await;
                let unknown = EngineError::UnknownDuration {
                    uri: book.audio_uri.clone(),
                };
                return self.fail_load(unknown.to_string());
            }
            Ok(duration_ms) => duration_ms,
            Err(e) => return self.fail_load(e.to_string()),
        };

        self.handle_open = true;
        self.session.finish_load(duration_ms, restore_ms);

        let speed = self.config.default_speed;
        if !speed.is_normal() {
            match bounded(self.config.engine_timeout, "set rate", self.engine.set_rate(speed)).await
            {
                Ok(()) => self.session.set_speed(speed),
                Err(e) => warn!("Could not apply default speed {}: {}", speed, e),
            }
        }

        info!(
            "Ready: '{}' at {} of {}",
            book.display_title(),
            format_clock(self.session.position_ms()),
            format_clock(duration_ms)
        );
        Ok(())
    }

    fn fail_load(&mut self, message: String) -> PlayerResult<()> {
        let err = PlayerError::load(message);
        error!("{}", err);
        self.session.fail(err.descriptor());
        Err(err)
    }

    /// Maps an engine failure, forcing an unload when the handle is gone
    async fn settle<T>(
        &mut self,
        operation: &'static str,
        result: EngineResult<T>,
    ) -> PlayerResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_handle_lost() => {
                error!("Engine handle lost during {}: {}", operation, e);
                self.unload().await;
                let err = PlayerError::handle_lost(operation, e.to_string());
                self.session.fail(err.descriptor());
                Err(err)
            }
            Err(e) => {
                warn!("{} failed: {}", operation, e);
                Err(PlayerError::engine_call(operation, e.to_string()))
            }
        }
    }

    async fn play(&mut self) -> PlayerResult<()> {
        if !self.session.is_ready() || self.session.is_playing() {
            return Ok(());
        }

        let result = bounded(self.config.engine_timeout, "play", self.engine.resume()).await;
        self.settle("play", result).await?;
        self.hold_paused = false;
        self.session.set_playing(true);
        Ok(())
    }

    async fn pause(&mut self) -> PlayerResult<()> {
        if !self.session.is_playing() {
            return Ok(());
        }

        let result = bounded(self.config.engine_timeout, "pause", self.engine.pause()).await;
        self.settle("pause", result).await?;
        self.hold_paused = true;
        self.session.set_playing(false);
        self.save_position("pause").await;
        Ok(())
    }

    async fn seek(&mut self, target_ms: i64) -> PlayerResult<()> {
        if !self.session.is_ready() {
            return Err(not_loaded("seek"));
        }

        let position_ms = self.session.clamp(target_ms);
        let result = bounded(
            self.config.engine_timeout,
            "seek",
            self.engine.set_position(position_ms),
        )
        .await;
        self.settle("seek", result).await?;
        self.session.set_position(position_ms);
        Ok(())
    }

    async fn jump(&mut self, delta_secs: i64) -> PlayerResult<()> {
        if !self.session.is_ready() {
            return Err(not_loaded("jump"));
        }
        let target_ms = self.session.jump_target(delta_secs);
        self.seek(target_ms).await
    }

    async fn set_speed(&mut self, speed: PlaybackSpeed) -> PlayerResult<()> {
        if !self.session.is_ready() {
            return Err(not_loaded("set speed"));
        }

        let result = bounded(self.config.engine_timeout, "set speed", self.engine.set_rate(speed)).await;
        self.settle("set speed", result).await?;
        self.session.set_speed(speed);
        Ok(())
    }

    /// Saves, releases the engine and returns to idle. Idempotent.
    async fn unload(&mut self) {
        if self.session.is_ready() {
            self.save_position("unload").await;
        }
        if self.handle_open {
            self.close_engine().await;
        }
        if let Some(book) = self.session.book() {
            info!("Unloaded '{}' ({})", book.display_title(), self.session.id());
        }
        self.session.reset();
        self.throttle.reset();
        self.hold_paused = false;
    }

    async fn close_engine(&mut self) {
        self.handle_open = false;
        if let Err(e) = bounded(self.config.engine_timeout, "close", self.engine.close()).await {
            warn!("Engine close failed: {}", e);
        }
    }

    /// Writes the current book and position. Failures are logged only.
    async fn save_position(&mut self, trigger: &str) {
        let Some(book) = self.session.book() else {
            return;
        };
        let position_ms = self.session.position_ms();

        match self.store.save(book, position_ms).await {
            Ok(()) => {
                debug!("Saved position {} ({})", format_clock(position_ms), trigger);
                self.last_saved = Some((book.audio_uri.clone(), position_ms));
            }
            Err(e) => warn!("{} ({})", e.into_player_error("write"), trigger),
        }
        self.throttle.mark(Instant::now());
    }

    async fn on_status_update(&mut self, report: StatusReport) {
        if report.session != self.session.id() {
            debug!(
                "Dropping status from {} during {}",
                report.session,
                self.session.id()
            );
            return;
        }
        if !self.session.is_ready() {
            debug!(
                "Dropping status while {}",
                self.session.transport_state()
            );
            return;
        }

        let status = report.status;
        if status.did_just_finish {
            self.session.finish();
            info!("Reached the end ({})", self.session.id());
            self.save_position("end of book").await;
            return;
        }

        if status.is_playing && self.hold_paused {
            debug!("Ignoring playing flag reported after pause");
        }
        let is_playing = status.is_playing && !self.hold_paused;
        self.session.apply_status(status.position_ms, is_playing);
        if self.session.is_playing() && self.throttle.is_due(Instant::now()) {
            self.save_position("periodic").await;
        }
    }

    async fn on_lifecycle(&mut self, state: AppState) {
        if state == self.app_state {
            return;
        }
        self.app_state = state;

        if !self.session.is_ready() {
            return;
        }
        match state {
            AppState::Suspended => self.save_position("background").await,
            AppState::Active => self.reconcile_after_resume().await,
        }
    }

    /// Seeks back to the stored position if the live one drifted away from it
    async fn reconcile_after_resume(&mut self) {
        let (stored_book, stored_ms) = match self.store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return,
            Err(e) => {
                warn!("{}, keeping live position", e.into_player_error("read"));
                return;
            }
        };

        let own_write = self
            .last_saved
            .as_ref()
            .is_some_and(|(uri, ms)| *uri == stored_book.audio_uri && *ms == stored_ms);
        if own_write {
            debug!("Stored position is our own latest save, keeping live position");
            return;
        }

        let same_book = self
            .session
            .book()
            .is_some_and(|book| book.same_audio(&stored_book));
        if !same_book {
            debug!("Stored state belongs to another book, ignoring");
            return;
        }

        let live_ms = self.session.position_ms();
        if live_ms.abs_diff(stored_ms) <= self.config.resume_tolerance_ms {
            return;
        }

        info!(
            "Position drifted from {} to {} while in background, seeking back",
            format_clock(stored_ms),
            format_clock(live_ms)
        );
        let target_ms = i64::try_from(stored_ms).unwrap_or(i64::MAX);
        if let Err(e) = self.seek(target_ms).await {
            warn!("Corrective seek failed: {}", e);
        }
    }

    async fn restore_last_session(&mut self) -> Option<BookDescriptor> {
        let book = match self.store.load().await {
            Ok(Some((book, _))) => book,
            Ok(None) => {
                info!("No previous session to restore");
                return None;
            }
            Err(e) => {
                warn!("{}, not restoring", e.into_player_error("read"));
                return None;
            }
        };

        info!("Restoring '{}'", book.display_title());
        match self.load(book.clone()).await {
            Ok(()) => Some(book),
            Err(_) => None,
        }
    }
}
