//! # Playback Orchestrator
//!
//! The public face of a player. It owns the state machine, the display
//! coordinator and the component hub, binds decoder backends and render
//! surfaces through the installed factories, and applies backend callbacks.
//!
//! ## Threading
//!
//! An orchestrator lives on one control thread. Backends post callbacks from
//! their own threads into the orchestrator's mailbox; the host pumps it with
//! [`dispatch_pending`](PlaybackOrchestrator::dispatch_pending) (from a UI
//! loop) or [`run_next`](PlaybackOrchestrator::run_next) (from an async task).
//! Control components talk back through a [`PlayerHandle`], whose commands
//! arrive through the same mailbox. Nothing ever re-enters the orchestrator
//! while it is applying a callback, so reparenting never races a callback.
//!
//! ## Illegal requests
//!
//! Requests that make no sense in the current state (pausing an idle player,
//! seeking after an error, ...) are ignored and logged at `debug`; they never
//! fail. Errors are reserved for things the caller must act on: factory
//! failures, missing containers, out-of-range values.
//!
//! ## Example
//!
//! ```ignore
//! let mut player = PlaybackOrchestrator::new(
//!     PlayerConfig::long_form(),
//!     RuntimeContext::new("com.example.player"),
//!     decoder_factory_fn(|ctx: &RuntimeContext| NativeDecoder::open(ctx)),
//!     render_factory_fn(|_: &RuntimeContext| Ok(TextureSurface::new())),
//!     Box::new(host),
//! )?;
//! player.bind_container(inline_container)?;
//! player.set_data_source("https://cdn.example.com/movie.mp4", None)?;
//! player.start()?;
//!
//! loop {
//!     player.run_next().await;
//! }
//! ```

use bridge_traits::audio::{AudioFocusChange, AudioFocusHost};
use bridge_traits::context::RuntimeContext;
use bridge_traits::decoder::{DecoderBackend, DecoderEvent, MediaSource, MEDIA_ERROR_UNKNOWN};
use bridge_traits::display::{ContainerId, ViewHost};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::render::{AspectRatioMode, RenderSurface, Screenshot};
use core_runtime::events::{EventBus, Receiver};
use core_runtime::logging::redact_uri;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::PlayerConfig;
use crate::display::{DisplayCoordinator, ScreenMode};
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::factory::{DecoderFactory, RenderFactory};
use crate::focus::{AudioFocus, FocusAction, DUCK_VOLUME};
use crate::hub::{ComponentEvent, ComponentHub, ControlComponent, Gesture};
use crate::mailbox::{Envelope, Mailbox, PlayerCommand, PlayerHandle};
use crate::progress::{ProgressStore, SharedProgressStore};
use crate::state::{PlayState, PlaybackStateMachine, Trigger};

/// Delay until the playback position next crosses a whole second.
///
/// Hosts use it to schedule [`PlaybackOrchestrator::tick_progress`] so a
/// seconds display updates exactly on the boundary. Non-positive speeds are
/// treated as normal speed.
pub fn next_progress_delay(position_ms: u64, speed: f32) -> Duration {
    let remaining = 1000 - position_ms % 1000;
    let speed = if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    };
    Duration::from_millis((remaining as f32 / speed).round() as u64)
}

fn clamp_position(position_ms: i64, duration_ms: u64) -> u64 {
    let position = position_ms.max(0) as u64;
    if duration_ms > 0 {
        position.min(duration_ms)
    } else {
        position
    }
}

fn creation_error(err: PlaybackError) -> PlaybackError {
    match err {
        PlaybackError::BackendCreation(_) => err,
        other => PlaybackError::BackendCreation(other.to_string()),
    }
}

struct Binding<B> {
    backend: B,
    generation: u64,
    /// A data source was handed to the backend; it needs a reset before reuse.
    loaded: bool,
    /// The render surface has been bound to this backend.
    surface_bound: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AudioSettings {
    volume: (f32, f32),
    muted: bool,
    /// Another application speaks over the player.
    ducked: bool,
    looping: bool,
    speed: f32,
}

impl AudioSettings {
    fn effective_volume(&self) -> (f32, f32) {
        let (left, right) = self.volume;
        if self.muted {
            (0.0, 0.0)
        } else if self.ducked {
            (left.min(DUCK_VOLUME), right.min(DUCK_VOLUME))
        } else {
            (left, right)
        }
    }

    fn apply_to<B: DecoderBackend>(&self, backend: &mut B) -> BridgeResult<()> {
        let (left, right) = self.effective_volume();
        backend.set_looping(self.looping)?;
        backend.set_volume(left, right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct RenderSettings {
    video_size: Option<(u32, u32)>,
    rotation: u16,
    aspect_ratio: AspectRatioMode,
    mirrored: bool,
}

impl RenderSettings {
    fn apply_to<S: RenderSurface>(&self, surface: &mut S) {
        surface.set_aspect_ratio_mode(self.aspect_ratio);
        surface.set_mirror(self.mirrored);
        surface.set_rotation(self.rotation);
        if let Some((width, height)) = self.video_size {
            surface.set_video_size(width, height);
        }
    }
}

/// Coordinates one player: state, display, components and backends.
pub struct PlaybackOrchestrator<D: DecoderFactory, R: RenderFactory> {
    config: PlayerConfig,
    context: RuntimeContext,
    decoder_factory: D,
    render_factory: R,
    binding: Option<Binding<D::Backend>>,
    surface: Option<R::Surface>,
    /// Recreate the backend instead of reusing it on the next source.
    rebind_requested: bool,
    state: PlaybackStateMachine,
    display: DisplayCoordinator,
    hub: ComponentHub,
    mailbox: Mailbox,
    events: EventBus<PlayerEvent>,
    progress: Option<SharedProgressStore>,
    source: Option<MediaSource>,
    play_when_prepared: bool,
    pending_seek: u64,
    buffered: u8,
    audio: AudioSettings,
    focus: Option<AudioFocus>,
    render: RenderSettings,
}

impl<D: DecoderFactory, R: RenderFactory> fmt::Debug for PlaybackOrchestrator<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("state", &self.state.current())
            .field("screen_mode", &self.display.mode())
            .field("backend", &self.backend_name())
            .field("source", &self.source)
            .field("hub", &self.hub)
            .field("focus", &self.focus)
            .finish()
    }
}

impl<D: DecoderFactory, R: RenderFactory> PlaybackOrchestrator<D, R> {
    /// Create an idle player in normal screen mode.
    ///
    /// No backend is created until a data source is set.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Config`] if `config` does not validate.
    pub fn new(
        config: PlayerConfig,
        context: RuntimeContext,
        decoder_factory: D,
        render_factory: R,
        host: Box<dyn ViewHost>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;

        let mailbox = Mailbox::new();
        let hub = ComponentHub::new(mailbox.handle());
        let display = DisplayCoordinator::new(host)
            .with_tiny_screen_size(config.tiny_screen_size)
            .with_system_bars_hidden(config.hide_system_bars_in_full_screen);
        let progress = config
            .remember_progress
            .then(|| ProgressStore::shared(config.progress_capacity));

        debug!(app_id = %context.app_id, ?config, "Creating playback orchestrator");

        Ok(Self {
            events: EventBus::new(config.event_buffer_size),
            audio: AudioSettings {
                volume: (1.0, 1.0),
                muted: false,
                ducked: false,
                looping: config.looping,
                speed: 1.0,
            },
            focus: None,
            render: RenderSettings {
                aspect_ratio: config.aspect_ratio,
                ..Default::default()
            },
            config,
            context,
            decoder_factory,
            render_factory,
            binding: None,
            surface: None,
            rebind_requested: false,
            state: PlaybackStateMachine::new(),
            display,
            hub,
            mailbox,
            progress,
            source: None,
            play_when_prepared: false,
            pending_seek: 0,
            buffered: 0,
        })
    }

    /// Use `store` for progress memory, e.g. to share it between players.
    pub fn with_progress_store(mut self, store: SharedProgressStore) -> Self {
        self.progress = Some(store);
        self
    }

    /// Arbitrate audio output through `host`. Focus is requested when
    /// playback starts and given up on pause, stop and release; losing it
    /// pauses or ducks playback. Honors `PlayerConfig::audio_focus_enabled`.
    pub fn with_audio_focus(mut self, host: Box<dyn AudioFocusHost>) -> Self {
        let listener = self.mailbox.focus_listener();
        self.focus = Some(AudioFocus::new(
            host,
            listener,
            self.config.audio_focus_enabled,
        ));
        self
    }

    // ========================================================================
    // Data source & transport
    // ========================================================================

    /// Set the media to play. Allowed while idle, completed or failed.
    pub fn set_data_source(
        &mut self,
        uri: impl Into<String>,
        headers: Option<HashMap<String, String>>,
    ) -> Result<()> {
        let mut source = MediaSource::new(uri);
        if let Some(headers) = headers {
            source = source.with_headers(headers);
        }
        self.set_media_source(source)
    }

    /// Like [`set_data_source`](Self::set_data_source), with a prepared
    /// [`MediaSource`].
    ///
    /// Binds a decoder backend if none is bound. Decoding does not start.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::BackendCreation`] if the factory fails. A backend the
    /// new source needs is created before anything else changes, so on that
    /// failure the player is left exactly as it was.
    #[instrument(skip(self, source), fields(uri = %redact_uri(&source.uri)))]
    pub fn set_media_source(&mut self, source: MediaSource) -> Result<()> {
        let reset_first = match self.state.current() {
            PlayState::Idle => false,
            PlayState::PlaybackCompleted | PlayState::Error => true,
            _ => {
                self.ignore("set_data_source");
                return Ok(());
            }
        };

        let fresh = if self.needs_new_backend() {
            match self.create_backend() {
                Ok(backend) => Some(backend),
                Err(err) => {
                    error!(%err, "Could not bind a decoder backend");
                    return Err(err);
                }
            }
        } else {
            None
        };

        if reset_first {
            self.transition(Trigger::Reset);
        }
        if !self.config.render_reusable {
            self.release_surface();
        }
        self.recycle_backend();
        if let Some(mut backend) = fresh {
            if self.binding.is_none() {
                self.install_backend(backend);
            } else {
                backend.release();
            }
        }

        self.source = None;
        self.play_when_prepared = false;
        self.buffered = 0;
        self.render.video_size = None;
        self.render.rotation = 0;

        if let Err(err) = self.ensure_backend() {
            error!(%err, "Could not bind a decoder backend");
            return Err(err);
        }

        self.pending_seek = self.restored_position(&source.uri);
        info!(resume_at = self.pending_seek, "Data source set");
        self.source = Some(source);
        Ok(())
    }

    /// Start asynchronous preparation of the current source.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::NoDataSource`] if no source is set,
    /// [`PlaybackError::BackendCreation`] if a backend had to be created and
    /// the factory failed, or a bridge error if the backend refused the
    /// source. The state stays `Idle` in all these cases.
    #[instrument(skip(self))]
    pub fn prepare(&mut self) -> Result<()> {
        if self.state.current() != PlayState::Idle {
            self.ignore("prepare");
            return Ok(());
        }
        if self.source.is_none() {
            return Err(PlaybackError::NoDataSource);
        }

        self.load_source()?;
        self.transition(Trigger::Prepare);
        self.call_backend("prepare", |backend| backend.prepare_async());
        Ok(())
    }

    /// Start or resume playback, preparing first if needed.
    ///
    /// From `PlaybackCompleted` this replays from the beginning.
    pub fn start(&mut self) -> Result<()> {
        match self.state.current() {
            PlayState::Idle if self.source.is_some() => {
                self.play_when_prepared = true;
                let result = self.prepare();
                if result.is_err() {
                    self.play_when_prepared = false;
                }
                result
            }
            PlayState::Preparing => {
                self.play_when_prepared = true;
                Ok(())
            }
            PlayState::Prepared | PlayState::Paused => {
                if self.call_backend("start", |backend| backend.start()) {
                    self.transition(Trigger::Start);
                    self.request_audio_focus();
                }
                Ok(())
            }
            PlayState::Buffering if self.state.pause_pending() => {
                self.state.cancel_pending_pause();
                if self.call_backend("start", |backend| backend.start()) {
                    self.request_audio_focus();
                }
                Ok(())
            }
            PlayState::PlaybackCompleted => self.replay(true),
            _ => {
                self.ignore("start");
                Ok(())
            }
        }
    }

    /// Resume a paused player. Unlike [`start`](Self::start) this never
    /// prepares or replays.
    pub fn resume(&mut self) -> Result<()> {
        match self.state.current() {
            PlayState::Paused => self.start(),
            PlayState::Buffering if self.state.pause_pending() => self.start(),
            _ => {
                self.ignore("resume");
                Ok(())
            }
        }
    }

    /// Pause playback and give up audio focus (unless muted).
    pub fn pause(&mut self) {
        if self.pause_playback() && !self.audio.muted {
            self.abandon_audio_focus();
        }
    }

    /// Returns `true` if the backend was paused.
    fn pause_playback(&mut self) -> bool {
        match self.state.current() {
            PlayState::Playing => {
                if self.call_backend("pause", |backend| backend.pause()) {
                    self.transition(Trigger::Pause);
                    return true;
                }
            }
            PlayState::Buffering if !self.state.pause_pending() => {
                if self.call_backend("pause", |backend| backend.pause()) {
                    self.state.request_pause_while_buffering();
                    debug!("Pause deferred until buffering ends");
                    return true;
                }
            }
            PlayState::Preparing if self.play_when_prepared => {
                self.play_when_prepared = false;
                debug!("Cancelled play-when-prepared");
            }
            _ => self.ignore("pause"),
        }
        false
    }

    /// Playing, or buffering with no pause pending.
    fn is_advancing(&self) -> bool {
        match self.state.current() {
            PlayState::Playing => true,
            PlayState::Buffering => !self.state.pause_pending(),
            _ => false,
        }
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        let playing = match self.state.current() {
            PlayState::Preparing => self.play_when_prepared,
            _ => self.is_advancing(),
        };
        if playing {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Seek to `position_ms`, clamped to `[0, duration]`.
    ///
    /// While preparing the position is remembered and applied once prepared.
    pub fn seek_to(&mut self, position_ms: i64) {
        match self.state.current() {
            PlayState::Idle | PlayState::Error => self.ignore("seek_to"),
            PlayState::Preparing => {
                self.pending_seek = clamp_position(position_ms, 0);
                debug!(position_ms = self.pending_seek, "Seek deferred until prepared");
            }
            _ => self.seek_backend(position_ms),
        }
    }

    /// Stop playback and return to `Idle`, keeping the source and backend.
    pub fn stop(&mut self) {
        if self.state.current() == PlayState::Idle {
            self.ignore("stop");
            return;
        }
        self.save_progress();

        if let Some(binding) = self.binding.as_mut() {
            if let Err(err) = binding.backend.stop() {
                warn!(%err, "Backend stop failed");
            }
        }
        self.rotate_generation();
        self.play_when_prepared = false;
        self.pending_seek = 0;
        self.abandon_audio_focus();
        self.transition(Trigger::Reset);
    }

    /// Return to `Idle` and forget the source. The backend is kept or
    /// recreated according to the reuse policy.
    pub fn reset(&mut self) {
        self.save_progress();
        self.recycle_backend();
        self.source = None;
        self.play_when_prepared = false;
        self.pending_seek = 0;
        self.buffered = 0;
        self.abandon_audio_focus();
        self.transition(Trigger::Reset);
    }

    /// Play the current source again, from the start or from where it is.
    pub fn replay(&mut self, reset_position: bool) -> Result<()> {
        let Some(uri) = self.source.as_ref().map(|source| source.uri.clone()) else {
            self.ignore("replay");
            return Ok(());
        };

        let resume_at = if reset_position {
            if let Some(store) = &self.progress {
                store.lock().remove(&uri);
            }
            0
        } else {
            self.current_position()
        };

        if self.state.current() != PlayState::Idle {
            if let Some(binding) = self.binding.as_mut() {
                if let Err(err) = binding.backend.stop() {
                    warn!(%err, "Backend stop failed");
                }
            }
            self.rotate_generation();
            self.transition(Trigger::Reset);
        }

        self.pending_seek = resume_at;
        self.play_when_prepared = true;
        let result = self.prepare();
        if result.is_err() {
            self.play_when_prepared = false;
        }
        result
    }

    /// Tear everything down: backend, surface, screen mode, state, lock and
    /// controls visibility. Audio focus is given up.
    ///
    /// Callbacks still in flight from the released backend are dropped.
    /// Calling it again is a no-op.
    #[instrument(skip(self))]
    pub fn release(&mut self) {
        self.save_progress();

        let released_backend = self.release_binding();
        let released_surface = self.release_surface();

        let mode = self.display.mode();
        if self.display.reset() {
            self.after_mode_request(mode, true);
        }

        let had_source = self.source.take().is_some();
        self.play_when_prepared = false;
        self.pending_seek = 0;
        self.buffered = 0;
        self.render.video_size = None;
        self.render.rotation = 0;
        self.audio.ducked = false;
        self.abandon_audio_focus();

        let changed = self.transition(Trigger::Reset);

        // Idle is only entered on a state change; the controls are reset
        // regardless.
        let controls_dirty = self.is_locked() || self.controls_visible();
        self.set_locked(false);
        self.hide_controls();

        if released_backend || released_surface || had_source || changed || controls_dirty {
            info!("Player released");
            self.emit(PlayerEvent::Released);
        }
    }

    // ========================================================================
    // Mailbox
    // ========================================================================

    /// Handle for sending commands from outside the control thread.
    pub fn handle(&self) -> PlayerHandle {
        self.mailbox.handle()
    }

    /// Apply every queued callback and command. Returns how many were
    /// applied (stale callbacks are not counted).
    pub fn dispatch_pending(&mut self) -> usize {
        let batch = self.mailbox.drain();
        self.process(batch)
    }

    /// Wait for at least one callback or command, then apply everything
    /// queued.
    pub async fn run_next(&mut self) -> usize {
        let batch = self.mailbox.next_batch().await;
        self.process(batch)
    }

    fn process(&mut self, batch: Vec<Envelope>) -> usize {
        let mut applied = 0;
        for envelope in batch {
            match envelope {
                Envelope::Decoder { generation, event } => {
                    if !self.mailbox.is_current(generation) {
                        trace!(generation, ?event, "Dropping stale decoder event");
                        continue;
                    }
                    self.on_decoder_event(event);
                }
                Envelope::Command(command) => self.on_command(command),
                Envelope::AudioFocus(change) => self.on_audio_focus_change(change),
            }
            applied += 1;
        }
        applied
    }

    fn on_decoder_event(&mut self, event: DecoderEvent) {
        match event {
            DecoderEvent::Prepared => self.on_prepared(),
            DecoderEvent::Error { what, extra } => self.fail(what, extra),
            DecoderEvent::Completion => self.on_completion(),
            DecoderEvent::BufferingStart => {
                self.transition(Trigger::BufferingStart);
            }
            DecoderEvent::BufferingEnd => {
                self.transition(Trigger::BufferingEnd);
            }
            DecoderEvent::BufferingUpdate(percent) => self.buffered = percent.min(100),
            DecoderEvent::VideoSizeChanged { width, height } => {
                self.on_video_size_changed(width, height)
            }
            DecoderEvent::RotationChanged(degrees) => {
                self.render.rotation = degrees % 360;
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_rotation(self.render.rotation);
                }
            }
            DecoderEvent::RenderingStart => debug!("First frame rendered"),
        }
    }

    fn on_prepared(&mut self) {
        if !self.transition(Trigger::Prepared) {
            trace!(state = ?self.state.current(), "Ignoring prepared callback");
            return;
        }

        if (self.audio.speed - 1.0).abs() > f32::EPSILON {
            let speed = self.audio.speed;
            if let Some(binding) = self.binding.as_mut() {
                if let Err(err) = binding.backend.set_speed(speed) {
                    warn!(%err, speed, "Backend rejected playback speed");
                }
            }
        }

        let seek = std::mem::take(&mut self.pending_seek);
        if seek > 0 {
            debug!(position_ms = seek, "Applying deferred seek");
            self.seek_backend(seek.min(i64::MAX as u64) as i64);
        }

        if std::mem::take(&mut self.play_when_prepared) {
            if let Err(err) = self.start() {
                warn!(%err, "Could not start after prepare");
            }
        }
    }

    fn on_completion(&mut self) {
        if !self.transition(Trigger::Completion) {
            return;
        }
        self.pending_seek = 0;
        self.play_when_prepared = false;
        if let (Some(store), Some(source)) = (&self.progress, &self.source) {
            store.lock().remove(&source.uri);
        }
        self.emit(PlayerEvent::Completed);
    }

    fn on_video_size_changed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.render.video_size = Some((width, height));
        if let Some(surface) = self.surface.as_mut() {
            surface.set_video_size(width, height);
        }
        self.emit(PlayerEvent::VideoSizeChanged { width, height });
    }

    fn on_audio_focus_change(&mut self, change: AudioFocusChange) {
        let playing = self.is_advancing();
        let muted = self.audio.muted;
        let Some(focus) = self.focus.as_mut() else {
            trace!(?change, "No audio focus host, ignoring change");
            return;
        };

        for action in focus.on_change(change, playing, muted) {
            match action {
                FocusAction::Resume => {
                    if let Err(err) = self.resume() {
                        warn!(%err, "Could not resume after regaining audio focus");
                    }
                }
                FocusAction::Pause => {
                    self.pause_playback();
                }
                FocusAction::Duck => {
                    self.audio.ducked = true;
                    self.push_volume();
                }
                FocusAction::Restore => {
                    if std::mem::take(&mut self.audio.ducked) {
                        self.push_volume();
                    }
                }
            }
        }
    }

    fn on_command(&mut self, command: PlayerCommand) {
        trace!(?command, "Applying component command");
        let result = match command {
            PlayerCommand::Start => self.start(),
            PlayerCommand::Pause => {
                self.pause();
                Ok(())
            }
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::SeekTo(position_ms) => {
                self.seek_to(position_ms);
                Ok(())
            }
            PlayerCommand::Replay { reset_position } => self.replay(reset_position),
            PlayerCommand::RequestFullScreen { reversed } => {
                self.request_full_screen(reversed).map(drop)
            }
            PlayerCommand::RequestTinyScreen => self.request_tiny_screen().map(drop),
            PlayerCommand::RequestNormal => self.request_normal().map(drop),
            PlayerCommand::ToggleFullScreen => self.toggle_full_screen(false).map(drop),
            PlayerCommand::SetLocked(locked) => {
                self.set_locked(locked);
                Ok(())
            }
            PlayerCommand::ToggleLock => {
                self.toggle_lock();
                Ok(())
            }
            PlayerCommand::ShowControls => {
                self.show_controls();
                Ok(())
            }
            PlayerCommand::HideControls => {
                self.hide_controls();
                Ok(())
            }
            PlayerCommand::ToggleControls => {
                self.toggle_controls();
                Ok(())
            }
            PlayerCommand::SetMute(muted) => {
                self.set_mute(muted);
                Ok(())
            }
            PlayerCommand::SetSpeed(speed) => self.set_speed(speed),
            PlayerCommand::Release => {
                self.release();
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(?command, %err, "Component command failed");
        }
    }

    // ========================================================================
    // Screen modes
    // ========================================================================

    /// Set the container the player occupies in normal mode.
    pub fn bind_container(&mut self, container: ContainerId) -> Result<()> {
        self.display.bind_container(container)
    }

    /// Returns `false` if already full-screen.
    pub fn request_full_screen(&mut self, reversed: bool) -> Result<bool> {
        let from = self.display.mode();
        let changed = self.display.request_full_screen(reversed)?;
        self.after_mode_request(from, changed);
        Ok(changed)
    }

    /// Returns `false` if already tiny.
    pub fn request_tiny_screen(&mut self) -> Result<bool> {
        let from = self.display.mode();
        let changed = self.display.request_tiny_screen()?;
        self.after_mode_request(from, changed);
        Ok(changed)
    }

    /// Returns `false` if already normal.
    pub fn request_normal(&mut self) -> Result<bool> {
        let from = self.display.mode();
        let changed = self.display.request_normal()?;
        self.after_mode_request(from, changed);
        Ok(changed)
    }

    pub fn toggle_full_screen(&mut self, reversed: bool) -> Result<bool> {
        let from = self.display.mode();
        let changed = self.display.toggle_full_screen(reversed)?;
        self.after_mode_request(from, changed);
        Ok(changed)
    }

    pub fn set_tiny_screen_size(&mut self, size: Option<(u32, u32)>) -> Result<()> {
        self.display.set_tiny_screen_size(size)
    }

    fn after_mode_request(&mut self, from: ScreenMode, changed: bool) {
        if !changed {
            return;
        }
        let to = self.display.mode();
        info!(?from, ?to, "Screen mode changed");
        self.hub.set_controller_bound(self.display.is_controller_bound());
        self.hub.publish(ComponentEvent::ScreenMode(to));
        self.emit(PlayerEvent::ScreenModeChanged { from, to });
    }

    // ========================================================================
    // Control components
    // ========================================================================

    /// Attach a control component. It receives a [`PlayerHandle`] and the
    /// current state right away. Returns `false` if already attached.
    pub fn add_component(&mut self, component: &Rc<dyn ControlComponent>) -> bool {
        self.hub.add(component)
    }

    pub fn remove_component(&mut self, component: &Rc<dyn ControlComponent>) -> bool {
        self.hub.remove(component)
    }

    pub fn component_count(&self) -> usize {
        self.hub.len()
    }

    /// Route a gesture to components. Returns whether one consumed it.
    pub fn dispatch_gesture(&mut self, gesture: Gesture) -> bool {
        self.hub.dispatch_gesture(gesture)
    }

    pub fn set_locked(&mut self, locked: bool) {
        if self.hub.snapshot().locked == locked {
            return;
        }
        debug!(locked, "Lock state changed");
        self.hub.publish(ComponentEvent::Lock(locked));
        self.emit(PlayerEvent::LockChanged { locked });
    }

    pub fn toggle_lock(&mut self) {
        let locked = !self.is_locked();
        self.set_locked(locked);
    }

    pub fn is_locked(&self) -> bool {
        self.hub.snapshot().locked
    }

    pub fn show_controls(&mut self) {
        self.hub.publish(ComponentEvent::Visibility(true));
    }

    pub fn hide_controls(&mut self) {
        self.hub.publish(ComponentEvent::Visibility(false));
    }

    pub fn toggle_controls(&mut self) {
        if self.controls_visible() {
            self.hide_controls();
        } else {
            self.show_controls();
        }
    }

    /// Whether controls were asked to be shown. Components may still be told
    /// they are hidden while locked or in tiny-screen.
    pub fn controls_visible(&self) -> bool {
        self.hub.snapshot().controls_shown
    }

    /// Broadcast the current position to components. Returns
    /// `(duration, position)`, or `None` outside playback states.
    pub fn tick_progress(&mut self) -> Option<(u64, u64)> {
        if !self.is_in_playback_state() {
            return None;
        }
        let binding = self.binding.as_ref()?;
        let duration_ms = binding.backend.duration();
        let position_ms = binding.backend.current_position();
        self.hub.publish(ComponentEvent::Progress {
            duration_ms,
            position_ms,
        });
        Some((duration_ms, position_ms))
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// # Errors
    ///
    /// [`PlaybackError::InvalidVolume`] unless both channels are in `[0, 1]`.
    pub fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        for volume in [left, right] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(PlaybackError::InvalidVolume(volume));
            }
        }
        self.audio.volume = (left, right);
        if !self.audio.muted {
            self.push_volume();
        }
        Ok(())
    }

    pub fn volume(&self) -> (f32, f32) {
        self.audio.volume
    }

    pub fn set_mute(&mut self, muted: bool) {
        if self.audio.muted == muted {
            return;
        }
        self.audio.muted = muted;
        self.push_volume();
    }

    pub fn is_mute(&self) -> bool {
        self.audio.muted
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.audio.looping = looping;
        if self.state.current() == PlayState::Error {
            return;
        }
        if let Some(binding) = self.binding.as_mut() {
            if let Err(err) = binding.backend.set_looping(looping) {
                warn!(%err, "Backend rejected looping");
            }
        }
    }

    pub fn is_looping(&self) -> bool {
        self.audio.looping
    }

    /// # Errors
    ///
    /// [`PlaybackError::InvalidSpeed`] unless `speed` is finite and positive.
    pub fn set_speed(&mut self, speed: f32) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PlaybackError::InvalidSpeed(speed));
        }
        self.audio.speed = speed;
        if self.is_in_playback_state() {
            if let Some(binding) = self.binding.as_mut() {
                if let Err(err) = binding.backend.set_speed(speed) {
                    warn!(%err, speed, "Backend rejected playback speed");
                }
            }
        }
        Ok(())
    }

    /// Current speed; `1.0` outside playback states.
    pub fn speed(&self) -> f32 {
        match &self.binding {
            Some(binding) if self.is_in_playback_state() => binding.backend.speed(),
            _ => 1.0,
        }
    }

    /// Whether the player is ducked under another application's audio.
    pub fn is_ducked(&self) -> bool {
        self.audio.ducked
    }

    pub fn set_audio_focus_enabled(&mut self, enabled: bool) {
        self.config.audio_focus_enabled = enabled;
        if let Some(focus) = self.focus.as_mut() {
            focus.set_enabled(enabled);
        }
        if !enabled && std::mem::take(&mut self.audio.ducked) {
            self.push_volume();
        }
    }

    pub fn is_audio_focus_enabled(&self) -> bool {
        self.focus.as_ref().is_some_and(AudioFocus::is_enabled)
    }

    pub fn has_audio_focus(&self) -> bool {
        self.focus.as_ref().is_some_and(AudioFocus::is_held)
    }

    fn request_audio_focus(&mut self) {
        if self.audio.muted {
            return;
        }
        if let Some(focus) = self.focus.as_mut() {
            focus.request();
        }
    }

    fn abandon_audio_focus(&mut self) {
        if let Some(focus) = self.focus.as_mut() {
            focus.abandon();
        }
    }

    /// Cached settings are applied to the next backend after an error.
    fn push_volume(&mut self) {
        if self.state.current() == PlayState::Error {
            return;
        }
        let (left, right) = self.audio.effective_volume();
        if let Some(binding) = self.binding.as_mut() {
            if let Err(err) = binding.backend.set_volume(left, right) {
                warn!(%err, "Backend rejected volume");
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn set_aspect_ratio_mode(&mut self, mode: AspectRatioMode) {
        self.render.aspect_ratio = mode;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_aspect_ratio_mode(mode);
        }
    }

    pub fn aspect_ratio_mode(&self) -> AspectRatioMode {
        self.render.aspect_ratio
    }

    pub fn set_mirror(&mut self, mirrored: bool) {
        self.render.mirrored = mirrored;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_mirror(mirrored);
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.render.mirrored
    }

    /// Capture the current frame, if a surface exists and supports it.
    pub fn screenshot(&self, high_quality: bool) -> Option<Screenshot> {
        self.surface.as_ref()?.screenshot(high_quality)
    }

    /// `(width, height)` as last reported by the decoder; `(0, 0)` if unknown.
    pub fn video_size(&self) -> (u32, u32) {
        self.render.video_size.unwrap_or((0, 0))
    }

    pub fn rotation(&self) -> u16 {
        self.render.rotation
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn current_state(&self) -> PlayState {
        self.state.current()
    }

    /// Codes of the failure that put the player into `Error`.
    pub fn last_error(&self) -> Option<(i32, i32)> {
        self.state.last_error()
    }

    pub fn screen_mode(&self) -> ScreenMode {
        self.display.mode()
    }

    pub fn is_in_playback_state(&self) -> bool {
        self.binding.is_some() && self.state.current().is_playback_state()
    }

    pub fn is_playing(&self) -> bool {
        self.is_in_playback_state()
            && self
                .binding
                .as_ref()
                .is_some_and(|binding| binding.backend.is_playing())
    }

    /// Position in milliseconds; 0 outside playback states.
    pub fn current_position(&self) -> u64 {
        match &self.binding {
            Some(binding) if self.is_in_playback_state() => binding.backend.current_position(),
            _ => 0,
        }
    }

    /// Duration in milliseconds; `None` outside playback states.
    pub fn duration(&self) -> Option<u64> {
        match &self.binding {
            Some(binding) if self.is_in_playback_state() => Some(binding.backend.duration()),
            _ => None,
        }
    }

    pub fn buffered_percentage(&self) -> u8 {
        match &self.binding {
            Some(binding) if self.is_in_playback_state() => {
                self.buffered.max(binding.backend.buffered_percentage())
            }
            _ => 0,
        }
    }

    pub fn data_source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.backend.name())
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn progress_store(&self) -> Option<&SharedProgressStore> {
        self.progress.as_ref()
    }

    /// Subscribe to [`PlayerEvent`]s. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// Install a different decoder factory. The current backend is kept
    /// until the next data source, which gets a backend from `factory`.
    pub fn set_decoder_factory(&mut self, factory: D) {
        self.decoder_factory = factory;
        self.rebind_requested = true;
        debug!("Decoder factory replaced");
    }

    /// Install a different render factory, used for the next surface.
    pub fn set_render_factory(&mut self, factory: R) {
        self.render_factory = factory;
        debug!("Render factory replaced");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn transition(&mut self, trigger: Trigger) -> bool {
        let Some(change) = self.state.apply(trigger) else {
            return false;
        };
        debug!(from = ?change.from, to = ?change.to, ?trigger, "Play state changed");

        self.hub.publish(ComponentEvent::PlayState(change.to));
        match change.to {
            PlayState::Idle | PlayState::PlaybackCompleted => {
                self.set_locked(false);
                self.hide_controls();
                if change.to == PlayState::Idle {
                    self.hub.remove_dissociated();
                }
            }
            PlayState::Error => self.hide_controls(),
            _ => {}
        }

        self.emit(PlayerEvent::StateChanged {
            from: change.from,
            to: change.to,
        });
        true
    }

    fn ignore(&self, operation: &'static str) {
        let err = PlaybackError::InvalidTransition {
            operation,
            state: self.state.current(),
        };
        debug!(%err, "Ignoring request");
    }

    fn fail(&mut self, what: i32, extra: i32) {
        error!(
            what,
            extra,
            backend = ?self.backend_name(),
            state = ?self.state.current(),
            "Playback failed"
        );
        self.play_when_prepared = false;
        if self.transition(Trigger::Error { what, extra }) {
            self.emit(PlayerEvent::Error { what, extra });
        }
    }

    /// Run a backend call; a failure moves the player to `Error`.
    fn call_backend(
        &mut self,
        operation: &'static str,
        call: impl FnOnce(&mut D::Backend) -> BridgeResult<()>,
    ) -> bool {
        let Some(binding) = self.binding.as_mut() else {
            return false;
        };
        match call(&mut binding.backend) {
            Ok(()) => true,
            Err(err) => {
                self.fail_with(operation, err);
                false
            }
        }
    }

    fn fail_with(&mut self, operation: &'static str, err: BridgeError) {
        warn!(operation, %err, "Backend call failed");
        let (what, extra) = err.codes().unwrap_or((MEDIA_ERROR_UNKNOWN, 0));
        self.fail(what, extra);
    }

    fn seek_backend(&mut self, position_ms: i64) {
        let duration = self
            .binding
            .as_ref()
            .map_or(0, |binding| binding.backend.duration());
        let target = clamp_position(position_ms, duration);
        self.call_backend("seek_to", |backend| backend.seek_to(target));
    }

    fn emit(&self, event: PlayerEvent) {
        // Having no subscribers is normal.
        let _ = self.events.emit(event);
    }

    fn ensure_backend(&mut self) -> Result<()> {
        if self.binding.is_some() {
            return Ok(());
        }
        let backend = self.create_backend()?;
        self.install_backend(backend);
        Ok(())
    }

    fn create_backend(&self) -> Result<D::Backend> {
        self.decoder_factory
            .create(&self.context)
            .map_err(creation_error)
    }

    /// Whether the next source will get its backend from the factory.
    fn needs_new_backend(&self) -> bool {
        match &self.binding {
            None => true,
            Some(binding) => {
                binding.loaded && (!self.config.backend_reusable || self.rebind_requested)
            }
        }
    }

    fn install_backend(&mut self, mut backend: D::Backend) {
        let (generation, sink) = self.mailbox.bind();
        backend.set_event_sink(Some(sink));

        if let Err(err) = self.audio.apply_to(&mut backend) {
            warn!(%err, "Backend rejected initial audio settings");
        }

        info!(backend = backend.name(), generation, "Decoder backend bound");
        self.emit(PlayerEvent::BackendBound {
            backend: backend.name().to_string(),
            generation,
        });

        self.binding = Some(Binding {
            backend,
            generation,
            loaded: false,
            surface_bound: false,
        });
        self.rebind_requested = false;
    }

    fn ensure_surface(&mut self) -> Result<()> {
        if self.surface.is_none() {
            let mut surface = self
                .render_factory
                .create(&self.context)
                .map_err(creation_error)?;
            self.render.apply_to(&mut surface);

            if let Err(err) = self.display.attach_surface(surface.view()) {
                surface.release();
                return Err(err);
            }
            debug!(surface = surface.name(), "Render surface created");
            self.surface = Some(surface);
            if let Some(binding) = self.binding.as_mut() {
                binding.surface_bound = false;
            }
        }

        if let (Some(surface), Some(binding)) = (self.surface.as_mut(), self.binding.as_mut()) {
            if !binding.surface_bound {
                let backend: &mut dyn DecoderBackend = &mut binding.backend;
                surface.bind_backend(Some(backend))?;
                binding.surface_bound = true;
            }
        }
        Ok(())
    }

    /// Bind a backend and surface as needed and hand the source to the
    /// backend.
    fn load_source(&mut self) -> Result<()> {
        let source = self.source.clone().ok_or(PlaybackError::NoDataSource)?;

        self.recycle_backend();
        self.ensure_backend()?;
        self.ensure_surface()?;

        if let Some(binding) = self.binding.as_mut() {
            binding.backend.set_data_source(&source)?;
            binding.loaded = true;
        }
        Ok(())
    }

    /// Make a backend that has seen a source ready for the next one: reset
    /// and keep it, or release it so the factory makes a fresh one.
    fn recycle_backend(&mut self) {
        let reusable = self.config.backend_reusable && !self.rebind_requested;
        let reused = match self.binding.as_mut() {
            None => return,
            Some(binding) if !binding.loaded => return,
            Some(binding) if reusable => match binding.backend.reset() {
                Ok(()) => {
                    binding.loaded = false;
                    true
                }
                Err(err) => {
                    warn!(%err, "Backend reset failed, recreating");
                    false
                }
            },
            Some(_) => false,
        };

        if reused {
            if let Some(binding) = self.binding.as_mut() {
                if let Err(err) = self.audio.apply_to(&mut binding.backend) {
                    warn!(%err, "Backend rejected audio settings");
                }
            }
            self.rotate_generation();
            trace!("Decoder backend reused");
        } else {
            self.release_binding();
        }
    }

    /// Give the bound backend a fresh generation so callbacks about the
    /// previous source are dropped.
    fn rotate_generation(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            let (generation, sink) = self.mailbox.bind();
            binding.backend.set_event_sink(Some(sink));
            binding.generation = generation;
        }
    }

    fn release_binding(&mut self) -> bool {
        let Some(mut binding) = self.binding.take() else {
            return false;
        };

        if binding.surface_bound {
            if let Some(surface) = self.surface.as_mut() {
                if let Err(err) = surface.bind_backend(None) {
                    warn!(%err, "Render surface unbind failed");
                }
            }
        }
        binding.backend.set_event_sink(None);
        binding.backend.release();
        self.mailbox.invalidate();

        debug!(
            backend = binding.backend.name(),
            generation = binding.generation,
            "Decoder backend released"
        );
        true
    }

    fn release_surface(&mut self) -> bool {
        let Some(mut surface) = self.surface.take() else {
            return false;
        };

        if let Some(binding) = self.binding.as_mut() {
            if binding.surface_bound {
                binding.surface_bound = false;
                if let Err(err) = surface.bind_backend(None) {
                    warn!(%err, "Render surface unbind failed");
                }
            }
        }
        if let Err(err) = self.display.detach_surface() {
            warn!(%err, "Render surface detach failed");
        }
        surface.release();
        debug!(surface = surface.name(), "Render surface released");
        true
    }

    fn save_progress(&self) {
        if !self.config.remember_progress || !self.state.current().is_playback_state() {
            return;
        }
        let (Some(store), Some(source), Some(binding)) = (&self.progress, &self.source, &self.binding)
        else {
            return;
        };
        let position = binding.backend.current_position();
        if position > 0 {
            store.lock().save(&source.uri, position);
        }
    }

    fn restored_position(&self, uri: &str) -> u64 {
        if !self.config.remember_progress {
            return 0;
        }
        self.progress
            .as_ref()
            .and_then(|store| store.lock().get(uri))
            .unwrap_or(0)
    }
}

impl<D: DecoderFactory, R: RenderFactory> Drop for PlaybackOrchestrator<D, R> {
    fn drop(&mut self) {
        self.release();
    }
}
