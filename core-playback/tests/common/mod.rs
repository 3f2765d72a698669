//! Hand-written collaborators for the orchestrator scenario tests.
//!
//! Backends and surfaces record what the orchestrator asked of them into
//! shared state that the test keeps a probe on. The scripted backend never
//! calls back on its own; the test posts callbacks through the probe, the
//! way a decoder thread would.

#![allow(dead_code)]

use bridge_traits::audio::{AudioFocusChange, AudioFocusHost, AudioFocusListener};
use bridge_traits::context::RuntimeContext;
use bridge_traits::decoder::{DecoderBackend, DecoderEvent, DecoderEventSink, MediaSource, VideoOutput};
use bridge_traits::display::{ContainerId, InMemoryViewHost, ViewId};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::render::{AspectRatioMode, PixelFormat, RenderSurface, Screenshot};
use core_playback::{
    ComponentEvent, ControlComponent, DecoderFactory, Gesture, PlaybackError, PlaybackOrchestrator,
    PlayState, PlayerConfig, PlayerHandle, RenderFactory, Result, ScreenMode,
};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub const INLINE: ContainerId = ContainerId(1);
pub const OVERLAY: ContainerId = ContainerId(2);
pub const FLOATING: ContainerId = ContainerId(3);

// ============================================================================
// Decoder backend
// ============================================================================

#[derive(Default)]
pub struct BackendState {
    pub calls: Vec<String>,
    pub sinks: Vec<Arc<dyn DecoderEventSink>>,
    pub created: usize,
    pub released: usize,
    pub source: Option<String>,
    pub position: u64,
    pub duration: u64,
    pub playing: bool,
    pub buffered: u8,
    pub volume: (f32, f32),
    pub looping: bool,
    pub speed: f32,
    pub video_output: Option<VideoOutput>,
    /// Operation name that fails with a backend error.
    pub fail_on: Option<&'static str>,
    /// Make the factory fail.
    pub refuse_creation: bool,
}

/// Test-side view of every backend a [`ScriptedFactory`] created.
#[derive(Clone, Default)]
pub struct BackendProbe(pub Arc<Mutex<BackendState>>);

impl BackendProbe {
    /// Post through the most recently installed sink.
    pub fn post(&self, event: DecoderEvent) {
        let sink = self.0.lock().sinks.last().cloned();
        if let Some(sink) = sink {
            sink.post(event);
        }
    }

    /// Post through a sink installed earlier (a callback from an old binding).
    pub fn post_via(&self, index: usize, event: DecoderEvent) {
        let sink = self.0.lock().sinks.get(index).cloned();
        if let Some(sink) = sink {
            sink.post(event);
        }
    }

    pub fn sink_count(&self) -> usize {
        self.0.lock().sinks.len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.0.lock().calls.clear();
    }

    pub fn created(&self) -> usize {
        self.0.lock().created
    }

    pub fn released(&self) -> usize {
        self.0.lock().released
    }

    pub fn set_timeline(&self, position: u64, duration: u64) {
        let mut state = self.0.lock();
        state.position = position;
        state.duration = duration;
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.0.lock().fail_on = Some(operation);
    }

    pub fn refuse_creation(&self, refuse: bool) {
        self.0.lock().refuse_creation = refuse;
    }

    pub fn volume(&self) -> (f32, f32) {
        self.0.lock().volume
    }
}

pub struct ScriptedBackend {
    name: &'static str,
    probe: BackendProbe,
}

impl ScriptedBackend {
    fn record(&mut self, call: impl Into<String>) -> BridgeResult<()> {
        let call = call.into();
        let mut state = self.probe.0.lock();
        let failing = state.fail_on.is_some_and(|op| call.starts_with(op));
        state.calls.push(call.clone());
        if failing {
            return Err(BridgeError::Backend {
                what: 1,
                extra: -1004,
                message: format!("{} failed", call),
            });
        }
        Ok(())
    }
}

impl DecoderBackend for ScriptedBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn set_event_sink(&mut self, sink: Option<Arc<dyn DecoderEventSink>>) {
        let mut state = self.probe.0.lock();
        match sink {
            Some(sink) => {
                state.calls.push("set_event_sink".into());
                state.sinks.push(sink);
            }
            None => state.calls.push("clear_event_sink".into()),
        }
    }

    fn set_data_source(&mut self, source: &MediaSource) -> BridgeResult<()> {
        self.record("set_data_source")?;
        self.probe.0.lock().source = Some(source.uri.clone());
        Ok(())
    }

    fn set_video_output(&mut self, output: Option<VideoOutput>) -> BridgeResult<()> {
        self.probe.0.lock().video_output = output;
        Ok(())
    }

    fn prepare_async(&mut self) -> BridgeResult<()> {
        self.record("prepare_async")
    }

    fn start(&mut self) -> BridgeResult<()> {
        self.record("start")?;
        self.probe.0.lock().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.record("pause")?;
        self.probe.0.lock().playing = false;
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.record("stop")?;
        self.probe.0.lock().playing = false;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> BridgeResult<()> {
        self.record(format!("seek_to({})", position_ms))?;
        self.probe.0.lock().position = position_ms;
        Ok(())
    }

    fn reset(&mut self) -> BridgeResult<()> {
        self.record("reset")?;
        let mut state = self.probe.0.lock();
        state.playing = false;
        state.source = None;
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.probe.0.lock();
        state.calls.push("release".into());
        state.released += 1;
        state.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.probe.0.lock().playing
    }

    fn current_position(&self) -> u64 {
        self.probe.0.lock().position
    }

    fn duration(&self) -> u64 {
        self.probe.0.lock().duration
    }

    fn buffered_percentage(&self) -> u8 {
        self.probe.0.lock().buffered
    }

    fn set_volume(&mut self, left: f32, right: f32) -> BridgeResult<()> {
        self.probe.0.lock().volume = (left, right);
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) -> BridgeResult<()> {
        self.probe.0.lock().looping = looping;
        Ok(())
    }

    fn set_speed(&mut self, speed: f32) -> BridgeResult<()> {
        self.record(format!("set_speed({})", speed))?;
        self.probe.0.lock().speed = speed;
        Ok(())
    }

    fn speed(&self) -> f32 {
        let speed = self.probe.0.lock().speed;
        if speed > 0.0 {
            speed
        } else {
            1.0
        }
    }
}

pub struct ScriptedFactory {
    pub name: &'static str,
    pub probe: BackendProbe,
}

impl ScriptedFactory {
    pub fn new(name: &'static str, probe: BackendProbe) -> Self {
        Self { name, probe }
    }
}

impl DecoderFactory for ScriptedFactory {
    type Backend = ScriptedBackend;

    fn create(&self, _context: &RuntimeContext) -> Result<ScriptedBackend> {
        let mut state = self.probe.0.lock();
        if state.refuse_creation {
            return Err(PlaybackError::BackendCreation(format!(
                "{} is unavailable",
                self.name
            )));
        }
        state.created += 1;
        Ok(ScriptedBackend {
            name: self.name,
            probe: self.probe.clone(),
        })
    }
}

// ============================================================================
// Render surface
// ============================================================================

#[derive(Default)]
pub struct SurfaceState {
    pub calls: Vec<String>,
    pub created: usize,
    pub released: usize,
    pub bound: bool,
    pub video_size: Option<(u32, u32)>,
    pub rotation: u16,
    pub aspect_ratio: AspectRatioMode,
    pub mirrored: bool,
}

#[derive(Clone, Default)]
pub struct SurfaceProbe(pub Arc<Mutex<SurfaceState>>);

impl SurfaceProbe {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().calls.clone()
    }

    pub fn created(&self) -> usize {
        self.0.lock().created
    }

    pub fn released(&self) -> usize {
        self.0.lock().released
    }

    pub fn is_bound(&self) -> bool {
        self.0.lock().bound
    }

    /// View of the `n`th surface created (0-based).
    pub fn view(n: usize) -> ViewId {
        ViewId(100 + n as u64)
    }
}

pub struct RecordingSurface {
    view: ViewId,
    probe: SurfaceProbe,
}

impl RenderSurface for RecordingSurface {
    fn name(&self) -> &str {
        "recording"
    }

    fn view(&self) -> ViewId {
        self.view
    }

    fn bind_backend(&mut self, backend: Option<&mut dyn DecoderBackend>) -> BridgeResult<()> {
        let mut state = self.probe.0.lock();
        match backend {
            Some(backend) => {
                state.calls.push(format!("bind({})", backend.name()));
                state.bound = true;
                drop(state);
                backend.set_video_output(Some(VideoOutput(self.view.0)))?;
            }
            None => {
                state.calls.push("unbind".into());
                state.bound = false;
            }
        }
        Ok(())
    }

    fn set_video_size(&mut self, width: u32, height: u32) {
        self.probe.0.lock().video_size = Some((width, height));
    }

    fn set_rotation(&mut self, degrees: u16) {
        self.probe.0.lock().rotation = degrees;
    }

    fn set_aspect_ratio_mode(&mut self, mode: AspectRatioMode) {
        self.probe.0.lock().aspect_ratio = mode;
    }

    fn set_mirror(&mut self, mirrored: bool) {
        self.probe.0.lock().mirrored = mirrored;
    }

    fn screenshot(&self, high_quality: bool) -> Option<Screenshot> {
        let format = if high_quality {
            PixelFormat::Rgba8888
        } else {
            PixelFormat::Rgb565
        };
        let size = 2 * 2 * format.bytes_per_pixel();
        Some(Screenshot::new(2, 2, format, vec![0u8; size]))
    }

    fn release(&mut self) {
        let mut state = self.probe.0.lock();
        state.calls.push("release".into());
        state.released += 1;
    }
}

pub struct SurfaceFactory {
    pub probe: SurfaceProbe,
}

impl RenderFactory for SurfaceFactory {
    type Surface = RecordingSurface;

    fn create(&self, _context: &RuntimeContext) -> Result<RecordingSurface> {
        let mut state = self.probe.0.lock();
        let view = SurfaceProbe::view(state.created);
        state.created += 1;
        Ok(RecordingSurface {
            view,
            probe: self.probe.clone(),
        })
    }
}

// ============================================================================
// Audio focus host
// ============================================================================

pub struct FocusState {
    pub calls: Vec<&'static str>,
    pub listener: Option<Arc<dyn AudioFocusListener>>,
    /// Whether requests are granted immediately.
    pub grant: bool,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            listener: None,
            grant: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct FocusRecorder(pub Arc<Mutex<FocusState>>);

impl FocusRecorder {
    /// Report a focus change the way the host would, from any thread.
    pub fn post(&self, change: AudioFocusChange) {
        let listener = self.0.lock().listener.clone();
        if let Some(listener) = listener {
            listener.on_focus_change(change);
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.0.lock().calls.clear();
    }

    pub fn grant(&self, grant: bool) {
        self.0.lock().grant = grant;
    }
}

pub struct ScriptedFocusHost {
    recorder: FocusRecorder,
}

impl AudioFocusHost for ScriptedFocusHost {
    fn set_listener(&mut self, listener: Option<Arc<dyn AudioFocusListener>>) {
        self.recorder.0.lock().listener = listener;
    }

    fn request_focus(&mut self) -> BridgeResult<bool> {
        let mut state = self.recorder.0.lock();
        state.calls.push("request");
        Ok(state.grant)
    }

    fn abandon_focus(&mut self) {
        self.recorder.0.lock().calls.push("abandon");
    }
}

// ============================================================================
// Control component
// ============================================================================

#[derive(Default)]
pub struct RecordingComponent {
    pub events: RefCell<Vec<ComponentEvent>>,
    pub handle: RefCell<Option<PlayerHandle>>,
    pub gestures: RefCell<Vec<Gesture>>,
    pub dissociated: bool,
}

impl RecordingComponent {
    pub fn events(&self) -> Vec<ComponentEvent> {
        self.events.borrow().clone()
    }

    pub fn states(&self) -> Vec<PlayState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ComponentEvent::PlayState(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn modes(&self) -> Vec<ScreenMode> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ComponentEvent::ScreenMode(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle
            .borrow()
            .clone()
            .expect("component was never attached")
    }
}

impl ControlComponent for RecordingComponent {
    fn on_attached(&self, handle: &PlayerHandle) {
        *self.handle.borrow_mut() = Some(handle.clone());
    }

    fn on_visibility_changed(&self, visible: bool) {
        self.events
            .borrow_mut()
            .push(ComponentEvent::Visibility(visible));
    }

    fn on_play_state_changed(&self, state: PlayState) {
        self.events.borrow_mut().push(ComponentEvent::PlayState(state));
    }

    fn on_screen_mode_changed(&self, mode: ScreenMode) {
        self.events.borrow_mut().push(ComponentEvent::ScreenMode(mode));
    }

    fn on_progress_changed(&self, duration_ms: u64, position_ms: u64) {
        self.events.borrow_mut().push(ComponentEvent::Progress {
            duration_ms,
            position_ms,
        });
    }

    fn on_lock_state_changed(&self, locked: bool) {
        self.events.borrow_mut().push(ComponentEvent::Lock(locked));
    }

    fn on_gesture(&self, gesture: &Gesture) -> bool {
        self.gestures.borrow_mut().push(*gesture);
        true
    }

    fn is_dissociated(&self) -> bool {
        self.dissociated
    }
}

// ============================================================================
// Harness
// ============================================================================

pub type TestPlayer = PlaybackOrchestrator<ScriptedFactory, SurfaceFactory>;

pub struct Harness {
    pub player: TestPlayer,
    pub backend: BackendProbe,
    pub surfaces: SurfaceProbe,
    pub host: InMemoryViewHost,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        Self::build(config, None)
    }

    /// Harness whose player arbitrates audio through a scripted host.
    pub fn with_audio_focus(config: PlayerConfig) -> (Self, FocusRecorder) {
        let focus = FocusRecorder::default();
        let host = ScriptedFocusHost {
            recorder: focus.clone(),
        };
        (Self::build(config, Some(Box::new(host))), focus)
    }

    fn build(config: PlayerConfig, focus: Option<Box<dyn AudioFocusHost>>) -> Self {
        let host = InMemoryViewHost::new(1080, 1920)
            .with_container(INLINE)
            .with_full_screen_container(OVERLAY)
            .with_floating_container(FLOATING);
        let backend = BackendProbe::default();
        let surfaces = SurfaceProbe::default();

        let mut player = PlaybackOrchestrator::new(
            config,
            RuntimeContext::new("test"),
            ScriptedFactory::new("scripted", backend.clone()),
            SurfaceFactory {
                probe: surfaces.clone(),
            },
            Box::new(host.clone()),
        )
        .unwrap();
        if let Some(focus) = focus {
            player = player.with_audio_focus(focus);
        }
        player.bind_container(INLINE).unwrap();

        Self {
            player,
            backend,
            surfaces,
            host,
        }
    }

    /// Attach a recording component and clear its snapshot.
    pub fn component(&mut self) -> (Rc<RecordingComponent>, Rc<dyn ControlComponent>) {
        let concrete = Rc::new(RecordingComponent::default());
        let erased: Rc<dyn ControlComponent> = concrete.clone();
        assert!(self.player.add_component(&erased));
        concrete.clear();
        (concrete, erased)
    }

    /// Set a source and drive the player to `Playing`.
    pub fn play(&mut self, uri: &str) {
        self.player.set_data_source(uri, None).unwrap();
        self.player.start().unwrap();
        self.backend.post(DecoderEvent::Prepared);
        self.player.dispatch_pending();
        assert_eq!(self.player.current_state(), PlayState::Playing);
    }

    /// Containers the `n`th surface is attached to.
    pub fn parents_of_surface(&self, n: usize) -> Vec<ContainerId> {
        let view = SurfaceProbe::view(n);
        [INLINE, OVERLAY, FLOATING]
            .into_iter()
            .filter(|container| self.host.children_of(*container).contains(&view))
            .collect()
    }
}
