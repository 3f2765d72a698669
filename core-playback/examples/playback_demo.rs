//! # Playback Orchestrator Example
//!
//! Drives a player with a simulated decoder: the backend reports from its own
//! threads, the orchestrator applies callbacks on the main task, and a console
//! control component prints what it is told.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_traits::context::RuntimeContext;
use bridge_traits::decoder::{DecoderBackend, DecoderEvent, DecoderEventSink, MediaSource, VideoOutput};
use bridge_traits::display::{ContainerId, InMemoryViewHost, ViewId};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::logging::LogLevel;
use bridge_traits::render::{AspectRatioMode, RenderSurface, Screenshot};
use core_playback::{
    decoder_factory_fn, render_factory_fn, ControlComponent, PlayState, PlaybackOrchestrator,
    PlayerConfig, ScreenMode,
};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const INLINE: ContainerId = ContainerId(1);
const OVERLAY: ContainerId = ContainerId(2);
const FLOATING: ContainerId = ContainerId(3);

const CLIP_MS: u64 = 2_500;

// ============================================================================
// Simulated decoder
// ============================================================================

/// Pretends to decode a clip of [`CLIP_MS`]; everything it reports arrives
/// from a background thread, like a real engine.
#[derive(Default)]
struct SimulatedDecoder {
    sink: Option<Arc<dyn DecoderEventSink>>,
    loaded: bool,
    started_at: Option<Instant>,
    offset_ms: u64,
}

impl SimulatedDecoder {
    fn post_later(&self, delay: Duration, events: Vec<DecoderEvent>) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        thread::spawn(move || {
            thread::sleep(delay);
            for event in events {
                sink.post(event);
            }
        });
    }

    fn position(&self) -> u64 {
        let played = self
            .started_at
            .map_or(0, |started| started.elapsed().as_millis() as u64);
        (self.offset_ms + played).min(CLIP_MS)
    }
}

impl DecoderBackend for SimulatedDecoder {
    fn name(&self) -> &str {
        "simulated"
    }

    fn set_event_sink(&mut self, sink: Option<Arc<dyn DecoderEventSink>>) {
        self.sink = sink;
    }

    fn set_data_source(&mut self, _source: &MediaSource) -> BridgeResult<()> {
        self.loaded = true;
        Ok(())
    }

    fn set_video_output(&mut self, _output: Option<VideoOutput>) -> BridgeResult<()> {
        Ok(())
    }

    fn prepare_async(&mut self) -> BridgeResult<()> {
        self.post_later(
            Duration::from_millis(80),
            vec![
                DecoderEvent::VideoSizeChanged {
                    width: 1920,
                    height: 1080,
                },
                DecoderEvent::Prepared,
            ],
        );
        Ok(())
    }

    fn start(&mut self) -> BridgeResult<()> {
        self.started_at = Some(Instant::now());
        let remaining = CLIP_MS - self.offset_ms.min(CLIP_MS);
        self.post_later(
            Duration::from_millis(300),
            vec![DecoderEvent::BufferingStart],
        );
        self.post_later(Duration::from_millis(450), vec![DecoderEvent::BufferingEnd]);
        self.post_later(
            Duration::from_millis(remaining),
            vec![DecoderEvent::Completion],
        );
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.offset_ms = self.position();
        self.started_at = None;
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.started_at = None;
        self.offset_ms = 0;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> BridgeResult<()> {
        self.offset_ms = position_ms;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn reset(&mut self) -> BridgeResult<()> {
        *self = Self {
            sink: self.sink.take(),
            ..Default::default()
        };
        Ok(())
    }

    fn release(&mut self) {
        self.sink = None;
        self.started_at = None;
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn current_position(&self) -> u64 {
        self.position()
    }

    fn duration(&self) -> u64 {
        if self.loaded {
            CLIP_MS
        } else {
            0
        }
    }

    fn buffered_percentage(&self) -> u8 {
        100
    }

    fn set_volume(&mut self, _left: f32, _right: f32) -> BridgeResult<()> {
        Ok(())
    }

    fn set_looping(&mut self, _looping: bool) -> BridgeResult<()> {
        Ok(())
    }

    fn set_speed(&mut self, _speed: f32) -> BridgeResult<()> {
        Ok(())
    }
}

struct NullSurface;

impl RenderSurface for NullSurface {
    fn name(&self) -> &str {
        "null"
    }

    fn view(&self) -> ViewId {
        ViewId(100)
    }

    fn bind_backend(&mut self, backend: Option<&mut dyn DecoderBackend>) -> BridgeResult<()> {
        match backend {
            Some(backend) => backend.set_video_output(Some(VideoOutput(100))),
            None => Ok(()),
        }
    }

    fn set_video_size(&mut self, width: u32, height: u32) {
        println!("  [surface] video size {}x{}", width, height);
    }

    fn set_rotation(&mut self, _degrees: u16) {}

    fn set_aspect_ratio_mode(&mut self, _mode: AspectRatioMode) {}

    fn set_mirror(&mut self, _mirrored: bool) {}

    fn screenshot(&self, _high_quality: bool) -> Option<Screenshot> {
        None
    }

    fn release(&mut self) {}
}

// ============================================================================
// Console controls
// ============================================================================

struct ConsoleControls;

impl ControlComponent for ConsoleControls {
    fn on_visibility_changed(&self, visible: bool) {
        println!("  [controls] visible = {}", visible);
    }

    fn on_play_state_changed(&self, state: PlayState) {
        println!("  [controls] state = {:?}", state);
    }

    fn on_screen_mode_changed(&self, mode: ScreenMode) {
        println!("  [controls] screen mode = {:?}", mode);
    }

    fn on_progress_changed(&self, duration_ms: u64, position_ms: u64) {
        println!("  [controls] {} / {} ms", position_ms, duration_ms);
    }

    fn on_lock_state_changed(&self, locked: bool) {
        println!("  [controls] locked = {}", locked);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let host = InMemoryViewHost::new(1080, 1920)
        .with_container(INLINE)
        .with_full_screen_container(OVERLAY)
        .with_floating_container(FLOATING);

    let mut player = PlaybackOrchestrator::new(
        PlayerConfig::long_form(),
        RuntimeContext::new("com.example.demo"),
        decoder_factory_fn(|_: &RuntimeContext| Ok(SimulatedDecoder::default())),
        render_factory_fn(|_: &RuntimeContext| Ok(NullSurface)),
        Box::new(host.clone()),
    )?;
    player.bind_container(INLINE)?;

    let controls: Rc<dyn ControlComponent> = Rc::new(ConsoleControls);
    player.add_component(&controls);
    let handle = player.handle();

    println!("=== Playing ===");
    player.set_data_source("https://cdn.example.com/clip.mp4?token=secret", None)?;
    player.start()?;
    player.show_controls();

    let mut paused_once = false;
    while player.current_state() != PlayState::PlaybackCompleted {
        let woke = tokio::select! {
            _ = player.run_next() => true,
            _ = tokio::time::sleep(Duration::from_millis(250)) => false,
        };
        if woke {
            continue;
        }

        player.tick_progress();
        if !paused_once && player.current_position() > 1_000 {
            paused_once = true;
            println!("=== Full-screen, pause and resume through the handle ===");
            player.request_full_screen(false)?;
            handle.toggle_play();
            handle.toggle_play();
        }
    }

    println!("=== Completed, surface parent: {:?} ===", host.children_of(OVERLAY));
    player.request_normal()?;
    player.release();
    Ok(())
}
