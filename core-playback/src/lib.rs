//! # Playback Coordination Module
//!
//! The coordination core of a video player: it decides which decoder and
//! render surface are bound, which state playback is in, where the video is
//! shown and which UI components hear about it.
//!
//! ## Overview
//!
//! This module handles:
//! - Playback lifecycle ([`state::PlaybackStateMachine`])
//! - Screen modes and surface reparenting ([`display::DisplayCoordinator`])
//! - Broadcasting to UI control components ([`hub::ComponentHub`])
//! - Marshaling backend callbacks onto the control thread ([`mailbox`])
//! - Audio focus bookkeeping ([`focus`])
//! - Tying it together behind one API ([`orchestrator::PlaybackOrchestrator`])
//!
//! Decoders and render surfaces are pluggable through
//! [`factory::DecoderFactory`] and [`factory::RenderFactory`]; the contracts
//! they implement live in `bridge-traits`.

pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod factory;
pub mod focus;
pub mod hub;
pub mod mailbox;
pub mod orchestrator;
pub mod progress;
pub mod state;

pub use config::PlayerConfig;
pub use display::{DisplayCoordinator, ScreenMode};
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use factory::{
    boxed_decoder_factory, boxed_render_factory, decoder_factory_fn, render_factory_fn,
    BoxedDecoderFactory, BoxedRenderFactory, DecoderFactory, FnDecoderFactory, FnRenderFactory,
    RenderFactory,
};
pub use focus::DUCK_VOLUME;
pub use hub::{ComponentEvent, ComponentHub, ControlComponent, DispatchReport, Gesture, Snapshot};
pub use mailbox::{PlayerCommand, PlayerHandle};
pub use orchestrator::{next_progress_delay, PlaybackOrchestrator};
pub use progress::{ProgressStore, SharedProgressStore};
pub use state::{PlayState, PlaybackStateMachine, StateChange, Trigger};
