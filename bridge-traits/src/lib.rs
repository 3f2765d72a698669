//! # Host Bridge Traits
//!
//! Contracts between the playback coordination core and the collaborators it
//! drives but does not implement.
//!
//! ## Overview
//!
//! The core decides *when* media is decoded, *where* the picture is shown and
//! *who* gets told about it. The actual decoding, pixel presentation and view
//! hierarchy belong to the host. Each trait in this crate is one of those
//! host-provided capabilities.
//!
//! ## Traits
//!
//! ### Media
//! - [`DecoderBackend`](decoder::DecoderBackend) - Demux/decode engine with an async callback contract
//! - [`DecoderEventSink`](decoder::DecoderEventSink) - Thread-safe channel the backend posts callbacks into
//! - [`RenderSurface`](render::RenderSurface) - Presents decoded frames and reports geometry
//! - [`AudioFocusHost`](audio::AudioFocusHost) - Arbitrates the shared audio output between apps
//!
//! ### Layout
//! - [`ViewHost`](display::ViewHost) - The host container hierarchy the render surface is moved through
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//! - [`RuntimeContext`](context::RuntimeContext) - Parameters handed to backend factories
//!
//! ## Reference implementations
//!
//! | Trait | Implementation | Use |
//! |-------|----------------|-----|
//! | `LoggerSink` | [`ConsoleLogger`](logging::ConsoleLogger) | Development |
//! | `ViewHost` | [`InMemoryViewHost`](display::InMemoryViewHost) | Tests, headless hosts |
//!
//! ## Threading
//!
//! Backends decode on their own threads. Everything they report goes through
//! [`DecoderEventSink`](decoder::DecoderEventSink), which must be `Send + Sync`;
//! audio focus changes likewise go through an
//! [`AudioFocusListener`](audio::AudioFocusListener).
//! Every other trait is driven from a single control thread and only requires
//! `Send` so the owner can be moved onto that thread.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.

pub mod audio;
pub mod context;
pub mod decoder;
pub mod display;
pub mod error;
pub mod logging;
pub mod platform;
pub mod render;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioFocusChange, AudioFocusHost, AudioFocusListener};
pub use context::RuntimeContext;
pub use decoder::{DecoderBackend, DecoderEvent, DecoderEventSink, MediaSource, VideoOutput};
pub use display::{ContainerId, InMemoryViewHost, Layout, Orientation, Rect, ViewHost, ViewId};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use render::{AspectRatioMode, PixelFormat, RenderSurface, Screenshot};
