//! Workspace facade crate.
//!
//! Host applications depend on `player-workspace` alone and reach the
//! individual crates through it. The [`prelude`] gathers what a typical host
//! needs to stand up a player.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

/// Types most hosts import.
pub mod prelude {
    pub use bridge_traits::{
        AspectRatioMode, AudioFocusChange, AudioFocusHost, ContainerId, DecoderBackend,
        DecoderEvent, DecoderEventSink, MediaSource, RenderSurface, RuntimeContext, ViewHost,
        ViewId,
    };
    pub use core_playback::{
        decoder_factory_fn, render_factory_fn, ControlComponent, Gesture, PlayState,
        PlaybackError, PlaybackOrchestrator, PlayerConfig, PlayerEvent, PlayerHandle, ScreenMode,
    };
    pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
}
