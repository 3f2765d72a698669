//! Player events published on the orchestrator's [`EventBus`](core_runtime::events::EventBus).
//!
//! These mirror what control components see, for observers that prefer an
//! asynchronous stream (analytics, remote logging).

use core_runtime::events::{BusEvent, EventSeverity};
use serde::{Deserialize, Serialize};

use crate::display::ScreenMode;
use crate::state::PlayState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PlayerEvent {
    StateChanged { from: PlayState, to: PlayState },
    ScreenModeChanged { from: ScreenMode, to: ScreenMode },
    LockChanged { locked: bool },
    /// A new decoder backend was bound.
    BackendBound { backend: String, generation: u64 },
    VideoSizeChanged { width: u32, height: u32 },
    /// Decode failure; codes are opaque diagnostics.
    Error { what: i32, extra: i32 },
    Completed,
    Released,
}

impl BusEvent for PlayerEvent {
    fn description(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { .. } => "Play state changed",
            PlayerEvent::ScreenModeChanged { .. } => "Screen mode changed",
            PlayerEvent::LockChanged { locked: true } => "Controls locked",
            PlayerEvent::LockChanged { locked: false } => "Controls unlocked",
            PlayerEvent::BackendBound { .. } => "Decoder backend bound",
            PlayerEvent::VideoSizeChanged { .. } => "Video size changed",
            PlayerEvent::Error { .. } => "Playback error",
            PlayerEvent::Completed => "Playback completed",
            PlayerEvent::Released => "Player released",
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Error { .. } => EventSeverity::Error,
            PlayerEvent::StateChanged { .. }
            | PlayerEvent::Completed
            | PlayerEvent::Released => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}
