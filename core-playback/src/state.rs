//! # Playback State Machine
//!
//! The single source of truth for [`PlayState`].
//!
//! ## Transitions
//!
//! ```text
//! IDLE        --Prepare--------> PREPARING
//! PREPARING   --Prepared-------> PREPARED
//! PREPARED    --Start----------> PLAYING
//! PLAYING     --Pause----------> PAUSED
//! PLAYING     --BufferingStart-> BUFFERING
//! BUFFERING   --BufferingEnd---> PLAYING  (PAUSED if a pause was requested meanwhile)
//! PAUSED      --Start----------> PLAYING
//! PLAYING | PAUSED | BUFFERING --Completion--> PLAYBACK_COMPLETED
//! any         --Error----------> ERROR
//! any         --Reset----------> IDLE
//! ```
//!
//! Any other trigger is rejected: [`PlaybackStateMachine::apply`] returns
//! `None` and nothing changes. Triggers that would leave the state where it is
//! (a second error, resetting an idle machine) are not transitions either.

use serde::{Deserialize, Serialize};

/// Player state. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayState {
    #[default]
    Idle,
    Preparing,
    Prepared,
    Playing,
    Paused,
    Buffering,
    PlaybackCompleted,
    Error,
}

impl PlayState {
    pub const ALL: [PlayState; 8] = [
        PlayState::Idle,
        PlayState::Preparing,
        PlayState::Prepared,
        PlayState::Playing,
        PlayState::Paused,
        PlayState::Buffering,
        PlayState::PlaybackCompleted,
        PlayState::Error,
    ];

    /// States in which the decoder holds prepared media and can be queried
    /// and seeked.
    pub fn is_playback_state(&self) -> bool {
        !matches!(
            self,
            PlayState::Idle
                | PlayState::Preparing
                | PlayState::PlaybackCompleted
                | PlayState::Error
        )
    }

    /// `true` while media is (or is about to resume) moving.
    pub fn is_active(&self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Buffering)
    }
}

/// What drives a transition: an API call or a decoder callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    Prepare,
    Prepared,
    Start,
    Pause,
    BufferingStart,
    BufferingEnd,
    Completion,
    Error { what: i32, extra: i32 },
    Reset,
}

/// An accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: PlayState,
    pub to: PlayState,
    pub trigger: Trigger,
}

#[derive(Debug, Default)]
pub struct PlaybackStateMachine {
    state: PlayState,
    pause_requested: bool,
    last_error: Option<(i32, i32)>,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> PlayState {
        self.state
    }

    /// Diagnostic codes of the error that put the machine into `Error`.
    pub fn last_error(&self) -> Option<(i32, i32)> {
        self.last_error
    }

    /// Whether a pause was requested while buffering.
    pub fn pause_pending(&self) -> bool {
        self.pause_requested
    }

    /// State `trigger` would lead to, or `None` if it is not a legal edge.
    pub fn target_of(&self, trigger: Trigger) -> Option<PlayState> {
        use PlayState::*;

        let target = match (self.state, trigger) {
            (Idle, Trigger::Prepare) => Preparing,
            (Preparing, Trigger::Prepared) => Prepared,
            (Prepared | Paused, Trigger::Start) => Playing,
            (Playing, Trigger::Pause) => Paused,
            (Playing, Trigger::BufferingStart) => Buffering,
            (Buffering, Trigger::BufferingEnd) if self.pause_requested => Paused,
            (Buffering, Trigger::BufferingEnd) => Playing,
            (Playing | Paused | Buffering, Trigger::Completion) => PlaybackCompleted,
            (_, Trigger::Error { .. }) => Error,
            (_, Trigger::Reset) => Idle,
            _ => return None,
        };

        (target != self.state).then_some(target)
    }

    /// Apply `trigger`, returning the transition if it was accepted.
    pub fn apply(&mut self, trigger: Trigger) -> Option<StateChange> {
        if let Trigger::Error { what, extra } = trigger {
            // A second error while already failed still updates the diagnostics.
            self.last_error = Some((what, extra));
        }

        let to = self.target_of(trigger)?;
        let from = self.state;

        self.state = to;
        self.pause_requested = false;
        if to == PlayState::Idle {
            self.last_error = None;
        }

        Some(StateChange { from, to, trigger })
    }

    /// Record a pause requested while buffering. The pause takes effect when
    /// buffering ends. Returns `false` if the machine is not buffering.
    pub fn request_pause_while_buffering(&mut self) -> bool {
        if self.state != PlayState::Buffering {
            return false;
        }
        self.pause_requested = true;
        true
    }

    /// Withdraw a pending pause (the user pressed play again while buffering).
    pub fn cancel_pending_pause(&mut self) -> bool {
        std::mem::take(&mut self.pause_requested)
    }
}
