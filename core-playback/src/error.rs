//! # Playback Error Types
//!
//! Error taxonomy of the coordination core.

use bridge_traits::error::BridgeError;
use bridge_traits::display::{ContainerId, ViewId};
use thiserror::Error;

use crate::state::PlayState;

/// Errors that can occur while coordinating playback.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// A factory could not produce a usable decoder backend or render surface.
    #[error("Backend creation failed: {0}")]
    BackendCreation(String),

    /// The decoder reported a failure. Codes are opaque diagnostics.
    #[error("Decode error (what={what}, extra={extra})")]
    Decode { what: i32, extra: i32 },

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// An operation was requested in a state that does not allow it.
    ///
    /// Never returned from public operations; built only to be logged.
    #[error("{operation} is not allowed while {state:?}")]
    InvalidTransition {
        operation: &'static str,
        state: PlayState,
    },

    /// No data source has been set.
    #[error("No data source set")]
    NoDataSource,

    /// Volume must be within `[0.0, 1.0]`.
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Speed must be finite and positive.
    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f32),

    // ========================================================================
    // Display Errors
    // ========================================================================
    /// The surface was still parented when it was about to be attached.
    #[error("{view:?} is still attached to {parent:?}")]
    ReparentingConflict { view: ViewId, parent: ContainerId },

    /// The container a screen mode needs is not available.
    #[error("Container unavailable: {0}")]
    ContainerUnavailable(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if a fresh data source can recover from this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlaybackError::Decode { .. }
                | PlaybackError::BackendCreation(_)
                | PlaybackError::NoDataSource
        )
    }

    /// Returns `true` for errors that indicate a bug in the caller or host.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::ReparentingConflict { .. } | PlaybackError::Internal(_)
        )
    }

    /// Diagnostic codes for decode failures.
    pub fn codes(&self) -> Option<(i32, i32)> {
        match self {
            PlaybackError::Decode { what, extra } => Some((*what, *extra)),
            PlaybackError::Bridge(err) => err.codes(),
            _ => None,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
