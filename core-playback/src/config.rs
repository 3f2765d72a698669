//! # Player Configuration
//!
//! Policy knobs of the playback orchestrator.

use bridge_traits::render::AspectRatioMode;
use serde::{Deserialize, Serialize};

/// Orchestrator configuration.
///
/// Every field has a serde default so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Reuse the bound decoder (after `reset`) when a new data source is set,
    /// instead of asking the factory for a fresh one.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub backend_reusable: bool,

    /// Keep the render surface across bindings.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub render_reusable: bool,

    /// Save the position on release and resume from it next time the same
    /// source is opened.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub remember_progress: bool,

    /// Number of sources the progress store remembers.
    ///
    /// Default: 100.
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,

    /// Loop playback of new sources.
    ///
    /// Default: false.
    #[serde(default)]
    pub looping: bool,

    /// Request audio focus when playback starts, give it up on pause and
    /// release, and react to the host taking it away. Only has an effect
    /// once an audio focus host is installed.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub audio_focus_enabled: bool,

    /// Ask the host to hide status/navigation bars in full-screen.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub hide_system_bars_in_full_screen: bool,

    /// Tiny-window size as `(width, height)`. `None` derives it from the
    /// screen: half the width, 16:9.
    ///
    /// Default: None.
    #[serde(default)]
    pub tiny_screen_size: Option<(u32, u32)>,

    /// Buffer of the asynchronous event bus.
    ///
    /// Default: 100.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Aspect ratio applied to new render surfaces.
    ///
    /// Default: `AspectRatioMode::Default`.
    #[serde(default)]
    pub aspect_ratio: AspectRatioMode,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend_reusable: default_true(),
            render_reusable: default_true(),
            remember_progress: default_true(),
            progress_capacity: default_progress_capacity(),
            looping: false,
            audio_focus_enabled: default_true(),
            hide_system_bars_in_full_screen: default_true(),
            tiny_screen_size: None,
            event_buffer_size: default_event_buffer_size(),
            aspect_ratio: AspectRatioMode::default(),
        }
    }
}

impl PlayerConfig {
    /// Short clips: loop, never resume.
    pub fn short_form() -> Self {
        Self {
            remember_progress: false,
            looping: true,
            ..Default::default()
        }
    }

    /// Films and episodes: resume where the viewer left off.
    pub fn long_form() -> Self {
        Self {
            remember_progress: true,
            progress_capacity: 500,
            ..Default::default()
        }
    }

    pub fn with_backend_reusable(mut self, reusable: bool) -> Self {
        self.backend_reusable = reusable;
        self
    }

    pub fn with_render_reusable(mut self, reusable: bool) -> Self {
        self.render_reusable = reusable;
        self
    }

    pub fn with_audio_focus_enabled(mut self, enabled: bool) -> Self {
        self.audio_focus_enabled = enabled;
        self
    }

    pub fn with_tiny_screen_size(mut self, width: u32, height: u32) -> Self {
        self.tiny_screen_size = Some((width, height));
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress_capacity == 0 {
            return Err("progress_capacity must be > 0".to_string());
        }

        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be > 0".to_string());
        }

        if let Some((width, height)) = self.tiny_screen_size {
            if width == 0 || height == 0 {
                return Err("tiny_screen_size must be positive in both dimensions".to_string());
            }
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_progress_capacity() -> usize {
    100
}

fn default_event_buffer_size() -> usize {
    100
}
