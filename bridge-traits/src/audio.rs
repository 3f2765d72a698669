//! Audio Focus Abstractions
//!
//! Hosts that share one audio output between several applications arbitrate
//! it through *audio focus*. A player asks for focus before it makes sound,
//! gives it up when it stops, and reacts when the host takes focus away
//! (another app starts playing, a call comes in, a navigation prompt speaks).
//!
//! The host reports changes through an [`AudioFocusListener`]. Like decoder
//! callbacks, changes may arrive on any thread; the core marshals them onto
//! the control thread before acting on them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::platform::{PlatformSend, PlatformSendSync};

/// A change in the audio focus held by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFocusChange {
    /// Focus was granted (again) for an unbounded time.
    Gain,
    /// Focus was granted for a short time.
    GainTransient,
    /// Another application took focus for good.
    Loss,
    /// Focus was taken away for a short time.
    LossTransient,
    /// Focus was taken away briefly; playing on at a low volume is fine.
    LossTransientCanDuck,
}

impl AudioFocusChange {
    pub fn is_gain(self) -> bool {
        matches!(self, AudioFocusChange::Gain | AudioFocusChange::GainTransient)
    }

    /// `true` for losses that require playback to stop making sound.
    pub fn requires_pause(self) -> bool {
        matches!(self, AudioFocusChange::Loss | AudioFocusChange::LossTransient)
    }
}

/// Where the host reports focus changes. `Send + Sync`, never blocks.
pub trait AudioFocusListener: PlatformSendSync {
    fn on_focus_change(&self, change: AudioFocusChange);
}

/// The host's audio focus arbiter.
///
/// Driven from the control thread only.
pub trait AudioFocusHost: PlatformSend {
    /// Install (or with `None`, remove) the listener focus changes go to.
    fn set_listener(&mut self, listener: Option<Arc<dyn AudioFocusListener>>);

    /// Ask for long-term focus.
    ///
    /// Returns `Ok(true)` if it was granted immediately and `Ok(false)` if
    /// the host will grant it later through a [`AudioFocusChange::Gain`].
    fn request_focus(&mut self) -> Result<bool>;

    /// Give focus up. Pending requests are dropped too.
    fn abandon_focus(&mut self);
}

impl<T: AudioFocusHost + ?Sized> AudioFocusHost for Box<T> {
    fn set_listener(&mut self, listener: Option<Arc<dyn AudioFocusListener>>) {
        (**self).set_listener(listener)
    }

    fn request_focus(&mut self) -> Result<bool> {
        (**self).request_focus()
    }

    fn abandon_focus(&mut self) {
        (**self).abandon_focus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_change_classification() {
        assert!(AudioFocusChange::Gain.is_gain());
        assert!(AudioFocusChange::GainTransient.is_gain());
        assert!(!AudioFocusChange::LossTransientCanDuck.is_gain());

        assert!(AudioFocusChange::Loss.requires_pause());
        assert!(AudioFocusChange::LossTransient.requires_pause());
        assert!(!AudioFocusChange::LossTransientCanDuck.requires_pause());
        assert!(!AudioFocusChange::Gain.requires_pause());
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<AudioFocusChange>>);

    impl AudioFocusListener for Collect {
        fn on_focus_change(&self, change: AudioFocusChange) {
            self.0.lock().unwrap().push(change);
        }
    }

    #[test]
    fn test_listener_is_shareable_across_threads() {
        let collect = Arc::new(Collect::default());
        let listener: Arc<dyn AudioFocusListener> = collect.clone();

        std::thread::spawn(move || listener.on_focus_change(AudioFocusChange::LossTransient))
            .join()
            .unwrap();

        assert_eq!(
            *collect.0.lock().unwrap(),
            vec![AudioFocusChange::LossTransient]
        );
    }
}
