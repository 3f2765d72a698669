//! # Audio Focus Tracking
//!
//! Keeps the player's side of the audio focus conversation with the host:
//! whether focus is held, whether a start is waiting for a delayed grant, and
//! whether playback was paused because focus was lost. The orchestrator asks
//! [`AudioFocus::on_change`] what to do about a change and performs the
//! resulting [`FocusAction`]s itself.

use bridge_traits::audio::{AudioFocusChange, AudioFocusHost, AudioFocusListener};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Volume ceiling while another application speaks over the player.
pub const DUCK_VOLUME: f32 = 0.1;

/// What the orchestrator should do in response to a focus change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FocusAction {
    /// Resume playback that focus handling paused or held back.
    Resume,
    /// Pause without giving focus up, so the regain is still reported.
    Pause,
    /// Lower the volume to [`DUCK_VOLUME`].
    Duck,
    /// Undo a duck.
    Restore,
}

pub(crate) struct AudioFocus {
    host: Box<dyn AudioFocusHost>,
    enabled: bool,
    /// Last known focus; `None` while not held.
    current: Option<AudioFocusChange>,
    /// A request was not granted immediately; start once it is.
    start_requested: bool,
    paused_for_loss: bool,
}

impl AudioFocus {
    pub(crate) fn new(
        mut host: Box<dyn AudioFocusHost>,
        listener: Arc<dyn AudioFocusListener>,
        enabled: bool,
    ) -> Self {
        host.set_listener(Some(listener));
        Self {
            host,
            enabled,
            current: None,
            start_requested: false,
            paused_for_loss: false,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning focus handling off gives up any focus held.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.abandon();
        }
        self.enabled = enabled;
    }

    pub(crate) fn is_held(&self) -> bool {
        self.current.is_some_and(AudioFocusChange::is_gain)
    }

    pub(crate) fn request(&mut self) {
        if !self.enabled || self.current == Some(AudioFocusChange::Gain) {
            return;
        }
        match self.host.request_focus() {
            Ok(true) => {
                trace!("Audio focus granted");
                self.current = Some(AudioFocusChange::Gain);
            }
            Ok(false) => {
                debug!("Audio focus delayed");
                self.start_requested = true;
            }
            Err(err) => warn!(%err, "Audio focus request failed"),
        }
    }

    pub(crate) fn abandon(&mut self) {
        if !self.enabled {
            return;
        }
        self.start_requested = false;
        self.paused_for_loss = false;
        self.current = None;
        self.host.abandon_focus();
        trace!("Audio focus abandoned");
    }

    /// Decide how to react to `change`. Repeated changes are ignored.
    pub(crate) fn on_change(
        &mut self,
        change: AudioFocusChange,
        playing: bool,
        muted: bool,
    ) -> Vec<FocusAction> {
        if !self.enabled || self.current == Some(change) {
            return Vec::new();
        }
        self.current = Some(change);

        let mut actions = Vec::new();
        match change {
            AudioFocusChange::Gain | AudioFocusChange::GainTransient => {
                if std::mem::take(&mut self.start_requested)
                    | std::mem::take(&mut self.paused_for_loss)
                {
                    actions.push(FocusAction::Resume);
                }
                if !muted {
                    actions.push(FocusAction::Restore);
                }
            }
            AudioFocusChange::Loss | AudioFocusChange::LossTransient => {
                if playing {
                    self.paused_for_loss = true;
                    actions.push(FocusAction::Pause);
                }
            }
            AudioFocusChange::LossTransientCanDuck => {
                if playing && !muted {
                    actions.push(FocusAction::Duck);
                }
            }
        }
        debug!(?change, ?actions, "Audio focus changed");
        actions
    }
}

impl fmt::Debug for AudioFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFocus")
            .field("enabled", &self.enabled)
            .field("current", &self.current)
            .field("start_requested", &self.start_requested)
            .field("paused_for_loss", &self.paused_for_loss)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;

    mock! {
        Host {}
        impl AudioFocusHost for Host {
            fn set_listener(&mut self, listener: Option<Arc<dyn AudioFocusListener>>);
            fn request_focus(&mut self) -> BridgeResult<bool>;
            fn abandon_focus(&mut self);
        }
    }

    struct NullListener;

    impl AudioFocusListener for NullListener {
        fn on_focus_change(&self, _change: AudioFocusChange) {}
    }

    fn focus(host: MockHost, enabled: bool) -> AudioFocus {
        AudioFocus::new(Box::new(host), Arc::new(NullListener), enabled)
    }

    fn host() -> MockHost {
        let mut host = MockHost::new();
        host.expect_set_listener().times(1).return_const(());
        host
    }

    #[test]
    fn test_granted_request_is_not_repeated() {
        let mut host = host();
        host.expect_request_focus().times(1).returning(|| Ok(true));
        let mut focus = focus(host, true);

        focus.request();
        focus.request();
        assert!(focus.is_held());
    }

    #[test]
    fn test_delayed_grant_resumes() {
        let mut host = host();
        host.expect_request_focus().times(1).returning(|| Ok(false));
        let mut focus = focus(host, true);

        focus.request();
        assert!(!focus.is_held());
        assert_eq!(
            focus.on_change(AudioFocusChange::Gain, false, false),
            vec![FocusAction::Resume, FocusAction::Restore]
        );
        assert!(focus.is_held());
    }

    #[test]
    fn test_loss_pauses_and_regain_resumes_once() {
        let mut host = host();
        host.expect_request_focus().returning(|| Ok(true));
        let mut focus = focus(host, true);
        focus.request();

        assert_eq!(
            focus.on_change(AudioFocusChange::LossTransient, true, false),
            vec![FocusAction::Pause]
        );
        assert_eq!(
            focus.on_change(AudioFocusChange::GainTransient, false, false),
            vec![FocusAction::Resume, FocusAction::Restore]
        );
        assert_eq!(
            focus.on_change(AudioFocusChange::Loss, false, false),
            Vec::new()
        );
        assert_eq!(
            focus.on_change(AudioFocusChange::Gain, false, false),
            vec![FocusAction::Restore]
        );
    }

    #[test]
    fn test_duplicate_change_is_ignored() {
        let mut focus = focus(host(), true);
        assert_eq!(
            focus.on_change(AudioFocusChange::LossTransientCanDuck, true, false),
            vec![FocusAction::Duck]
        );
        assert!(focus
            .on_change(AudioFocusChange::LossTransientCanDuck, true, false)
            .is_empty());
    }

    #[test]
    fn test_muted_player_neither_ducks_nor_restores() {
        let mut focus = focus(host(), true);
        assert!(focus
            .on_change(AudioFocusChange::LossTransientCanDuck, true, true)
            .is_empty());
        assert!(focus.on_change(AudioFocusChange::Gain, true, true).is_empty());
    }

    #[test]
    fn test_abandon_forgets_pending_resume() {
        let mut host = host();
        host.expect_request_focus().returning(|| Ok(true));
        host.expect_abandon_focus().times(1).return_const(());
        let mut focus = focus(host, true);
        focus.request();
        focus.on_change(AudioFocusChange::LossTransient, true, false);

        focus.abandon();
        assert!(!focus.is_held());
        assert_eq!(
            focus.on_change(AudioFocusChange::Gain, false, false),
            vec![FocusAction::Restore]
        );
    }

    #[test]
    fn test_disabled_focus_never_reaches_host() {
        let mut host = host();
        host.expect_request_focus().never();
        host.expect_abandon_focus().never();
        let mut focus = focus(host, false);

        focus.request();
        focus.abandon();
        assert!(focus.on_change(AudioFocusChange::Loss, true, false).is_empty());
    }

    #[test]
    fn test_disabling_abandons_held_focus() {
        let mut host = host();
        host.expect_request_focus().returning(|| Ok(true));
        host.expect_abandon_focus().times(1).return_const(());
        let mut focus = focus(host, true);
        focus.request();

        focus.set_enabled(false);
        assert!(!focus.is_enabled());
        assert!(!focus.is_held());
    }

    #[test]
    fn test_request_failure_is_contained() {
        let mut host = host();
        host.expect_request_focus()
            .returning(|| Err(BridgeError::NotAvailable("audio service".into())));
        let mut focus = focus(host, true);

        focus.request();
        assert!(!focus.is_held());
    }
}
