//! # Control Component Hub
//!
//! Keeps the set of UI control components (play button, seek bar, gesture
//! layer, ...) attached to a player and broadcasts player changes to them.
//!
//! ## Registration
//!
//! The hub holds components weakly, in insertion order, keyed by pointer
//! identity. Adding the same component twice is a no-op. A component that
//! was dropped by its owner is pruned the next time the hub walks the list.
//!
//! On [`ComponentHub::add`] a component receives a [`PlayerHandle`] followed
//! by a snapshot of the current visibility, play state, screen mode and lock
//! state, so late joiners look the same as early ones.
//!
//! ## Isolation
//!
//! Every callback runs under `catch_unwind`. A panicking component is logged
//! and counted in the [`DispatchReport`]; the remaining components are still
//! notified.
//!
//! ## Visibility rules
//!
//! Components are told they are visible only if controls are shown, the
//! controller is bound (not in tiny-screen) and the player is not locked.
//! The hub tracks what it last told components and only re-notifies when
//! that effective value changes.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};

use crate::display::ScreenMode;
use crate::mailbox::PlayerHandle;
use crate::state::PlayState;

/// Touch input forwarded from the player's gesture surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    SingleTap,
    DoubleTap,
    LongPress,
    /// Horizontal drag, as a fraction of the view width (negative is left).
    HorizontalDrag(f32),
    /// Vertical drag, as a fraction of the view height (negative is up).
    VerticalDrag(f32),
    /// The current drag or long press ended.
    Released,
}

/// A UI element that observes a player.
///
/// All methods have empty defaults; implement the ones you care about.
/// Callbacks run on the control thread and must not block. Use the
/// [`PlayerHandle`] from [`on_attached`](Self::on_attached) to talk back.
pub trait ControlComponent {
    fn on_attached(&self, _handle: &PlayerHandle) {}

    fn on_visibility_changed(&self, _visible: bool) {}

    fn on_play_state_changed(&self, _state: PlayState) {}

    fn on_screen_mode_changed(&self, _mode: ScreenMode) {}

    fn on_progress_changed(&self, _duration_ms: u64, _position_ms: u64) {}

    fn on_lock_state_changed(&self, _locked: bool) {}

    /// Returns `true` if the gesture was consumed.
    fn on_gesture(&self, _gesture: &Gesture) -> bool {
        false
    }

    /// Dissociated components are removed when the player returns to idle.
    fn is_dissociated(&self) -> bool {
        false
    }
}

/// A notification for every component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentEvent {
    Visibility(bool),
    PlayState(PlayState),
    ScreenMode(ScreenMode),
    Progress { duration_ms: u64, position_ms: u64 },
    Lock(bool),
}

impl ComponentEvent {
    fn deliver(&self, component: &dyn ControlComponent) {
        match *self {
            ComponentEvent::Visibility(visible) => component.on_visibility_changed(visible),
            ComponentEvent::PlayState(state) => component.on_play_state_changed(state),
            ComponentEvent::ScreenMode(mode) => component.on_screen_mode_changed(mode),
            ComponentEvent::Progress {
                duration_ms,
                position_ms,
            } => component.on_progress_changed(duration_ms, position_ms),
            ComponentEvent::Lock(locked) => component.on_lock_state_changed(locked),
        }
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub pruned: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.pruned += other.pruned;
    }
}

/// Player state as last broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub controls_shown: bool,
    pub play_state: PlayState,
    pub screen_mode: ScreenMode,
    pub locked: bool,
    pub controller_bound: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            controls_shown: false,
            play_state: PlayState::Idle,
            screen_mode: ScreenMode::Normal,
            locked: false,
            controller_bound: true,
        }
    }
}

impl Snapshot {
    /// Visibility components should currently report.
    pub fn effective_visibility(&self) -> bool {
        self.controls_shown && self.controller_bound && !self.locked
    }
}

pub struct ComponentHub {
    components: Vec<Weak<dyn ControlComponent>>,
    handle: PlayerHandle,
    snapshot: Snapshot,
    announced_visibility: bool,
}

impl fmt::Debug for ComponentHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHub")
            .field("components", &self.components.len())
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

impl ComponentHub {
    pub fn new(handle: PlayerHandle) -> Self {
        Self {
            components: Vec::new(),
            handle,
            snapshot: Snapshot::default(),
            announced_visibility: false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// Live components.
    pub fn len(&self) -> usize {
        self.components
            .iter()
            .filter(|c| c.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, component: &Rc<dyn ControlComponent>) -> bool {
        let probe = Rc::downgrade(component);
        self.components.iter().any(|c| Weak::ptr_eq(c, &probe))
    }

    /// Register a component and bring it up to date.
    ///
    /// Returns `false` if it was already registered.
    pub fn add(&mut self, component: &Rc<dyn ControlComponent>) -> bool {
        if self.contains(component) {
            trace!("Component already attached");
            return false;
        }

        self.components.push(Rc::downgrade(component));
        debug!(components = self.components.len(), "Component attached");

        let snapshot = [
            ComponentEvent::Visibility(self.announced_visibility),
            ComponentEvent::PlayState(self.snapshot.play_state),
            ComponentEvent::ScreenMode(self.snapshot.screen_mode),
            ComponentEvent::Lock(self.snapshot.locked),
        ];
        let handle = &self.handle;
        guarded("on_attached", || component.on_attached(handle));
        for event in snapshot {
            guarded("snapshot", || event.deliver(&**component));
        }
        true
    }

    /// Unregister a component. Returns `false` if it was not registered.
    pub fn remove(&mut self, component: &Rc<dyn ControlComponent>) -> bool {
        let probe = Rc::downgrade(component);
        let before = self.components.len();
        self.components.retain(|c| !Weak::ptr_eq(c, &probe));
        before != self.components.len()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Deliver `event` to every live component in insertion order, as is.
    ///
    /// Prefer [`publish`](Self::publish), which also applies the visibility
    /// rules and keeps the snapshot current.
    pub fn notify_all(&mut self, event: ComponentEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        self.components.retain(|weak| match weak.upgrade() {
            Some(component) => {
                if guarded("notify", || event.deliver(&*component)) {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
                true
            }
            None => {
                report.pruned += 1;
                false
            }
        });

        if report.failed > 0 {
            error!(?event, failed = report.failed, "Component notification failed");
        }
        report
    }

    /// Record a player change and broadcast what components need to see.
    pub fn publish(&mut self, event: ComponentEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        match event {
            ComponentEvent::Visibility(shown) => {
                self.snapshot.controls_shown = shown;
            }
            ComponentEvent::Lock(locked) => {
                if self.snapshot.locked == locked {
                    return report;
                }
                self.snapshot.locked = locked;
                report.merge(self.notify_all(event));
            }
            ComponentEvent::PlayState(state) => {
                self.snapshot.play_state = state;
                report.merge(self.notify_all(event));
            }
            ComponentEvent::ScreenMode(mode) => {
                self.snapshot.screen_mode = mode;
                report.merge(self.notify_all(event));
            }
            ComponentEvent::Progress { .. } => {
                report.merge(self.notify_all(event));
            }
        }

        report.merge(self.sync_visibility());
        report
    }

    /// Bind or unbind the controller. Unbound components are hidden and do
    /// not receive gestures.
    pub fn set_controller_bound(&mut self, bound: bool) -> DispatchReport {
        self.snapshot.controller_bound = bound;
        self.sync_visibility()
    }

    /// Offer a gesture to components in order until one consumes it.
    ///
    /// Gestures are dropped while the controller is unbound or locked.
    pub fn dispatch_gesture(&mut self, gesture: Gesture) -> bool {
        if !self.snapshot.controller_bound || self.snapshot.locked {
            trace!(?gesture, "Gesture dropped");
            return false;
        }

        self.components.retain(|c| c.strong_count() > 0);
        for weak in &self.components {
            let Some(component) = weak.upgrade() else {
                continue;
            };
            let mut consumed = false;
            guarded("on_gesture", || consumed = component.on_gesture(&gesture));
            if consumed {
                return true;
            }
        }
        false
    }

    /// Drop components that asked to be removed on idle. Returns how many.
    pub fn remove_dissociated(&mut self) -> usize {
        let before = self.components.len();
        self.components.retain(|weak| match weak.upgrade() {
            Some(component) => {
                let mut dissociated = false;
                guarded("is_dissociated", || dissociated = component.is_dissociated());
                !dissociated
            }
            None => false,
        });
        let removed = before - self.components.len();
        if removed > 0 {
            debug!(removed, "Removed dissociated components");
        }
        removed
    }

    fn sync_visibility(&mut self) -> DispatchReport {
        let visible = self.snapshot.effective_visibility();
        if visible == self.announced_visibility {
            return DispatchReport::default();
        }
        self.announced_visibility = visible;
        self.notify_all(ComponentEvent::Visibility(visible))
    }
}

/// Run one component callback, containing any panic. Returns `false` if it
/// panicked.
fn guarded(callback: &'static str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(callback, %message, "Control component panicked");
            false
        }
    }
}
