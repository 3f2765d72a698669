//! # Display Coordinator
//!
//! Owns the [`ScreenMode`] and moves the render surface's view between host
//! containers when the mode changes.
//!
//! ## Containers
//!
//! | Mode | Container | Layout |
//! |------|-----------|--------|
//! | `Normal` | the container bound with [`DisplayCoordinator::bind_container`] | whatever the surface had there |
//! | `FullScreen` | [`ViewHost::full_screen_container`] | fills the window |
//! | `TinyScreen` | [`ViewHost::floating_container`] | fixed, bottom-right |
//!
//! ## Reparenting
//!
//! A view is always detached from its current parent before it is attached to
//! the next one. If the host still reports a parent after the detach the move
//! is abandoned with [`PlaybackError::ReparentingConflict`]. If the attach
//! itself fails the view is put back where it was, so a failed request leaves
//! both the mode and the tree untouched.
//!
//! The coordinator does not notify anybody; callers broadcast the mode change
//! when a request returns `Ok(true)`.

use bridge_traits::display::{ContainerId, Layout, Orientation, Rect, ViewHost, ViewId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, warn};

use crate::error::{PlaybackError, Result};

/// How the player occupies the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScreenMode {
    /// Not initialised yet.
    #[default]
    Unknown,
    Normal,
    FullScreen,
    TinyScreen,
}

pub struct DisplayCoordinator {
    host: Box<dyn ViewHost>,
    mode: ScreenMode,
    surface: Option<ViewId>,
    normal_container: Option<ContainerId>,
    normal_layout: Layout,
    tiny_size: Option<(u32, u32)>,
    hide_system_bars: bool,
}

impl fmt::Debug for DisplayCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayCoordinator")
            .field("host", &"ViewHost { ... }")
            .field("mode", &self.mode)
            .field("surface", &self.surface)
            .field("normal_container", &self.normal_container)
            .field("normal_layout", &self.normal_layout)
            .field("tiny_size", &self.tiny_size)
            .finish()
    }
}

impl DisplayCoordinator {
    pub fn new(host: Box<dyn ViewHost>) -> Self {
        Self {
            host,
            mode: ScreenMode::Normal,
            surface: None,
            normal_container: None,
            normal_layout: Layout::MatchParent,
            tiny_size: None,
            hide_system_bars: true,
        }
    }

    pub fn with_tiny_screen_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.tiny_size = size;
        self
    }

    pub fn with_system_bars_hidden(mut self, hide: bool) -> Self {
        self.hide_system_bars = hide;
        self
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    /// Control gestures are routed to components in every mode but tiny-screen.
    pub fn is_controller_bound(&self) -> bool {
        self.mode != ScreenMode::TinyScreen
    }

    pub fn surface(&self) -> Option<ViewId> {
        self.surface
    }

    /// Container the surface is currently attached to.
    pub fn surface_parent(&self) -> Option<ContainerId> {
        self.surface.and_then(|view| self.host.parent_of(view))
    }

    pub fn normal_container(&self) -> Option<ContainerId> {
        self.normal_container
    }

    /// Bounds of the tiny-screen window: the configured size, or half the
    /// screen width at 16:9, anchored bottom-right.
    pub fn tiny_bounds(&self) -> Rect {
        let (screen_width, screen_height) = self.host.screen_size();
        let (width, height) = self.tiny_size.unwrap_or_else(|| {
            let width = screen_width / 2;
            (width, width * 9 / 16)
        });
        Rect::new(
            screen_width as i32 - width as i32,
            screen_height as i32 - height as i32,
            width,
            height,
        )
    }

    /// Change the tiny-screen size. Applied immediately when in tiny-screen.
    pub fn set_tiny_screen_size(&mut self, size: Option<(u32, u32)>) -> Result<()> {
        let previous = std::mem::replace(&mut self.tiny_size, size);
        if self.mode != ScreenMode::TinyScreen {
            return Ok(());
        }

        let (Some(view), Some(container)) = (self.surface, self.host.floating_container()) else {
            return Ok(());
        };
        let layout = Layout::Fixed(self.tiny_bounds());
        if let Err(err) = self.reparent(view, container, layout) {
            self.tiny_size = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Set the container the surface lives in while in `Normal` mode.
    pub fn bind_container(&mut self, container: ContainerId) -> Result<()> {
        let previous = self.normal_container.replace(container);

        if self.mode == ScreenMode::Normal {
            if let Some(view) = self.surface {
                if let Err(err) = self.reparent(view, container, self.normal_layout) {
                    self.normal_container = previous;
                    return Err(err);
                }
            }
        }

        debug!(?container, "Normal container bound");
        Ok(())
    }

    /// Take ownership of a render surface view and place it in the container
    /// of the current mode. Replaces (and detaches) a previous surface.
    pub fn attach_surface(&mut self, view: ViewId) -> Result<()> {
        if let Some(old) = self.surface.filter(|old| *old != view) {
            self.host.detach(old)?;
            self.surface = None;
        }

        if let Some((container, layout)) = self.placement()? {
            if self.host.parent_of(view) != Some(container) {
                self.reparent(view, container, layout)?;
            }
        }

        self.surface = Some(view);
        Ok(())
    }

    /// Give up the surface view, detaching it from its container.
    pub fn detach_surface(&mut self) -> Result<Option<ViewId>> {
        let Some(view) = self.surface else {
            return Ok(None);
        };

        if self.mode == ScreenMode::Normal {
            self.remember_normal_layout(view);
        }
        self.host.detach(view)?;
        self.surface = None;
        Ok(Some(view))
    }

    /// Enter full-screen. Only legal from `Normal`.
    ///
    /// Returns `Ok(false)` without side effects if already full-screen or in
    /// tiny-screen.
    pub fn request_full_screen(&mut self, reversed: bool) -> Result<bool> {
        match self.mode {
            ScreenMode::Normal => {}
            ScreenMode::FullScreen => return Ok(false),
            other => {
                debug!(mode = ?other, "Full-screen is only reachable from normal mode");
                return Ok(false);
            }
        }

        let container = self.host.full_screen_container().ok_or_else(|| {
            PlaybackError::ContainerUnavailable("full-screen overlay".to_string())
        })?;

        if let Some(view) = self.surface {
            self.remember_normal_layout(view);
            self.reparent(view, container, Layout::MatchParent)?;
        }

        self.host.request_orientation(if reversed {
            Orientation::ReverseLandscape
        } else {
            Orientation::Landscape
        });
        if self.hide_system_bars {
            self.host.set_system_bars_visible(false);
        }

        self.mode = ScreenMode::FullScreen;
        Ok(true)
    }

    /// Enter tiny-screen (floating window). Legal from `Normal` and
    /// `FullScreen`.
    pub fn request_tiny_screen(&mut self) -> Result<bool> {
        let leaving = self.mode;
        match leaving {
            ScreenMode::Normal | ScreenMode::FullScreen => {}
            ScreenMode::TinyScreen => return Ok(false),
            ScreenMode::Unknown => {
                debug!("Tiny-screen requested before the display was initialised");
                return Ok(false);
            }
        }

        let container = self
            .host
            .floating_container()
            .ok_or_else(|| PlaybackError::ContainerUnavailable("floating window".to_string()))?;

        if let Some(view) = self.surface {
            if leaving == ScreenMode::Normal {
                self.remember_normal_layout(view);
            }
            let layout = Layout::Fixed(self.tiny_bounds());
            self.reparent(view, container, layout)?;
        }

        if leaving == ScreenMode::FullScreen {
            self.restore_window_chrome();
        }

        self.mode = ScreenMode::TinyScreen;
        Ok(true)
    }

    /// Return to the normal container. Idempotent.
    pub fn request_normal(&mut self) -> Result<bool> {
        let leaving = self.mode;
        if leaving == ScreenMode::Normal {
            return Ok(false);
        }

        if let Some(view) = self.surface {
            let container = self.normal_container.ok_or_else(|| {
                PlaybackError::ContainerUnavailable("normal container".to_string())
            })?;
            self.reparent(view, container, self.normal_layout)?;
        }

        if leaving == ScreenMode::FullScreen {
            self.restore_window_chrome();
        }

        self.mode = ScreenMode::Normal;
        Ok(true)
    }

    /// Full-screen to normal, anything else to full-screen.
    pub fn toggle_full_screen(&mut self, reversed: bool) -> Result<bool> {
        if self.mode == ScreenMode::FullScreen {
            self.request_normal()
        } else {
            self.request_full_screen(reversed)
        }
    }

    /// Back to `Normal` for teardown. Unlike [`request_normal`](Self::request_normal)
    /// this never fails: if the surface cannot be moved it is detached.
    pub fn reset(&mut self) -> bool {
        if self.mode == ScreenMode::Normal {
            return false;
        }

        if let Err(err) = self.request_normal() {
            warn!(error = %err, "Could not restore the normal container during reset");
            if let Some(view) = self.surface {
                if let Err(err) = self.host.detach(view) {
                    error!(error = %err, ?view, "Failed to detach surface during reset");
                }
            }
            if self.mode == ScreenMode::FullScreen {
                self.restore_window_chrome();
            }
            self.mode = ScreenMode::Normal;
        }
        true
    }

    fn placement(&self) -> Result<Option<(ContainerId, Layout)>> {
        match self.mode {
            ScreenMode::Normal | ScreenMode::Unknown => Ok(self
                .normal_container
                .map(|container| (container, self.normal_layout))),
            ScreenMode::FullScreen => self
                .host
                .full_screen_container()
                .map(|container| Some((container, Layout::MatchParent)))
                .ok_or_else(|| {
                    PlaybackError::ContainerUnavailable("full-screen overlay".to_string())
                }),
            ScreenMode::TinyScreen => self
                .host
                .floating_container()
                .map(|container| Some((container, Layout::Fixed(self.tiny_bounds()))))
                .ok_or_else(|| PlaybackError::ContainerUnavailable("floating window".to_string())),
        }
    }

    fn remember_normal_layout(&mut self, view: ViewId) {
        if self.normal_container.is_some() && self.host.parent_of(view) == self.normal_container {
            if let Some(layout) = self.host.layout_of(view) {
                self.normal_layout = layout;
            }
        }
    }

    fn restore_window_chrome(&mut self) {
        self.host.request_orientation(Orientation::Portrait);
        if self.hide_system_bars {
            self.host.set_system_bars_visible(true);
        }
    }

    /// Detach `view` from wherever it is, then attach it to `target`.
    fn reparent(&mut self, view: ViewId, target: ContainerId, layout: Layout) -> Result<()> {
        let previous = self
            .host
            .parent_of(view)
            .map(|parent| (parent, self.host.layout_of(view).unwrap_or_default()));

        if previous.is_some() {
            self.host.detach(view)?;
        }

        if let Some(parent) = self.host.parent_of(view) {
            error!(?view, ?parent, "Surface still parented after detach");
            return Err(PlaybackError::ReparentingConflict { view, parent });
        }

        if let Err(err) = self.host.attach(view, target, layout) {
            warn!(error = %err, ?view, ?target, "Attach failed, restoring previous parent");
            if let Some((parent, layout)) = previous {
                if let Err(rollback) = self.host.attach(view, parent, layout) {
                    error!(error = %rollback, ?view, ?parent, "Rollback attach failed");
                }
            }
            return Err(err.into());
        }

        debug!(?view, from = ?previous.map(|(parent, _)| parent), to = ?target, "Surface reparented");
        Ok(())
    }
}
