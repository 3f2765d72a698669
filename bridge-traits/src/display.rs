//! Host View Tree Abstractions
//!
//! The host owns a hierarchy of containers. The render surface's view lives in
//! exactly one of them at a time; changing the screen mode means moving it.
//! [`ViewHost`] is the minimal surface of that hierarchy the core needs.
//!
//! A view may have at most one parent. Hosts must refuse to attach a view that
//! is still attached somewhere else.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{BridgeError, Result};
use crate::platform::PlatformSend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Layout parameters a view is attached with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Layout {
    /// Fill the container.
    #[default]
    MatchParent,
    /// Explicit bounds inside the container.
    Fixed(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    ReverseLandscape,
}

/// Host container hierarchy.
pub trait ViewHost: PlatformSend {
    /// Container `view` is currently attached to.
    fn parent_of(&self, view: ViewId) -> Option<ContainerId>;

    /// Layout `view` is currently attached with.
    fn layout_of(&self, view: ViewId) -> Option<Layout>;

    /// Remove `view` from its parent. Detaching an unparented view is a no-op.
    fn detach(&mut self, view: ViewId) -> Result<()>;

    /// Add `view` to `container`. Fails if `view` already has a parent.
    fn attach(&mut self, view: ViewId, container: ContainerId, layout: Layout) -> Result<()>;

    /// Root overlay container covering the whole window, if the host has one.
    fn full_screen_container(&self) -> Option<ContainerId>;

    /// Container floating windows are placed in, if the host has one.
    fn floating_container(&self) -> Option<ContainerId>;

    /// Screen size in pixels as `(width, height)`.
    fn screen_size(&self) -> (u32, u32);

    fn set_system_bars_visible(&mut self, visible: bool);

    fn request_orientation(&mut self, orientation: Orientation);
}

/// Operations recorded by [`InMemoryViewHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    Detach {
        view: ViewId,
        from: ContainerId,
    },
    Attach {
        view: ViewId,
        to: ContainerId,
        layout: Layout,
    },
    SystemBars(bool),
    Orientation(Orientation),
}

#[derive(Debug)]
struct HostState {
    containers: HashSet<ContainerId>,
    parents: HashMap<ViewId, (ContainerId, Layout)>,
    full_screen: Option<ContainerId>,
    floating: Option<ContainerId>,
    screen: (u32, u32),
    system_bars_visible: bool,
    orientation: Orientation,
    log: Vec<HostOp>,
}

/// View tree kept in memory.
///
/// Clones share the same tree, so a test can hand one clone to the core and
/// inspect the other.
#[derive(Debug, Clone)]
pub struct InMemoryViewHost {
    state: Arc<Mutex<HostState>>,
}

impl InMemoryViewHost {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                containers: HashSet::new(),
                parents: HashMap::new(),
                full_screen: None,
                floating: None,
                screen: (screen_width, screen_height),
                system_bars_visible: true,
                orientation: Orientation::Portrait,
                log: Vec::new(),
            })),
        }
    }

    /// Register an ordinary container.
    pub fn with_container(self, container: ContainerId) -> Self {
        self.state.lock().containers.insert(container);
        self
    }

    pub fn with_full_screen_container(self, container: ContainerId) -> Self {
        {
            let mut state = self.state.lock();
            state.containers.insert(container);
            state.full_screen = Some(container);
        }
        self
    }

    pub fn with_floating_container(self, container: ContainerId) -> Self {
        {
            let mut state = self.state.lock();
            state.containers.insert(container);
            state.floating = Some(container);
        }
        self
    }

    /// Views currently attached to `container`.
    pub fn children_of(&self, container: ContainerId) -> Vec<ViewId> {
        let state = self.state.lock();
        let mut children: Vec<ViewId> = state
            .parents
            .iter()
            .filter(|(_, (parent, _))| *parent == container)
            .map(|(view, _)| *view)
            .collect();
        children.sort();
        children
    }

    pub fn system_bars_visible(&self) -> bool {
        self.state.lock().system_bars_visible
    }

    pub fn orientation(&self) -> Orientation {
        self.state.lock().orientation
    }

    /// Every mutating call made so far, oldest first.
    pub fn operations(&self) -> Vec<HostOp> {
        self.state.lock().log.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().log.clear();
    }
}

impl ViewHost for InMemoryViewHost {
    fn parent_of(&self, view: ViewId) -> Option<ContainerId> {
        self.state.lock().parents.get(&view).map(|(parent, _)| *parent)
    }

    fn layout_of(&self, view: ViewId) -> Option<Layout> {
        self.state.lock().parents.get(&view).map(|(_, layout)| *layout)
    }

    fn detach(&mut self, view: ViewId) -> Result<()> {
        let mut state = self.state.lock();
        if let Some((from, _)) = state.parents.remove(&view) {
            state.log.push(HostOp::Detach { view, from });
        }
        Ok(())
    }

    fn attach(&mut self, view: ViewId, container: ContainerId, layout: Layout) -> Result<()> {
        let mut state = self.state.lock();
        if !state.containers.contains(&container) {
            return Err(BridgeError::UnknownNode(format!("{:?}", container)));
        }
        if let Some((parent, _)) = state.parents.get(&view) {
            return Err(BridgeError::OperationFailed(format!(
                "{:?} is still attached to {:?}",
                view, parent
            )));
        }
        state.parents.insert(view, (container, layout));
        state.log.push(HostOp::Attach {
            view,
            to: container,
            layout,
        });
        Ok(())
    }

    fn full_screen_container(&self) -> Option<ContainerId> {
        self.state.lock().full_screen
    }

    fn floating_container(&self) -> Option<ContainerId> {
        self.state.lock().floating
    }

    fn screen_size(&self) -> (u32, u32) {
        self.state.lock().screen
    }

    fn set_system_bars_visible(&mut self, visible: bool) {
        let mut state = self.state.lock();
        state.system_bars_visible = visible;
        state.log.push(HostOp::SystemBars(visible));
    }

    fn request_orientation(&mut self, orientation: Orientation) {
        let mut state = self.state.lock();
        state.orientation = orientation;
        state.log.push(HostOp::Orientation(orientation));
    }
}
