//! The layout engine: owns the display group, the window tree and every policy, and
//! routes display, window and zoom events through them in order.

use std::rc::Rc;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use super::avoid_area::{AvoidAreaController, AvoidControlType, CutoutSource, OnDisplay, WindowFilter};
use super::client::{ChannelClient, ClientEvent};
use super::display_group::{DisplayGroupInfo, DisplayInfo, Rotation};
use super::error::LayoutError;
use super::layout_policy::WindowLayoutPolicy;
use super::zoom::DisplayZoomController;
use super::zorder::WindowZorderPolicy;
use crate::common::collections::BTreeMap;
use crate::common::config::Config;
use crate::model::{
    DisplayId, DragType, SizeChangeReason, WindowId, WindowMode, WindowNode, WindowTree, WindowType,
};
use crate::sys::geometry::Rect;

/// Requests that do not name a window.
#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    /// Zoom the default display by `scale` about `(x, y)`.
    Zoom { x: i32, y: i32, scale: f32 },
    ZoomPan { dx: i32, dy: i32 },
    ZoomOff,
    /// Cascade every main window into floating mode.
    Reorder,
    /// Divider rects to use for the next divider added on each display.
    RestoreDividers(BTreeMap<DisplayId, Rect>),
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum LayoutEvent {
    DisplayAdded(DisplayInfo),
    DisplayRemoved(DisplayId),
    DisplayChanged {
        display: DisplayId,
        rect: Rect,
        rotation: Rotation,
        virtual_pixel_ratio: f32,
    },
    WindowAdded(Box<WindowNode>),
    WindowRequested {
        id: WindowId,
        rect: Rect,
        reason: SizeChangeReason,
    },
    WindowModeChanged {
        id: WindowId,
        mode: WindowMode,
    },
    WindowVisibilityChanged {
        id: WindowId,
        visible: bool,
    },
    WindowRemoved(WindowId),
    DragStarted {
        id: WindowId,
        drag_type: DragType,
    },
    Dragged {
        id: WindowId,
        rect: Rect,
    },
    DragEnded {
        id: WindowId,
        rect: Rect,
    },
    WindowFocused(Option<WindowId>),
    AvoidAreaListener {
        id: WindowId,
        register: bool,
    },
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub added_window: Option<WindowId>,
    pub removed_windows: Vec<WindowId>,
    /// Windows the caller should minimize.
    pub minimize_windows: Vec<WindowId>,
}

pub struct WindowLayoutEngine {
    config: Config,
    displays: DisplayGroupInfo,
    tree: WindowTree,
    zorder: WindowZorderPolicy,
    policy: WindowLayoutPolicy,
    avoid: AvoidAreaController,
    zoom: DisplayZoomController,
    notifier: Option<Sender<(WindowId, ClientEvent)>>,
}

impl WindowLayoutEngine {
    pub fn new(config: Config, default_display: DisplayId) -> Self {
        WindowLayoutEngine {
            displays: DisplayGroupInfo::new(default_display),
            tree: WindowTree::new(),
            zorder: WindowZorderPolicy::new(),
            policy: WindowLayoutPolicy::new(&config),
            avoid: AvoidAreaController::default(),
            zoom: DisplayZoomController::new(config.zoom),
            notifier: None,
            config,
        }
    }

    pub fn with_cutouts(mut self, cutouts: Box<dyn CutoutSource>) -> Self {
        self.avoid = AvoidAreaController::new(cutouts);
        self
    }

    /// Windows added without a client get one that forwards to `tx`.
    pub fn connect(&mut self, tx: Sender<(WindowId, ClientEvent)>) { self.notifier = Some(tx); }

    pub fn config(&self) -> &Config { &self.config }

    pub fn displays(&self) -> &DisplayGroupInfo { &self.displays }

    pub fn tree(&self) -> &WindowTree { &self.tree }

    pub fn policy(&self) -> &WindowLayoutPolicy { &self.policy }

    pub fn avoid_areas(&self) -> &AvoidAreaController { &self.avoid }

    pub fn zoom(&self) -> &DisplayZoomController { &self.zoom }

    pub fn window(&self, id: WindowId) -> Option<&WindowNode> { self.tree.get(id) }

    pub fn debug_tree(&self, display_id: DisplayId) {
        debug!("Tree {display_id}\n{}", self.tree.draw_tree(display_id).trim());
    }

    pub fn handle_event(&mut self, event: LayoutEvent) -> Result<EventResponse, LayoutError> {
        debug!(?event);
        let mut response = EventResponse::default();
        match event {
            LayoutEvent::DisplayAdded(info) => {
                let display_id = info.id;
                self.displays.add_display_info(info)?;
                let rects = self.displays.all_display_rects();
                self.reconfigure(|policy, displays, tree| {
                    policy.process_display_create(displays, tree, display_id, &rects)
                })?;
            }
            LayoutEvent::DisplayRemoved(display_id) => {
                if !self.displays.contains(display_id) {
                    warn!(%display_id, "removal of unknown display");
                    return Err(LayoutError::UnknownDisplay(display_id));
                }
                let removed = self.tree.remove_display(display_id);
                for id in &removed {
                    self.avoid.forget_window(*id);
                }
                self.displays.remove_display_info(display_id);
                let rects = self.displays.all_display_rects();
                self.reconfigure(|policy, displays, tree| {
                    policy.process_display_destroy(displays, tree, display_id, &rects)
                })?;
                response.removed_windows = removed;
            }
            LayoutEvent::DisplayChanged { display: display_id, rect, rotation, virtual_pixel_ratio } => {
                let rotated = self.displays.display_rotation(display_id) != rotation;
                self.displays.set_display_rotation(display_id, rotation)?;
                self.displays.set_display_virtual_pixel_ratio(display_id, virtual_pixel_ratio)?;
                if rotated {
                    self.mark_rotation(display_id);
                }
                let mut rects = self.displays.all_display_rects();
                rects.insert(display_id, rect);
                self.reconfigure(|policy, displays, tree| {
                    policy.process_display_size_change_or_rotation(displays, tree, display_id, &rects)
                })?;
            }
            LayoutEvent::WindowAdded(node) => {
                response.added_window = Some(self.add_window(*node)?);
            }
            LayoutEvent::WindowRequested { id, rect, reason } => {
                let node = self.node_mut(id)?;
                node.request_rect = rect;
                node.reason = reason;
                self.update_window(id);
            }
            LayoutEvent::WindowModeChanged { id, mode } => {
                let node = self.node_mut(id)?;
                node.mode = mode;
                if let Some(client) = &node.client {
                    client.update_window_mode(mode);
                }
                self.update_window(id);
            }
            LayoutEvent::WindowVisibilityChanged { id, visible } => {
                let node = self.node_mut(id)?;
                node.visible = visible;
                if visible {
                    self.update_window(id);
                } else {
                    self.zoom.clear_zoom_transform(&mut self.tree, &[id]);
                }
            }
            LayoutEvent::WindowRemoved(id) => {
                response.removed_windows = self.remove_window(id)?;
            }
            LayoutEvent::DragStarted { id, drag_type } => {
                let node = self.node_mut(id)?;
                node.origin_rect = node.window_rect;
                node.drag_type = drag_type;
                node.reason = SizeChangeReason::DragStart;
            }
            LayoutEvent::Dragged { id, rect } => {
                let node = self.node_mut(id)?;
                node.request_rect = rect;
                node.reason = SizeChangeReason::Drag;
                self.update_window(id);
            }
            LayoutEvent::DragEnded { id, rect } => {
                let node = self.node_mut(id)?;
                node.request_rect = rect;
                node.reason = SizeChangeReason::DragEnd;
                self.update_window(id);
                if let Some(node) = self.tree.get_mut(id) {
                    node.drag_type = DragType::Undefined;
                }
            }
            LayoutEvent::WindowFocused(focused) => {
                self.tree.set_focused(focused);
                self.avoid.set_focused_window(focused);
                let display = focused.and_then(|id| self.tree.get(id)).map(|n| n.display_id);
                if let Some(display) = display {
                    self.refresh_avoid_areas(display);
                }
            }
            LayoutEvent::AvoidAreaListener { id, register } => {
                if !self.tree.contains(id) {
                    return Err(LayoutError::UnknownWindow(id));
                }
                self.avoid.update_avoid_area_listener(id, register);
                if register {
                    self.process_avoid(id, AvoidControlType::Update, None);
                }
            }
        }
        Ok(response)
    }

    pub fn handle_command(&mut self, command: LayoutCommand) -> EventResponse {
        debug!(?command);
        let mut response = EventResponse::default();
        match command {
            LayoutCommand::Zoom { x, y, scale } => {
                self.zoom.set_anchor_and_scale(&self.displays, &mut self.tree, x, y, scale);
            }
            LayoutCommand::ZoomPan { dx, dy } => {
                self.zoom.set_anchor_offset(&self.displays, &mut self.tree, dx, dy);
            }
            LayoutCommand::ZoomOff => self.zoom.off_window_zoom(&self.displays, &mut self.tree),
            LayoutCommand::Reorder => {
                response.minimize_windows = self.policy.reorder(&self.displays, &mut self.tree);
                for display in self.displays.display_ids().collect::<Vec<_>>() {
                    self.after_layout(display);
                }
            }
            LayoutCommand::RestoreDividers(rects) => self.policy.set_split_divider_window_rects(rects),
        }
        response
    }

    #[instrument(skip_all, fields(name = %node.name))]
    fn add_window(&mut self, mut node: WindowNode) -> Result<WindowId, LayoutError> {
        let display_id = node.display_id;
        if !self.displays.contains(display_id) {
            warn!(%display_id, "window added to unknown display");
            return Err(LayoutError::UnknownDisplay(display_id));
        }
        node.priority = self.zorder.window_priority(node.ty);
        node.decor_enable &= self.config.layout.decor_enable;
        let ty = node.ty;
        let id = self.tree.insert(node);
        if let Some(tx) = &self.notifier
            && let Some(node) = self.tree.get_mut(id)
            && node.client.is_none()
        {
            node.client = Some(Rc::new(ChannelClient::new(id, tx.clone())));
        }

        self.policy.add_window_node(&self.displays, &mut self.tree, id);
        if ty.is_overlay_window() {
            self.process_avoid(id, AvoidControlType::Add, None);
        }
        self.after_layout(display_id);
        Ok(id)
    }

    fn remove_window(&mut self, id: WindowId) -> Result<Vec<WindowId>, LayoutError> {
        if !self.tree.contains(id) {
            return Err(LayoutError::UnknownWindow(id));
        }
        if self.avoid.is_overlay(id) {
            self.process_avoid(id, AvoidControlType::Remove, None);
        }
        let removed = self.tree.subtree(id);
        let node = self.tree.remove(id).ok_or(LayoutError::UnknownWindow(id))?;
        for w in &removed {
            self.avoid.forget_window(*w);
        }
        self.policy.remove_window_node(&self.displays, &mut self.tree, &node);
        self.after_layout(node.display_id);
        Ok(removed)
    }

    fn update_window(&mut self, id: WindowId) {
        let Some(display) = self.tree.get(id).map(|n| n.display_id) else { return };
        self.policy.update_window_node(&self.displays, &mut self.tree, id, false);
        self.after_layout(display);
    }

    fn node_mut(&mut self, id: WindowId) -> Result<&mut WindowNode, LayoutError> {
        self.tree.get_mut(id).ok_or_else(|| {
            warn!(?id, "unknown window");
            LayoutError::UnknownWindow(id)
        })
    }

    /// Every window but the divider animates a rotation.
    fn mark_rotation(&mut self, display: DisplayId) {
        for id in self.tree.traverse_container(display) {
            if let Some(node) = self.tree.get_mut(id)
                && node.ty != WindowType::DockSlice
            {
                node.reason = SizeChangeReason::Rotation;
            }
        }
    }

    /// Runs a display reconfiguration with avoid area processing held off, then
    /// refreshes every display.
    fn reconfigure(
        &mut self,
        change: impl FnOnce(
            &mut WindowLayoutPolicy,
            &mut DisplayGroupInfo,
            &mut WindowTree,
        ) -> Result<(), LayoutError>,
    ) -> Result<(), LayoutError> {
        self.avoid.set_forbid_processing(true);
        let result = change(&mut self.policy, &mut self.displays, &mut self.tree);
        self.avoid.set_forbid_processing(false);
        result?;
        for display in self.displays.display_ids().collect::<Vec<_>>() {
            self.after_layout(display);
            self.debug_tree(display);
        }
        Ok(())
    }

    fn after_layout(&mut self, display: DisplayId) {
        self.zoom.update_all_windows_zoom_info(&self.displays, &mut self.tree, display);
        self.refresh_avoid_areas(display);
    }

    /// Pushes the overlays of `display` to the listeners on it, then lets every
    /// listener there pick up what changed about itself.
    fn refresh_avoid_areas(&mut self, display: DisplayId) {
        let filter = OnDisplay(display);
        for id in self.tree.traverse_container(display) {
            if self.avoid.is_overlay(id) {
                self.process_avoid(id, AvoidControlType::Update, Some(&filter));
            } else if self.avoid.is_listening(id) {
                self.process_avoid(id, AvoidControlType::Update, None);
            }
        }
    }

    fn process_avoid(&mut self, id: WindowId, change: AvoidControlType, filter: Option<&dyn WindowFilter>) {
        if let Err(err) = self.avoid.process_window_change(&self.tree, id, change, filter) {
            trace!(?id, ?change, %err, "avoid area change not processed");
        }
    }
}
