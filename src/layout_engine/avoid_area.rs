//! Tracks overlay windows and pushes the parts of them that cover each listening
//! window as avoid areas.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use tracing::{debug, error, info, instrument, trace};

use super::error::LayoutError;
use crate::common::collections::{BTreeSet, HashMap};
use crate::model::{DisplayId, WindowId, WindowNode, WindowTree, WindowType};
use crate::sys::geometry::{AvoidPosType, Rect};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AvoidArea {
    pub top: Rect,
    pub left: Rect,
    pub right: Rect,
    pub bottom: Rect,
}

impl AvoidArea {
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.left.is_empty() && self.right.is_empty() && self.bottom.is_empty()
    }

    pub fn set(&mut self, pos: AvoidPosType, rect: Rect) {
        match pos {
            AvoidPosType::Top => self.top = rect,
            AvoidPosType::Left => self.left = rect,
            AvoidPosType::Right => self.right = rect,
            AvoidPosType::Bottom => self.bottom = rect,
            AvoidPosType::Unknown => trace!("dropping overlay rect with unknown position"),
        }
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum AvoidAreaType {
    System,
    Cutout,
    SystemGesture,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidControlType {
    Add,
    Remove,
    Update,
}

/// Selects which listeners an overlay update is pushed to.
pub trait WindowFilter {
    fn accept(&self, id: WindowId, node: &WindowNode) -> bool;
}

impl<F: Fn(WindowId, &WindowNode) -> bool> WindowFilter for F {
    fn accept(&self, id: WindowId, node: &WindowNode) -> bool { self(id, node) }
}

/// Accepts windows that live on the given display.
#[derive(Debug, Clone, Copy)]
pub struct OnDisplay(pub DisplayId);

impl WindowFilter for OnDisplay {
    fn accept(&self, _id: WindowId, node: &WindowNode) -> bool { node.display_id == self.0 }
}

/// Bounding rects of display cutouts (notches, camera holes).
pub trait CutoutSource {
    fn cutout_rects(&self, display: DisplayId) -> Vec<Rect>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCutout;

impl CutoutSource for NoCutout {
    fn cutout_rects(&self, _display: DisplayId) -> Vec<Rect> { Vec::new() }
}

impl CutoutSource for HashMap<DisplayId, Vec<Rect>> {
    fn cutout_rects(&self, display: DisplayId) -> Vec<Rect> {
        self.get(&display).cloned().unwrap_or_default()
    }
}

pub struct AvoidAreaController {
    focused_window: Option<WindowId>,
    overlay_windows: BTreeSet<WindowId>,
    listeners: BTreeSet<WindowId>,
    last_updated: HashMap<WindowId, HashMap<AvoidAreaType, AvoidArea>>,
    last_keyboard_window: Option<WindowId>,
    forbid_processing: bool,
    cutout: Box<dyn CutoutSource>,
}

impl std::fmt::Debug for AvoidAreaController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvoidAreaController")
            .field("focused_window", &self.focused_window)
            .field("overlay_windows", &self.overlay_windows)
            .field("listeners", &self.listeners)
            .field("last_keyboard_window", &self.last_keyboard_window)
            .field("forbid_processing", &self.forbid_processing)
            .finish_non_exhaustive()
    }
}

impl Default for AvoidAreaController {
    fn default() -> Self { Self::new(Box::new(NoCutout)) }
}

impl AvoidAreaController {
    pub fn new(cutout: Box<dyn CutoutSource>) -> Self {
        AvoidAreaController {
            focused_window: None,
            overlay_windows: BTreeSet::new(),
            listeners: BTreeSet::new(),
            last_updated: HashMap::default(),
            last_keyboard_window: None,
            forbid_processing: false,
            cutout,
        }
    }

    pub fn set_focused_window(&mut self, id: Option<WindowId>) { self.focused_window = id; }

    /// While set, every window change is ignored. Used around display reconfiguration.
    pub fn set_forbid_processing(&mut self, forbid: bool) { self.forbid_processing = forbid; }

    pub fn is_listening(&self, id: WindowId) -> bool { self.listeners.contains(&id) }

    pub fn is_overlay(&self, id: WindowId) -> bool { self.overlay_windows.contains(&id) }

    /// The window that currently holds the keyboard avoid area, if any.
    pub fn last_keyboard_window(&self) -> Option<WindowId> { self.last_keyboard_window }

    pub fn update_avoid_area_listener(&mut self, id: WindowId, register: bool) {
        debug!(?id, register, "avoid area listener");
        if register {
            self.listeners.insert(id);
        } else {
            self.last_updated.remove(&id);
            self.listeners.remove(&id);
            if self.last_keyboard_window == Some(id) {
                self.last_keyboard_window = None;
            }
        }
    }

    /// Forgets a window entirely, as when it leaves the tree.
    pub fn forget_window(&mut self, id: WindowId) {
        self.update_avoid_area_listener(id, false);
        self.overlay_windows.remove(&id);
        if self.focused_window == Some(id) {
            self.focused_window = None;
        }
    }

    #[instrument(skip(self, tree, filter))]
    pub fn process_window_change(
        &mut self,
        tree: &WindowTree,
        id: WindowId,
        change: AvoidControlType,
        filter: Option<&dyn WindowFilter>,
    ) -> Result<(), LayoutError> {
        if self.forbid_processing {
            info!("window change processing is forbidden");
            return Err(LayoutError::ForbiddenWindowChange);
        }
        let node = tree.get(id).filter(|n| n.client.is_some()).ok_or_else(|| {
            error!(?id, "invalid window node");
            LayoutError::UnknownWindow(id)
        })?;
        match change {
            AvoidControlType::Add | AvoidControlType::Remove => {
                self.add_or_remove_overlay(tree, id, node, change == AvoidControlType::Add)
            }
            AvoidControlType::Update => self.update_overlay_if_needed(tree, id, node, filter),
        }
    }

    fn add_or_remove_overlay(
        &mut self,
        tree: &WindowTree,
        id: WindowId,
        node: &WindowNode,
        adding: bool,
    ) -> Result<(), LayoutError> {
        if !node.ty.is_overlay_window() {
            return Err(LayoutError::NotOverlay(id));
        }
        let recorded = self.overlay_windows.contains(&id);
        if adding == recorded {
            error!(?id, adding, recorded, "overlay bookkeeping mismatch");
            return Err(LayoutError::OverlayStateMismatch { window: id, adding, recorded });
        }
        if adding {
            self.overlay_windows.insert(id);
        } else {
            self.overlay_windows.remove(&id);
        }

        if node.ty == WindowType::InputMethodFloat {
            self.add_or_remove_keyboard(tree, node);
            return Ok(());
        }

        let listeners: Vec<_> = self.listeners.iter().copied().collect();
        for listener in listeners {
            let area = self.avoid_area_by_type(tree, listener, AvoidAreaType::System);
            self.update_avoid_area_if_needed(tree, area, listener, AvoidAreaType::System);
        }
        Ok(())
    }

    fn add_or_remove_keyboard(&mut self, tree: &WindowTree, keyboard: &WindowNode) {
        let mut calling = None;
        let mut focused = None;
        let mut last_updated = None;
        for &w in &self.listeners {
            if tree.get(w).is_none_or(|n| n.client.is_none()) {
                continue;
            }
            if Some(w) == keyboard.calling_window {
                calling = Some(w);
            }
            if Some(w) == self.focused_window {
                focused = Some(w);
            }
            if Some(w) == self.last_keyboard_window {
                last_updated = Some(w);
            }
        }
        let calling = calling.or(focused);

        if let Some(last) = last_updated
            && Some(last) != calling
            && tree.get(last).is_some_and(|n| n.mode.receives_avoid_area())
        {
            let area = self.avoid_area_by_type(tree, last, AvoidAreaType::Keyboard);
            self.update_avoid_area_if_needed(tree, area, last, AvoidAreaType::Keyboard);
        }

        let Some(calling) = calling else {
            error!(calling = ?keyboard.calling_window, focused = ?self.focused_window, "no window to bind the keyboard to");
            return;
        };
        if tree.get(calling).is_some_and(|n| n.mode.receives_avoid_area()) {
            let area = self.avoid_area_by_type(tree, calling, AvoidAreaType::Keyboard);
            if self.update_avoid_area_if_needed(tree, area, calling, AvoidAreaType::Keyboard) {
                self.last_keyboard_window = Some(calling);
            }
            return;
        }
        error!(?calling, "calling window mode does not take the keyboard avoid area");
    }

    fn update_overlay_if_needed(
        &mut self,
        tree: &WindowTree,
        id: WindowId,
        node: &WindowNode,
        filter: Option<&dyn WindowFilter>,
    ) -> Result<(), LayoutError> {
        if node.ty.is_overlay_window() {
            let ty = if node.ty.is_system_bar_window() {
                AvoidAreaType::System
            } else {
                AvoidAreaType::Keyboard
            };
            let Some(filter) = filter else { return Ok(()) };
            let listeners: Vec<_> = self
                .listeners
                .iter()
                .copied()
                .filter(|w| tree.get(*w).is_some_and(|n| filter.accept(*w, n)))
                .collect();
            for listener in listeners {
                let area = self.avoid_area_by_type(tree, listener, ty);
                let pushed = self.update_avoid_area_if_needed(tree, area, listener, ty);
                if ty == AvoidAreaType::Keyboard && pushed && !area.is_empty() {
                    self.last_keyboard_window = Some(listener);
                }
            }
            return Ok(());
        }

        if !self.listeners.contains(&id) {
            debug!(?id, "window does not listen for avoid areas");
            return Err(LayoutError::NotListening(id));
        }
        for ty in AvoidAreaType::iter() {
            let area = self.avoid_area_by_type(tree, id, ty);
            let pushed = self.update_avoid_area_if_needed(tree, area, id, ty);
            if pushed && ty == AvoidAreaType::Keyboard && !area.is_empty() {
                self.last_keyboard_window = Some(id);
            }
        }
        Ok(())
    }

    /// Pushes `area` unless it equals the last push for this window and type. An empty
    /// area is never the first push.
    fn update_avoid_area_if_needed(
        &mut self,
        tree: &WindowTree,
        area: AvoidArea,
        id: WindowId,
        ty: AvoidAreaType,
    ) -> bool {
        let need_update = match self.last_updated.get(&id).and_then(|m| m.get(&ty)) {
            Some(last) => *last != area,
            None => !area.is_empty(),
        };
        if need_update {
            self.last_updated.entry(id).or_default().insert(ty, area);
            if let Some(client) = tree.get(id).and_then(|n| n.client.as_ref()) {
                client.update_avoid_area(&area, ty);
            }
            debug!(?id, ?ty, ?area, "pushed avoid area");
        }
        need_update
    }

    /// The part of `overlay` covering `id`, relative to the window origin, and its edge.
    fn calculate_overlay_rect(&self, node_id: WindowId, node: &WindowNode, overlay_id: WindowId, overlay: &WindowNode) -> (AvoidPosType, Rect) {
        if node_id == overlay_id {
            error!(?node_id, "a window cannot overlay itself");
            return (AvoidPosType::Unknown, Rect::EMPTY);
        }
        let rect = node.window_rect;
        let overlay_rect = overlay.window_rect.overlap(&rect, rect.x, rect.y);
        (AvoidPosType::of_overlay(&rect, &overlay_rect), overlay_rect)
    }

    pub fn avoid_area_by_type(&self, tree: &WindowTree, id: WindowId, ty: AvoidAreaType) -> AvoidArea {
        let Some(node) = tree.get(id) else {
            error!(?id, "invalid window node");
            return AvoidArea::default();
        };
        if ty != AvoidAreaType::Keyboard && !node.mode.receives_avoid_area() {
            trace!(?ty, mode = ?node.mode, "mode takes no avoid area");
            return AvoidArea::default();
        }
        match ty {
            AvoidAreaType::System => self.system_avoid_area(tree, id, node),
            AvoidAreaType::Keyboard => self.keyboard_avoid_area(tree, id, node),
            AvoidAreaType::Cutout => {
                let cutouts = self.cutout.cutout_rects(node.display_id);
                let Some(cutout) = cutouts.first() else {
                    trace!("no cutout");
                    return AvoidArea::default();
                };
                let rect = node.window_rect;
                let overlay = cutout.overlap(&rect, rect.x, rect.y);
                let mut area = AvoidArea::default();
                area.set(AvoidPosType::of_overlay(&rect, &overlay), overlay);
                area
            }
            AvoidAreaType::SystemGesture => AvoidArea::default(),
        }
    }

    fn system_avoid_area(&self, tree: &WindowTree, id: WindowId, node: &WindowNode) -> AvoidArea {
        let mut status_bar = (AvoidPosType::Unknown, Rect::EMPTY);
        let mut navigation_bar = (AvoidPosType::Unknown, Rect::EMPTY);
        for &overlay_id in &self.overlay_windows {
            let Some(overlay) = tree.get(overlay_id) else { continue };
            match overlay.ty {
                WindowType::StatusBar => {
                    status_bar = self.calculate_overlay_rect(id, node, overlay_id, overlay)
                }
                WindowType::NavigationBar => {
                    navigation_bar = self.calculate_overlay_rect(id, node, overlay_id, overlay)
                }
                _ => {}
            }
        }
        let mut area = AvoidArea::default();
        area.set(status_bar.0, status_bar.1);
        area.set(navigation_bar.0, navigation_bar.1);
        area
    }

    /// The calling window when it listens, otherwise the focused window. Only the owner
    /// gets a keyboard area so it never lands on two windows at once.
    fn keyboard_owner(&self, keyboard: &WindowNode) -> Option<WindowId> {
        keyboard
            .calling_window
            .filter(|w| self.listeners.contains(w))
            .or(self.focused_window)
    }

    fn keyboard_avoid_area(&self, tree: &WindowTree, id: WindowId, node: &WindowNode) -> AvoidArea {
        for &overlay_id in &self.overlay_windows {
            let Some(overlay) = tree.get(overlay_id) else { continue };
            if overlay.ty != WindowType::InputMethodFloat {
                continue;
            }
            if self.keyboard_owner(overlay) != Some(id) {
                trace!(?id, "not the keyboard owner");
                continue;
            }
            let (pos, rect) = self.calculate_overlay_rect(id, node, overlay_id, overlay);
            let mut area = AvoidArea::default();
            area.set(pos, rect);
            return area;
        }
        AvoidArea::default()
    }
}
