//! Cascade layout of the window tree.
//!
//! Per display the policy keeps a limit rect (the display minus the system bars), the
//! split screen rects and the first cascade rect. A layout pass walks the above layer
//! first so the bars carve the limit rect before app and below windows are placed.

use glam::Vec2;
use tracing::{debug, error, instrument, trace, warn};

use super::display_group::DisplayGroupInfo;
use super::error::LayoutError;
use super::floating::{
    DockWindowShowState, FloatingBounds, MIN_FLOATING_HEIGHT, MIN_FLOATING_WIDTH,
    WINDOW_FRAME_WIDTH, WINDOW_TITLE_BAR_HEIGHT, fix_window_size_by_ratio_if_drag_beyond_limit_region,
    limit_floating_window_size, limit_window_position_when_drag,
    limit_window_position_when_init_or_move, merge_size_limits, system_size_limits,
    update_floating_layout_rect,
};
use super::hot_zone::{calculate_touch_hot_areas, entire_window_hot_zone};
use super::split::{LayoutRects, is_vertical_display, limit_divider_move_bounds};
use crate::common::collections::BTreeMap;
use crate::common::config::{Config, HotZoneSettings, SplitSettings};
use crate::model::{
    DisplayId, RootLayer, SizeChangeReason, WindowFlags, WindowId, WindowMode, WindowNode,
    WindowTree, WindowType,
};
use crate::sys::geometry::{AvoidPosType, Rect, scaled, span};
use crate::sys::transform::hot_zone_scale;

const CASCADE_RATIO: f32 = 0.67;

#[derive(Debug, Clone)]
pub struct WindowLayoutPolicy {
    split_settings: SplitSettings,
    hot_zone: HotZoneSettings,
    floating_bottom_pos_y: u32,
    limit_rects: BTreeMap<DisplayId, Rect>,
    layout_rects: BTreeMap<DisplayId, LayoutRects>,
    restoring_divider_rects: BTreeMap<DisplayId, Rect>,
    display_group_rect: Rect,
    display_group_limit_rect: Rect,
    multi_display: bool,
    first_app_window: bool,
}

impl WindowLayoutPolicy {
    pub fn new(config: &Config) -> Self {
        WindowLayoutPolicy {
            split_settings: config.split.clone(),
            hot_zone: config.hot_zone,
            floating_bottom_pos_y: config.layout.floating_bottom_pos_y,
            limit_rects: BTreeMap::new(),
            layout_rects: BTreeMap::new(),
            restoring_divider_rects: BTreeMap::new(),
            display_group_rect: Rect::EMPTY,
            display_group_limit_rect: Rect::EMPTY,
            multi_display: false,
            first_app_window: true,
        }
    }

    /// The display rect minus the system bars, or the empty rect for unknown displays.
    pub fn limit_rect(&self, display: DisplayId) -> Rect {
        self.limit_rects.get(&display).copied().unwrap_or_default()
    }

    pub fn layout_rects(&self, display: DisplayId) -> Option<&LayoutRects> {
        self.layout_rects.get(&display)
    }

    pub fn display_group_rect(&self) -> Rect { self.display_group_rect }

    pub fn display_group_limit_rect(&self) -> Rect { self.display_group_limit_rect }

    pub fn is_multi_display(&self) -> bool { self.multi_display }

    /// Divider rects to restore when a divider window is next added on each display.
    pub fn set_split_divider_window_rects(&mut self, rects: BTreeMap<DisplayId, Rect>) {
        self.restoring_divider_rects = rects;
    }

    /// Lays out every display from scratch.
    #[instrument(skip(self, displays, tree))]
    pub fn launch(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree) {
        self.init_all_rects(displays, tree);
        for display in displays.display_ids() {
            self.layout_layer(displays, tree, display, RootLayer::App);
            self.layout_layer(displays, tree, display, RootLayer::Below);
        }
    }

    pub fn reset(&mut self, displays: &DisplayGroupInfo) {
        for display in displays.display_ids() {
            let rect = displays.display_rect(display);
            let vpr = displays.virtual_pixel_ratio(display);
            self.layout_rects.entry(display).or_default().init_split_rects(&rect, vpr);
            self.init_limit_rects(displays, display);
        }
        self.display_group_limit_rect = self.display_group_rect;
    }

    /// Drops the state of displays that are no longer registered.
    pub fn clean(&mut self, displays: &DisplayGroupInfo) {
        self.limit_rects.retain(|d, _| displays.contains(*d));
        self.layout_rects.retain(|d, _| displays.contains(*d));
        self.restoring_divider_rects.retain(|d, _| displays.contains(*d));
    }

    fn init_all_rects(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree) {
        for display in displays.display_ids() {
            let rect = displays.display_rect(display);
            let vpr = displays.virtual_pixel_ratio(display);
            self.layout_rects.entry(display).or_default().init_split_rects(&rect, vpr);
            self.init_limit_rects(displays, display);
            self.display_group_limit_rect = self.display_group_rect;
            self.layout_layer(displays, tree, display, RootLayer::Above);
            self.init_cascade_rect(displays, display);
        }
    }

    fn init_limit_rects(&mut self, displays: &DisplayGroupInfo, display: DisplayId) {
        let rect = displays.display_rect(display);
        self.limit_rects.insert(display, rect);
        let rects = self.layout_rects.entry(display).or_default();
        rects.reset_split_limit_rects();
        rects.update_split_ratio_points(&self.split_settings, &rect);
    }

    fn layout_layer(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        display: DisplayId,
        layer: RootLayer,
    ) {
        let roots = tree.layer(display, layer).to_vec();
        for id in roots {
            self.layout_window_node(displays, tree, id);
        }
    }

    /// Recomputes every window rect of one display.
    #[instrument(skip(self, displays, tree))]
    pub fn layout_window_tree(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        display_id: DisplayId,
    ) {
        self.init_limit_rects(displays, display_id);
        self.layout_layer(displays, tree, display_id, RootLayer::Above);

        let recent_on_top = tree.layer(display_id, RootLayer::Above).iter().any(|w| {
            tree.get(*w).is_some_and(|n| {
                n.ty == WindowType::LauncherRecent && n.mode == WindowMode::Fullscreen
            })
        });
        if recent_on_top {
            debug!(%display_id, "fullscreen recent window covers the display");
            return;
        }
        self.layout_layer(displays, tree, display_id, RootLayer::App);
        self.layout_layer(displays, tree, display_id, RootLayer::Below);
    }

    /// Lays out a window and its children. Bars also shrink the display limit rect.
    pub fn layout_window_node(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        id: WindowId,
    ) {
        let Some(node) = tree.get(id) else { return };
        if !node.visible {
            trace!(?id, "skip invisible window");
            return;
        }
        self.update_layout_rect(displays, tree, id);

        let Some(node) = tree.get(id) else { return };
        if node.ty.is_avoid_producer() {
            let display = node.display_id;
            let bar = node.window_rect;
            self.update_limit_rect(displays, display, &bar);
        }
        let children = tree.get(id).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.layout_window_node(displays, tree, child);
        }
    }

    fn update_limit_rect(&mut self, displays: &DisplayGroupInfo, display_id: DisplayId, bar: &Rect) {
        let display_rect = displays.display_rect(display_id);
        let limit = self.limit_rects.entry(display_id).or_insert(display_rect);
        let mut width = limit.width as i64;
        let mut height = limit.height as i64;
        match AvoidPosType::of_bar(bar, &display_rect) {
            AvoidPosType::Top => {
                let offset = (bar.bottom() - limit.y).max(0);
                limit.y += offset;
                height -= offset as i64;
            }
            AvoidPosType::Bottom => height -= (limit.bottom() - bar.y).max(0) as i64,
            AvoidPosType::Left => {
                let offset = (bar.right() - limit.x).max(0);
                limit.x += offset;
                width -= offset as i64;
            }
            AvoidPosType::Right => width -= (limit.right() - bar.x).max(0) as i64,
            AvoidPosType::Unknown => trace!(%bar, "bar does not hug a display edge"),
        }
        limit.width = width.max(0) as u32;
        limit.height = height.max(0) as u32;
        let limit = *limit;
        debug!(%display_id, %limit, "limit rect");

        let rects = self.layout_rects.entry(display_id).or_default();
        rects.update_split_limit_rects(&limit);
        rects.update_split_ratio_points(&self.split_settings, &display_rect);
        self.update_display_group_limit_rect();
    }

    fn update_display_group_limit_rect(&mut self) {
        self.display_group_limit_rect =
            self.limit_rects.values().copied().reduce(|a, b| a.union(&b)).unwrap_or_default();
        trace!(rect = %self.display_group_limit_rect, "display group limit rect");
    }

    fn update_display_group_rect(&mut self, displays: &DisplayGroupInfo) {
        let rects = displays.all_display_rects();
        let (Some(x), Some(y), Some(bottom)) = (
            rects.values().map(|r| r.x).min(),
            rects.values().map(|r| r.y).min(),
            rects.values().map(Rect::bottom).max(),
        ) else {
            self.display_group_rect = Rect::EMPTY;
            return;
        };
        let width = rects.values().map(|r| r.width).sum();
        self.display_group_rect = Rect::new(x, y, width, span(y, bottom));
        debug!(rect = %self.display_group_rect, "display group rect");
    }

    fn dock_window_rect(&self, tree: &WindowTree, display: DisplayId) -> Option<Rect> {
        tree.layer(display, RootLayer::Above).iter().find_map(|w| {
            tree.get(*w).filter(|n| n.ty == WindowType::LauncherDock).map(|n| n.window_rect)
        })
    }

    /// Computes a window's rect from its request and pushes it to the client.
    fn update_layout_rect(&self, displays: &DisplayGroupInfo, tree: &mut WindowTree, id: WindowId) {
        let Some(node) = tree.get(id) else {
            warn!(?id, "layout of unknown window");
            return;
        };
        let display = node.display_id;
        let display_rect = displays.display_rect(display);
        let vpr = displays.virtual_pixel_ratio(display);
        let parent_rect = node.parent.and_then(|p| tree.get(p)).map(|p| p.window_rect);
        let dock_rect = self.dock_window_rect(tree, display);

        if let Some(node) = tree.get_mut(id) {
            let system = system_size_limits(node.ty, &display_rect, vpr);
            node.updated_size_limits = merge_size_limits(&system, &node.size_limits, vpr);
            compute_decorated_request_rect(node, vpr);
        }
        let Some(node) = tree.get(id) else { return };

        let default_rects = LayoutRects::default();
        let rects = self.layout_rects.get(&display).unwrap_or(&default_rects);
        let display_limit = self.limit_rects.get(&display).copied().unwrap_or(display_rect);

        let mut limit = rects.display_rect_for(node.mode, &display_rect);
        if node.flags.contains(WindowFlags::NEED_AVOID) {
            limit = rects.limit_rect_for(node.mode, &display_limit);
        }
        let mut win = node.request_rect;
        if !node.mode.is_floating() {
            win = limit;
        } else if node.ty.has_parent()
            && node.flags.contains(WindowFlags::PARENT_LIMIT)
            && let Some(parent) = parent_rect
        {
            update_floating_layout_rect(&parent, &mut win);
        }
        trace!(?id, request = %node.request_rect, %limit, %win, "before constraints");

        let mut reset_request = None;
        if node.ty == WindowType::DockSlice {
            limit_divider_move_bounds(&mut win, &display_limit);
            if node.reason == SizeChangeReason::DragEnd {
                if is_vertical_display(&display_rect) {
                    win.y = rects.closest_split_ratio_point(win.y, &display_limit);
                } else {
                    win.x = rects.closest_split_ratio_point(win.x, &display_limit);
                }
            }
            // a divider whose orientation disagrees with the display is left over from
            // before a rotation
            if win.is_landscape() != is_vertical_display(&display_rect) {
                debug!(%win, "reset divider after rotation");
                win = rects.divider;
                reset_request = Some(win);
            }
        }
        limit_floating_window_size(node, &mut win);

        if node.is_main_floating() {
            let dock_rect = dock_rect.unwrap_or_default();
            let dock = if dock_rect.is_empty() {
                DockWindowShowState::NotShown
            } else {
                DockWindowShowState::of_dock(&dock_rect, &display_rect)
            };
            let title_bar_height = scaled(WINDOW_TITLE_BAR_HEIGHT, vpr);
            if node.reason == SizeChangeReason::Drag {
                let limit =
                    if self.multi_display { self.display_group_limit_rect } else { display_limit };
                let bounds = FloatingBounds { limit, dock, dock_rect, title_bar_height };
                limit_window_position_when_drag(&node.window_rect, &bounds, &mut win);
                fix_window_size_by_ratio_if_drag_beyond_limit_region(
                    &node.updated_size_limits,
                    &bounds,
                    &mut win,
                );
            } else {
                let limit = if node.showing_on_multi_displays {
                    self.display_group_limit_rect
                } else {
                    display_limit
                };
                let bounds = FloatingBounds { limit, dock, dock_rect, title_bar_height };
                limit_window_position_when_init_or_move(
                    node.reason,
                    &bounds,
                    scaled(self.floating_bottom_pos_y, vpr),
                    &mut win,
                );
            }
        }

        let Some(node) = tree.get_mut(id) else { return };
        if let Some(request) = reset_request {
            node.request_rect = request;
        }
        node.window_rect = win;
        self.set_hot_zones(node, &display_rect, vpr);
        debug!(?id, name = %node.name, rect = %win, reason = ?node.reason, "window rect");
        if let Some(client) = &node.client {
            client.update_window_rect(win, node.deco_status, node.reason);
        }
        if !node.reason.survives_layout() && node.ty != WindowType::DockSlice {
            node.reason = SizeChangeReason::Undefined;
        }
    }

    fn set_hot_zones(&self, node: &mut WindowNode, display_rect: &Rect, vpr: f32) {
        let win = node.window_rect;
        let scale =
            if node.needs_transform() { hot_zone_scale(&node.transform_matrix()) } else { Vec2::ONE };
        node.entire_touch_hot_area = entire_window_hot_zone(
            node.ty,
            node.mode,
            &win,
            display_rect,
            self.hot_zone.touch,
            vpr,
            scale,
        );
        node.entire_pointer_hot_area = entire_window_hot_zone(
            node.ty,
            node.mode,
            &win,
            display_rect,
            self.hot_zone.pointer,
            vpr,
            scale,
        );
        if node.requested_hot_areas.is_empty() {
            node.touch_hot_areas = vec![node.entire_touch_hot_area];
            node.pointer_hot_areas = vec![node.entire_pointer_hot_area];
            return;
        }
        let areas = match calculate_touch_hot_areas(&win, &node.requested_hot_areas) {
            Ok(areas) => areas,
            Err(err) => {
                warn!(name = %node.name, %err, "touch hot areas partially rejected");
                err.accepted
            }
        };
        node.pointer_hot_areas = areas.clone();
        node.touch_hot_areas = areas;
    }

    /// Moves the bars onto their display edge before layout.
    fn update_window_node_rect_offset(
        &self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        id: WindowId,
    ) {
        let Some(node) = tree.get_mut(id) else { return };
        let Some(info) = displays.display_info(node.display_id) else { return };
        let display = info.rect();
        let rect = &mut node.request_rect;
        match node.ty {
            WindowType::StatusBar => rect.y = display.y,
            WindowType::NavigationBar => rect.y = display.bottom() - rect.height as i32,
            _ if info.waterfall_compression => {
                rect.y = rect.y.max(display.y).min(display.bottom());
            }
            _ => return,
        }
        trace!(?id, rect = %node.request_rect, "rect offset");
    }

    /// Called for a window that was just added or whose request changed.
    #[instrument(skip(self, displays, tree))]
    pub fn update_window_node(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        id: WindowId,
        is_add: bool,
    ) {
        self.update_window_node_rect_offset(displays, tree, id);
        let Some(node) = tree.get(id) else {
            warn!(?id, "update of unknown window");
            return;
        };
        let (display, ty, split) = (node.display_id, node.ty, node.is_split_mode());
        if ty.is_avoid_producer() {
            if self.special_reason_process(tree, id, is_add) {
                self.layout_window_tree(displays, tree, display);
            }
        } else if ty == WindowType::DockSlice {
            self.update_layout_rect(displays, tree, id);
            let divider = tree.get(id).map(|n| n.window_rect).unwrap_or_default();
            let display_rect = displays.display_rect(display);
            self.layout_rects.entry(display).or_default().set_split_rect(&divider, &display_rect);
            if !is_add {
                for w in tree.layer(display, RootLayer::App).to_vec() {
                    if let Some(n) = tree.get_mut(w)
                        && n.is_split_mode()
                    {
                        n.reason = SizeChangeReason::Drag;
                    }
                }
            }
            self.layout_window_tree(displays, tree, display);
        } else if split {
            self.layout_window_tree(displays, tree, display);
        } else {
            self.layout_window_node(displays, tree, id);
        }
    }

    /// False when a bar update needs no relayout. A rotation marks every window on
    /// the display.
    fn special_reason_process(&self, tree: &mut WindowTree, id: WindowId, is_add: bool) -> bool {
        let Some(node) = tree.get(id) else { return false };
        let (display, reason) = (node.display_id, node.reason);
        let unchanged = node.request_rect == node.window_rect;
        match reason {
            SizeChangeReason::Move | SizeChangeReason::Resize if !is_add && unchanged => {
                trace!(?id, "bar rect unchanged");
                false
            }
            SizeChangeReason::Rotation => {
                for w in tree.traverse_container(display) {
                    if let Some(n) = tree.get_mut(w) {
                        n.reason = SizeChangeReason::Rotation;
                    }
                }
                true
            }
            _ => true,
        }
    }

    /// Places a new window. Windows without a request rect are cascaded.
    #[instrument(skip(self, displays, tree))]
    pub fn add_window_node(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree, id: WindowId) {
        let Some(node) = tree.get(id) else {
            warn!(?id, "add of unknown window");
            return;
        };
        let display_id = node.display_id;
        let ty = node.ty;
        if node.request_rect.is_empty() {
            self.set_cascade_rect(displays, tree, id);
        }
        if ty == WindowType::DockSlice {
            let mut divider = self.layout_rects.get(&display_id).map(|r| r.divider).unwrap_or_default();
            if let Some(restoring) = self.restoring_divider_rects.remove(&display_id)
                && !restoring.is_empty()
            {
                debug!(%display_id, rect = %restoring, "restore divider");
                divider = restoring;
            }
            if let Some(node) = tree.get_mut(id) {
                node.request_rect = divider;
            }
        }
        self.update_window_node(displays, tree, id, true);
    }

    /// Called after `node` left the tree.
    #[instrument(skip_all, fields(name = %node.name))]
    pub fn remove_window_node(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree, node: &WindowNode) {
        let display = node.display_id;
        if node.ty.is_avoid_producer() {
            self.layout_window_tree(displays, tree, display);
        } else if node.ty == WindowType::DockSlice {
            let rect = displays.display_rect(display);
            let vpr = displays.virtual_pixel_ratio(display);
            self.layout_rects.entry(display).or_default().init_split_rects(&rect, vpr);
            self.layout_window_tree(displays, tree, display);
        }
        if let Some(client) = &node.client {
            client.update_window_rect(node.request_rect, node.deco_status, SizeChangeReason::Hide);
        }
    }

    fn init_cascade_rect(&mut self, displays: &DisplayGroupInfo, display_id: DisplayId) {
        let display_rect = displays.display_rect(display_id);
        let vpr = displays.virtual_pixel_ratio(display_id);
        let limit = self.limit_rects.get(&display_id).copied().unwrap_or(display_rect);
        let width =
            ((display_rect.width as f32 * CASCADE_RATIO) as u32).max(scaled(MIN_FLOATING_WIDTH, vpr));
        let height =
            ((display_rect.height as f32 * CASCADE_RATIO) as u32).max(scaled(MIN_FLOATING_HEIGHT, vpr));
        let rect = if width <= limit.width && height <= limit.height {
            Rect::new(
                limit.x + (limit.width / 2) as i32 - (width / 2) as i32,
                limit.y + (limit.height / 2) as i32 - (height / 2) as i32,
                width,
                height,
            )
        } else {
            Rect::new(0, 0, width, height)
        };
        debug!(%display_id, %rect, "first cascade rect");
        self.layout_rects.entry(display_id).or_default().first_cascade = rect;
    }

    fn first_cascade_rect(&self, display: DisplayId) -> Rect {
        self.layout_rects.get(&display).map(|r| r.first_cascade).unwrap_or_default()
    }

    /// Offsets `rect` by one title bar, wrapping to the limit rect origin on an axis
    /// where the step would leave it.
    fn step_cascade_rect(&self, displays: &DisplayGroupInfo, display: DisplayId, rect: &Rect) -> Rect {
        let step = scaled(WINDOW_TITLE_BAR_HEIGHT, displays.virtual_pixel_ratio(display)) as i32;
        let limit = self.limit_rects.get(&display).copied().unwrap_or_default();
        let x = if rect.x + step >= limit.x && rect.right() + step <= limit.right() {
            rect.x + step
        } else {
            limit.x
        };
        let y = if rect.y + step >= limit.y && rect.bottom() + step <= limit.bottom() {
            rect.y + step
        } else {
            limit.y
        };
        Rect::new(x, y, rect.width, rect.height)
    }

    /// The rect of the topmost other main window on the display, stepped once.
    fn current_cascade_rect(&self, displays: &DisplayGroupInfo, tree: &WindowTree, id: WindowId, display: DisplayId) -> Rect {
        let topmost = [RootLayer::Above, RootLayer::App]
            .into_iter()
            .flat_map(|layer| tree.layer(display, layer).iter().rev())
            .filter(|w| **w != id)
            .find_map(|w| tree.get(*w).filter(|n| n.ty == WindowType::AppMainWindow));
        let rect = match topmost {
            Some(n) if n.mode.is_floating() => n.window_rect,
            Some(n) => n.request_rect,
            None => Rect::EMPTY,
        };
        if rect.is_empty() {
            self.first_cascade_rect(display)
        } else {
            self.step_cascade_rect(displays, display, &rect)
        }
    }

    fn set_cascade_rect(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree, id: WindowId) {
        let Some(node) = tree.get(id) else { return };
        let display = node.display_id;
        let rect = if node.ty.is_app_window() && !self.first_app_window {
            self.current_cascade_rect(displays, tree, id, display)
        } else {
            if node.ty.is_app_window() {
                self.first_app_window = false;
            }
            self.first_cascade_rect(display)
        };
        debug!(?id, %rect, "cascade rect");
        if let Some(node) = tree.get_mut(id) {
            node.request_rect = rect;
            node.deco_status = true;
        }
    }

    /// Cascades every main window of every display into floating mode. Returns the
    /// windows that cannot float at their cascade rect so the caller can minimize them.
    #[instrument(skip(self, displays, tree))]
    pub fn reorder(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree) -> Vec<WindowId> {
        let mut rejected = Vec::new();
        for display in displays.display_ids() {
            let mut last: Option<Rect> = None;
            for id in tree.layer(display, RootLayer::App).to_vec() {
                let Some(node) = tree.get(id) else { continue };
                if node.ty != WindowType::AppMainWindow {
                    continue;
                }
                let rect = match &last {
                    Some(prev) => self.step_cascade_rect(displays, display, prev),
                    None => self.first_cascade_rect(display),
                };
                if !node.mode_support.supports(WindowMode::Floating)
                    || !node.updated_size_limits.is_satisfied_by(&rect)
                {
                    debug!(?id, %rect, "window cannot be cascaded");
                    rejected.push(id);
                    continue;
                }
                last = Some(rect);
                let Some(node) = tree.get_mut(id) else { continue };
                node.request_rect = rect;
                node.deco_status = true;
                if !node.mode.is_floating() {
                    node.mode = WindowMode::Floating;
                    if let Some(client) = &node.client {
                        client.update_window_mode(WindowMode::Floating);
                    }
                }
            }
            self.layout_window_tree(displays, tree, display);
        }
        rejected
    }

    /// A display was added. `displays` already holds it; `new_rects` are the rects of
    /// every display after the change.
    #[instrument(skip(self, displays, tree, new_rects))]
    pub fn process_display_create(
        &mut self,
        displays: &mut DisplayGroupInfo,
        tree: &mut WindowTree,
        display_id: DisplayId,
        new_rects: &BTreeMap<DisplayId, Rect>,
    ) -> Result<(), LayoutError> {
        let old_rects = displays.all_display_rects();
        if !old_rects.contains_key(&display_id) {
            error!(%display_id, "created display is not registered");
            return Err(LayoutError::UnknownDisplay(display_id));
        }
        check_display_count(&old_rects, new_rects)?;
        if let Some(found) = new_rects.keys().find(|d| !old_rects.contains_key(*d) && **d != display_id) {
            error!(%display_id, %found, "display map does not match");
            return Err(LayoutError::WrongDisplay { changed: display_id, found: *found });
        }
        self.apply_display_rects(displays, tree, &old_rects, new_rects)?;
        self.post_process_when_display_change(displays, tree);
        Ok(())
    }

    /// A display was removed. `displays` no longer holds it.
    #[instrument(skip(self, displays, tree, new_rects))]
    pub fn process_display_destroy(
        &mut self,
        displays: &mut DisplayGroupInfo,
        tree: &mut WindowTree,
        display_id: DisplayId,
        new_rects: &BTreeMap<DisplayId, Rect>,
    ) -> Result<(), LayoutError> {
        let old_rects = displays.all_display_rects();
        if old_rects.contains_key(&display_id) {
            error!(%display_id, "destroyed display is still registered");
            return Err(LayoutError::DisplayStillPresent(display_id));
        }
        check_display_count(&old_rects, new_rects)?;
        if let Some(found) = old_rects.keys().find(|d| !new_rects.contains_key(*d) && **d != display_id) {
            error!(%display_id, %found, "display map does not match");
            return Err(LayoutError::WrongDisplay { changed: display_id, found: *found });
        }
        self.apply_display_rects(displays, tree, &old_rects, new_rects)?;
        self.post_process_when_display_change(displays, tree);
        Ok(())
    }

    /// A display was resized or rotated. The rotation is already recorded in `displays`.
    #[instrument(skip(self, displays, tree, new_rects))]
    pub fn process_display_size_change_or_rotation(
        &mut self,
        displays: &mut DisplayGroupInfo,
        tree: &mut WindowTree,
        display_id: DisplayId,
        new_rects: &BTreeMap<DisplayId, Rect>,
    ) -> Result<(), LayoutError> {
        let old_rects = displays.all_display_rects();
        if !old_rects.contains_key(&display_id) {
            error!(%display_id, "changed display is not registered");
            return Err(LayoutError::UnknownDisplay(display_id));
        }
        check_display_count(&old_rects, new_rects)?;
        if let Some(found) = new_rects.keys().find(|d| !old_rects.contains_key(*d)) {
            error!(%display_id, %found, "display map does not match");
            return Err(LayoutError::WrongDisplay { changed: display_id, found: *found });
        }
        self.apply_display_rects(displays, tree, &old_rects, new_rects)?;
        self.post_process_when_display_change(displays, tree);
        Ok(())
    }

    fn apply_display_rects(
        &mut self,
        displays: &mut DisplayGroupInfo,
        tree: &mut WindowTree,
        old_rects: &BTreeMap<DisplayId, Rect>,
        new_rects: &BTreeMap<DisplayId, Rect>,
    ) -> Result<(), LayoutError> {
        for (display, new) in new_rects {
            if let Some(old) = old_rects.get(display) {
                update_rect_in_display_group_for_all_nodes(tree, *display, old, new);
            }
        }
        for (display, rect) in new_rects {
            displays.set_display_rect(*display, *rect)?;
        }
        Ok(())
    }

    fn post_process_when_display_change(&mut self, displays: &mut DisplayGroupInfo, tree: &mut WindowTree) {
        displays.update_left_and_right_display_id();
        self.multi_display = displays.len() > 1;
        self.clean(displays);
        self.update_display_group_rect(displays);
        self.launch(displays, tree);
    }
}

fn check_display_count(
    old_rects: &BTreeMap<DisplayId, Rect>,
    new_rects: &BTreeMap<DisplayId, Rect>,
) -> Result<(), LayoutError> {
    if old_rects.len() != new_rects.len() {
        error!(expected = old_rects.len(), got = new_rects.len(), "display count mismatch");
        return Err(LayoutError::DisplayCountMismatch {
            expected: old_rects.len(),
            got: new_rects.len(),
        });
    }
    Ok(())
}

/// Grows the request rect by the title bar and frame, once per window.
fn compute_decorated_request_rect(node: &mut WindowNode, vpr: f32) {
    if !node.decor_enable || node.deco_status || node.reason == SizeChangeReason::Move {
        return;
    }
    let frame = scaled(WINDOW_FRAME_WIDTH, vpr);
    let title = scaled(WINDOW_TITLE_BAR_HEIGHT, vpr);
    let rect = &mut node.request_rect;
    rect.width = rect.width.saturating_add(frame.saturating_mul(2));
    rect.height = rect.height.saturating_add(title.saturating_add(frame));
    node.deco_status = true;
    trace!(rect = %node.request_rect, "decorated request rect");
}

/// Moves every window of `display` along with the display, then pulls main floating
/// windows back inside the new display rect.
fn update_rect_in_display_group_for_all_nodes(
    tree: &mut WindowTree,
    display: DisplayId,
    old: &Rect,
    new: &Rect,
) {
    let (dx, dy) = (new.x - old.x, new.y - old.y);
    let roots: Vec<_> = tree.layers(display).map(|l| l.iter().collect()).unwrap_or_default();
    for root in roots {
        let Some(node) = tree.get(root) else { continue };
        let main_floating = node.is_main_floating();
        if !node.showing_on_multi_displays && (dx, dy) != (0, 0) {
            for w in tree.subtree(root) {
                if let Some(n) = tree.get_mut(w) {
                    n.request_rect = n.request_rect.translate(dx, dy);
                }
            }
        }
        if main_floating {
            for w in tree.subtree(root) {
                if let Some(n) = tree.get_mut(w) {
                    limit_window_to_bottom_right_corner(&mut n.request_rect, new);
                }
            }
        }
    }
}

fn limit_window_to_bottom_right_corner(rect: &mut Rect, display: &Rect) {
    rect.x = rect.x.max(display.x);
    rect.y = rect.y.max(display.y);
    rect.width = rect.width.min(display.width);
    rect.height = rect.height.min(display.height);
    if rect.right() > display.right() {
        rect.x = display.right() - rect.width as i32;
    }
    if rect.bottom() > display.bottom() {
        rect.y = display.bottom() - rect.height as i32;
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crossbeam_channel::Receiver;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::client::{ChannelClient, ClientEvent};
    use crate::layout_engine::display_group::DisplayInfo;
    use crate::model::WindowModeSupport;

    const D0: DisplayId = DisplayId(0);
    const D1: DisplayId = DisplayId(1);

    struct Harness {
        displays: DisplayGroupInfo,
        tree: WindowTree,
        policy: WindowLayoutPolicy,
    }

    impl Harness {
        fn new(rects: &[(DisplayId, Rect)]) -> Self { Self::with_config(rects, &Config::default()) }

        fn with_config(rects: &[(DisplayId, Rect)], config: &Config) -> Self {
            let mut h = Harness {
                displays: DisplayGroupInfo::new(rects[0].0),
                tree: WindowTree::new(),
                policy: WindowLayoutPolicy::new(config),
            };
            for (id, rect) in rects {
                h.displays.add_display_info(DisplayInfo::new(*id, *rect, 1.0)).unwrap();
                let all = h.displays.all_display_rects();
                h.policy.process_display_create(&mut h.displays, &mut h.tree, *id, &all).unwrap();
            }
            h
        }

        fn add(&mut self, node: WindowNode) -> WindowId {
            let id = self.tree.insert(node);
            self.policy.add_window_node(&self.displays, &mut self.tree, id);
            id
        }

        fn rect(&self, id: WindowId) -> Rect { self.tree.get(id).unwrap().window_rect }
    }

    fn phone() -> Rect { Rect::new(0, 0, 1080, 2340) }

    fn tablet() -> Rect { Rect::new(0, 0, 2560, 1600) }

    fn bar(ty: WindowType, rect: Rect) -> WindowNode {
        WindowNode::new(ty.to_string(), ty, WindowMode::Floating, D0).with_request_rect(rect)
    }

    fn app(name: &str, mode: WindowMode) -> WindowNode {
        WindowNode::new(name, WindowType::AppMainWindow, mode, D0).with_flags(WindowFlags::NEED_AVOID)
    }

    fn recording(node: WindowNode) -> (WindowNode, Receiver<(WindowId, ClientEvent)>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (node.with_client(Rc::new(ChannelClient::new(WindowId::default(), tx))), rx)
    }

    fn with_bars(rect: Rect) -> Harness {
        let mut h = Harness::new(&[(D0, rect)]);
        h.add(bar(WindowType::StatusBar, Rect::new(0, 0, rect.width, 100)));
        h.add(bar(WindowType::NavigationBar, Rect::new(0, 0, rect.width, 100)));
        h
    }

    mod limits {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn bars_carve_the_limit_rect() {
            let mut h = with_bars(phone());
            assert_eq!(h.policy.limit_rect(D0), Rect::new(0, 100, 1080, 2140));
            let full = h.add(app("full", WindowMode::Fullscreen));
            assert_eq!(h.rect(full), Rect::new(0, 100, 1080, 2140));
        }

        #[test]
        fn navigation_bar_snaps_to_the_bottom() {
            let h = with_bars(phone());
            let nav = h.tree.layer(D0, RootLayer::Above)[1];
            assert_eq!(h.rect(nav), Rect::new(0, 2240, 1080, 100));
        }

        #[test]
        fn windows_without_need_avoid_cover_the_display() {
            let mut h = with_bars(phone());
            let node = WindowNode::new("wall", WindowType::Wallpaper, WindowMode::Fullscreen, D0);
            let wall = h.add(node);
            assert_eq!(h.rect(wall), phone());
        }

        #[test]
        fn layout_twice_is_stable() {
            let mut h = with_bars(phone());
            let full = h.add(app("full", WindowMode::Fullscreen));
            let before = h.rect(full);
            h.policy.layout_window_tree(&h.displays, &mut h.tree, D0);
            h.policy.layout_window_tree(&h.displays, &mut h.tree, D0);
            assert_eq!(h.rect(full), before);
            assert_eq!(h.policy.display_group_limit_rect(), Rect::new(0, 100, 1080, 2140));
        }

        #[test]
        fn invisible_windows_keep_their_rect() {
            let mut h = with_bars(phone());
            let mut node = app("hidden", WindowMode::Fullscreen);
            node.visible = false;
            let hidden = h.add(node);
            assert_eq!(h.rect(hidden), Rect::EMPTY);
        }

        #[test]
        fn fullscreen_recent_stops_the_pass() {
            let mut h = with_bars(phone());
            let full = h.add(app("full", WindowMode::Fullscreen));
            let recent =
                WindowNode::new("recent", WindowType::LauncherRecent, WindowMode::Fullscreen, D0);
            h.add(recent);
            h.tree.get_mut(full).unwrap().window_rect = Rect::EMPTY;
            h.policy.layout_window_tree(&h.displays, &mut h.tree, D0);
            assert_eq!(h.rect(full), Rect::EMPTY);
        }

        #[test]
        fn sub_window_is_limited_by_parent() {
            let mut h = with_bars(phone());
            let parent = h.add(
                app("parent", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 600, 800)),
            );
            let mut sub = WindowNode::new("sub", WindowType::AppSubWindow, WindowMode::Floating, D0)
                .with_request_rect(Rect::new(0, 0, 2000, 400))
                .with_flags(WindowFlags::PARENT_LIMIT)
                .with_parent(parent);
            sub.priority = 1;
            let sub = h.add(sub);
            assert_eq!(h.rect(sub), Rect::new(100, 300, 600, 400));
        }
    }

    mod decoration {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn request_grows_once() {
            let mut h = with_bars(phone());
            let mut node = app("deco", WindowMode::Floating).with_request_rect(Rect::new(100, 200, 400, 300));
            node.decor_enable = true;
            let id = h.add(node);
            assert_eq!(h.tree.get(id).unwrap().request_rect, Rect::new(100, 200, 410, 342));
            h.policy.layout_window_tree(&h.displays, &mut h.tree, D0);
            assert_eq!(h.rect(id), Rect::new(100, 200, 410, 342));
        }

        #[test]
        fn oversized_request_saturates() {
            let mut h = with_bars(phone());
            let mut node =
                app("huge", WindowMode::Floating).with_request_rect(Rect::new(0, 0, u32::MAX, 300));
            node.decor_enable = true;
            let id = h.add(node);
            let node = h.tree.get(id).unwrap();
            assert_eq!((node.request_rect.width, node.request_rect.height), (u32::MAX, 342));
            assert!(node.deco_status);
            assert_eq!((h.rect(id).width, h.rect(id).height), (1920, 342));
        }

        #[test]
        fn move_does_not_decorate() {
            let mut node = app("deco", WindowMode::Floating).with_request_rect(Rect::new(0, 0, 400, 300));
            node.decor_enable = true;
            node.reason = SizeChangeReason::Move;
            compute_decorated_request_rect(&mut node, 2.0);
            assert_eq!(node.request_rect, Rect::new(0, 0, 400, 300));
            assert!(!node.deco_status);
        }
    }

    mod cascade {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn first_cascade_is_centered_in_limit() {
            let h = with_bars(phone());
            assert_eq!(
                h.policy.layout_rects(D0).unwrap().first_cascade,
                Rect::new(179, 387, 723, 1567)
            );
        }

        #[test]
        fn later_windows_step_by_title_bar() {
            let mut h = with_bars(phone());
            let first = h.add(app("first", WindowMode::Floating));
            let second = h.add(app("second", WindowMode::Floating));
            assert_eq!(h.rect(first), Rect::new(179, 387, 723, 1567));
            assert_eq!(h.rect(second), Rect::new(216, 424, 723, 1567));
            assert!(h.tree.get(second).unwrap().deco_status);
        }

        #[test]
        fn step_wraps_at_limit_edge() {
            let h = with_bars(phone());
            let stepped = h.policy.step_cascade_rect(&h.displays, D0, &Rect::new(340, 650, 723, 1567));
            assert_eq!(stepped, Rect::new(0, 100, 723, 1567));
        }

        #[test]
        fn reorder_rejects_windows_that_cannot_float() {
            let mut h = with_bars(phone());
            let (node, rx) = recording(app("a", WindowMode::Fullscreen));
            let a = h.add(node);
            let mut fixed = app("b", WindowMode::Fullscreen);
            fixed.mode_support = WindowModeSupport::FULLSCREEN;
            let b = h.add(fixed);
            let c = h.add(app("c", WindowMode::Fullscreen));

            let rejected = h.policy.reorder(&h.displays, &mut h.tree);
            assert_eq!(rejected, vec![b]);
            assert_eq!(h.tree.get(a).unwrap().mode, WindowMode::Floating);
            assert_eq!(h.rect(a), Rect::new(179, 387, 723, 1567));
            assert_eq!(h.rect(c), Rect::new(216, 424, 723, 1567));
            assert!(rx.try_iter().any(|(_, e)| e == ClientEvent::WindowMode { mode: WindowMode::Floating }));
        }
    }

    mod floating {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn main_floating_window_stays_reachable() {
            let mut h = with_bars(phone());
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(-900, 0, 400, 300)));
            assert_eq!(h.rect(id), Rect::new(37 - 400, 100, 400, 300));
        }

        #[test]
        fn drag_keeps_title_bar_below_limit_top() {
            let mut h = with_bars(phone());
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 400, 300)));
            let node = h.tree.get_mut(id).unwrap();
            node.request_rect = Rect::new(100, 20, 400, 580);
            node.reason = SizeChangeReason::Drag;
            h.policy.update_window_node(&h.displays, &mut h.tree, id, false);
            assert_eq!(h.rect(id), Rect::new(100, 100, 400, 500));
            assert_eq!(h.tree.get(id).unwrap().reason, SizeChangeReason::Undefined);
        }

        #[test]
        fn floating_bottom_moves_new_windows_up() {
            let mut config = Config::default();
            config.layout.floating_bottom_pos_y = 1000;
            let mut h = Harness::with_config(&[(D0, phone())], &config);
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 900, 400, 300)));
            assert_eq!(h.rect(id).y, 0);
        }

        #[test]
        fn dock_on_the_left_pushes_windows_right() {
            let mut h = with_bars(tablet());
            let dock = WindowNode::new("dock", WindowType::LauncherDock, WindowMode::Floating, D0)
                .with_request_rect(Rect::new(0, 100, 200, 1400));
            h.add(dock);
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(-500, 300, 400, 300)));
            assert_eq!(h.rect(id).x, 200 + 37 - 400);
        }

        #[test]
        fn move_reason_survives_layout() {
            let mut h = with_bars(phone());
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 400, 300)));
            h.tree.get_mut(id).unwrap().reason = SizeChangeReason::Move;
            h.policy.update_window_node(&h.displays, &mut h.tree, id, false);
            assert_eq!(h.tree.get(id).unwrap().reason, SizeChangeReason::Move);
        }

        #[test]
        fn client_gets_rect_and_hide() {
            let mut h = with_bars(phone());
            let (node, rx) = recording(app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 400, 300)));
            let id = h.add(node);
            let removed = h.tree.remove(id).unwrap();
            h.policy.remove_window_node(&h.displays, &mut h.tree, &removed);
            let events: Vec<_> = rx.try_iter().map(|(_, e)| e).collect();
            assert_eq!(
                events.first(),
                Some(&ClientEvent::WindowRect {
                    rect: Rect::new(100, 300, 400, 300),
                    deco_status: false,
                    reason: SizeChangeReason::Undefined,
                })
            );
            assert_eq!(
                events.last(),
                Some(&ClientEvent::WindowRect {
                    rect: Rect::new(100, 300, 400, 300),
                    deco_status: false,
                    reason: SizeChangeReason::Hide,
                })
            );
        }
    }

    mod hot_zones {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn floating_window_hot_zone_is_inflated() {
            let mut h = with_bars(phone());
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 400, 300)));
            let node = h.tree.get(id).unwrap();
            assert_eq!(node.entire_touch_hot_area, Rect::new(80, 280, 440, 340));
            assert_eq!(node.entire_pointer_hot_area, Rect::new(96, 296, 408, 308));
            assert_eq!(node.touch_hot_areas, vec![node.entire_touch_hot_area]);
        }

        #[test]
        fn requested_areas_replace_entire_zone() {
            let mut h = with_bars(phone());
            let mut node = app("f", WindowMode::Floating).with_request_rect(Rect::new(100, 300, 400, 300));
            node.requested_hot_areas = vec![Rect::new(0, 0, 50, 50), Rect::new(-1, 0, 5, 5)];
            let id = h.add(node);
            let node = h.tree.get(id).unwrap();
            assert_eq!(node.touch_hot_areas, vec![Rect::new(100, 300, 50, 50)]);
            assert_eq!(node.pointer_hot_areas, node.touch_hot_areas);
        }
    }

    mod split {
        use super::*;
        use pretty_assertions::assert_eq;

        fn divider() -> WindowNode {
            WindowNode::new("divider", WindowType::DockSlice, WindowMode::Floating, D0)
        }

        #[test]
        fn divider_splits_the_display() {
            let mut h = Harness::new(&[(D0, tablet())]);
            let div = h.add(divider());
            assert_eq!(h.rect(div), Rect::new(1276, 0, 8, 1600));
            let primary = h.add(app("p", WindowMode::SplitPrimary));
            let secondary = h.add(app("s", WindowMode::SplitSecondary));
            assert_eq!(h.rect(primary), Rect::new(0, 0, 1276, 1600));
            assert_eq!(h.rect(secondary), Rect::new(1284, 0, 1276, 1600));
        }

        #[test]
        fn drag_end_snaps_divider_and_resizes_halves() {
            let mut h = Harness::new(&[(D0, tablet())]);
            let div = h.add(divider());
            let primary = h.add(app("p", WindowMode::SplitPrimary));
            let node = h.tree.get_mut(div).unwrap();
            node.request_rect = Rect::new(1000, 0, 8, 1600);
            node.reason = SizeChangeReason::DragEnd;
            h.policy.update_window_node(&h.displays, &mut h.tree, div, false);
            assert_eq!(h.rect(div).x, 1276);
            assert_eq!(h.rect(primary).width, 1276);

            let node = h.tree.get_mut(div).unwrap();
            node.request_rect = Rect::new(1000, 0, 8, 1600);
            node.reason = SizeChangeReason::Drag;
            h.policy.update_window_node(&h.displays, &mut h.tree, div, false);
            assert_eq!(h.rect(div).x, 1000);
            assert_eq!(h.rect(primary), Rect::new(0, 0, 1000, 1600));
        }

        #[test]
        fn restoring_divider_rect_is_used_once() {
            let mut h = Harness::new(&[(D0, tablet())]);
            let mut restore = BTreeMap::new();
            restore.insert(D0, Rect::new(900, 0, 8, 1600));
            h.policy.set_split_divider_window_rects(restore);
            let div = h.add(divider());
            assert_eq!(h.rect(div), Rect::new(900, 0, 8, 1600));
            let removed = h.tree.remove(div).unwrap();
            h.policy.remove_window_node(&h.displays, &mut h.tree, &removed);
            let div = h.add(divider());
            assert_eq!(h.rect(div), Rect::new(1276, 0, 8, 1600));
        }

        #[test]
        fn rotated_divider_is_reset() {
            let mut h = Harness::new(&[(D0, phone())]);
            let div = h.add(divider());
            assert_eq!(h.rect(div), Rect::new(0, 1166, 1080, 8));
            let node = h.tree.get_mut(div).unwrap();
            node.request_rect = Rect::new(536, 0, 8, 1080);
            h.policy.update_window_node(&h.displays, &mut h.tree, div, false);
            assert_eq!(h.rect(div), Rect::new(0, 1166, 1080, 8));
            assert_eq!(h.tree.get(div).unwrap().request_rect, Rect::new(0, 1166, 1080, 8));
        }
    }

    mod displays {
        use super::*;
        use pretty_assertions::assert_eq;

        fn two_displays() -> Harness {
            Harness::new(&[(D0, phone()), (D1, Rect::new(1080, 0, 1080, 2340))])
        }

        #[test]
        fn group_rect_spans_all_displays() {
            let h = two_displays();
            assert!(h.policy.is_multi_display());
            assert_eq!(h.policy.display_group_rect(), Rect::new(0, 0, 2160, 2340));
            assert_eq!(h.displays.right_display_id(), D1);
        }

        #[test]
        fn windows_follow_their_display() {
            let mut h = two_displays();
            let mut node = app("f", WindowMode::Floating).with_request_rect(Rect::new(1180, 100, 400, 300));
            node.display_id = D1;
            let id = h.add(node);
            let mut rects = h.displays.all_display_rects();
            rects.insert(D1, Rect::new(1200, 0, 1080, 2340));
            h.policy
                .process_display_size_change_or_rotation(&mut h.displays, &mut h.tree, D1, &rects)
                .unwrap();
            assert_eq!(h.rect(id), Rect::new(1300, 100, 400, 300));
            assert_eq!(h.displays.display_rect(D1), Rect::new(1200, 0, 1080, 2340));
        }

        #[test]
        fn shrunk_display_pulls_windows_back() {
            let mut h = Harness::new(&[(D0, phone())]);
            let id = h.add(app("f", WindowMode::Floating).with_request_rect(Rect::new(700, 1900, 300, 300)));
            let mut rects = BTreeMap::new();
            rects.insert(D0, Rect::new(0, 0, 900, 2000));
            h.policy
                .process_display_size_change_or_rotation(&mut h.displays, &mut h.tree, D0, &rects)
                .unwrap();
            assert_eq!(h.tree.get(id).unwrap().request_rect, Rect::new(600, 1700, 300, 300));
        }

        #[test]
        fn mismatched_maps_are_rejected() {
            let mut h = two_displays();
            let before = h.displays.all_display_rects();
            let mut short = before.clone();
            short.remove(&D1);
            assert_eq!(
                h.policy.process_display_size_change_or_rotation(&mut h.displays, &mut h.tree, D1, &short),
                Err(LayoutError::DisplayCountMismatch { expected: 2, got: 1 })
            );
            let mut foreign = short.clone();
            foreign.insert(DisplayId(9), phone());
            assert_eq!(
                h.policy.process_display_size_change_or_rotation(&mut h.displays, &mut h.tree, D1, &foreign),
                Err(LayoutError::WrongDisplay { changed: D1, found: DisplayId(9) })
            );
            assert_eq!(
                h.policy.process_display_create(&mut h.displays, &mut h.tree, DisplayId(9), &before),
                Err(LayoutError::UnknownDisplay(DisplayId(9)))
            );
            assert_eq!(h.displays.all_display_rects(), before);
        }

        #[test]
        fn destroy_drops_display_state() {
            let mut h = two_displays();
            h.tree.remove_display(D1);
            h.displays.remove_display_info(D1);
            let rects = h.displays.all_display_rects();
            h.policy.process_display_destroy(&mut h.displays, &mut h.tree, D1, &rects).unwrap();
            assert!(!h.policy.is_multi_display());
            assert_eq!(h.policy.limit_rect(D1), Rect::EMPTY);
            assert_eq!(h.policy.display_group_rect(), phone());
        }

        #[test]
        fn destroy_of_registered_display_is_rejected() {
            let mut h = two_displays();
            let rects = h.displays.all_display_rects();
            assert_eq!(
                h.policy.process_display_destroy(&mut h.displays, &mut h.tree, D1, &rects),
                Err(LayoutError::DisplayStillPresent(D1))
            );
        }

        #[test]
        fn corner_clamp() {
            let display = Rect::new(0, 0, 1000, 1000);
            let mut rect = Rect::new(-50, 900, 1200, 300);
            limit_window_to_bottom_right_corner(&mut rect, &display);
            assert_eq!(rect, Rect::new(0, 700, 1000, 300));
        }
    }
}
