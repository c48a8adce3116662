//! Accessibility magnification of the default display.
//!
//! One zoom state covers every window of the default display. It is layered on top of
//! the laid out rects as a per-window zoom transform, so relayout only has to
//! re-derive the transforms from [`DisplayZoomInfo`].

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use super::display_group::DisplayGroupInfo;
use crate::common::config::ZoomSettings;
use crate::model::{DisplayId, WindowId, WindowNode, WindowTree, WindowType};
use crate::sys::geometry::Rect;
use crate::sys::transform::{Transform, matrix_scale, matrix_translation, transform_rect};

pub const DISPLAY_ZOOM_OFF_SCALE: f32 = 1.0;

const ZOOM_SKIPPED_TYPES: &[WindowType] = &[WindowType::NavigationBar, WindowType::InputMethodFloat];

fn is_zoom_skipped(ty: WindowType) -> bool { ZOOM_SKIPPED_TYPES.contains(&ty) }

/// Cumulative zoom. The pivot is absolute; once zoomed it sits at the origin and the
/// translation carries the anchor.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct DisplayZoomInfo {
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Default for DisplayZoomInfo {
    fn default() -> Self {
        DisplayZoomInfo {
            pivot_x: 0.0,
            pivot_y: 0.0,
            scale: DISPLAY_ZOOM_OFF_SCALE,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayZoomController {
    zoom_info: DisplayZoomInfo,
    min_scale: f32,
    max_scale: f32,
}

impl DisplayZoomController {
    pub fn new(settings: ZoomSettings) -> Self {
        DisplayZoomController {
            zoom_info: DisplayZoomInfo::default(),
            min_scale: settings.min_scale,
            max_scale: settings.max_scale,
        }
    }

    pub fn zoom_info(&self) -> DisplayZoomInfo { self.zoom_info }

    pub fn is_zoom_on(&self) -> bool { self.zoom_info.scale != DISPLAY_ZOOM_OFF_SCALE }

    /// Zooms by `scale` about `(x, y)`. The factor is reduced so the cumulative scale
    /// stays within the configured bounds.
    #[instrument(skip(self, displays, tree))]
    pub fn set_anchor_and_scale(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        x: i32,
        y: i32,
        scale: f32,
    ) {
        if scale <= 0.0 || scale.is_nan() {
            warn!(scale, "ignoring non-positive zoom factor");
            return;
        }
        let mut scale = scale;
        if self.zoom_info.scale * scale < self.min_scale {
            scale = self.min_scale / self.zoom_info.scale;
        } else if self.zoom_info.scale * scale > self.max_scale {
            scale = self.max_scale / self.zoom_info.scale;
        }

        let anchor = DisplayZoomInfo {
            pivot_x: x as f32,
            pivot_y: y as f32,
            scale,
            translate_x: 0.0,
            translate_y: 0.0,
        };
        let mut calculated = false;
        for id in tree.traverse_container(displays.default_display_id()) {
            let Some(node) = tree.get(id) else { continue };
            if is_zoom_skipped(node.ty) {
                continue;
            }
            let trans = if !calculated && node.window_rect.has_area() {
                let trans = calc_zoom_transform(node, &anchor);
                self.zoom_info.scale *= scale;
                // composed transforms are expressed about the origin
                self.zoom_info.pivot_x = 0.0;
                self.zoom_info.pivot_y = 0.0;
                self.zoom_info.translate_x = trans.translate_x;
                self.zoom_info.translate_y = trans.translate_y;
                calculated = true;
                debug!(info = ?self.zoom_info, reference = %node.name, "zoom info");
                trans
            } else {
                self.calc_zoom_transform_by_zoom_info(node)
            };
            if let Some(node) = tree.get_mut(id) {
                update_client_and_surface_zoom_info(node, trans);
            }
        }
    }

    /// Pans the zoomed display. The delta is clamped so the zoomed desktop keeps
    /// covering the display.
    #[instrument(skip(self, displays, tree))]
    pub fn set_anchor_offset(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        delta_x: i32,
        delta_y: i32,
    ) {
        let display = displays.default_display_id();
        let Some((dx, dy)) = self.update_zoom_translate_info(displays, tree, display, delta_x, delta_y)
        else {
            return;
        };
        for id in tree.traverse_container(display) {
            let Some(node) = tree.get_mut(id) else { continue };
            if is_zoom_skipped(node.ty) {
                continue;
            }
            let mut trans = node.zoom_transform;
            trans.translate_x += dx as f32;
            trans.translate_y += dy as f32;
            update_client_and_surface_zoom_info(node, trans);
        }
    }

    /// Turns zoom off and clears every zoomed window.
    #[instrument(skip_all)]
    pub fn off_window_zoom(&mut self, displays: &DisplayGroupInfo, tree: &mut WindowTree) {
        self.zoom_info = DisplayZoomInfo::default();
        for id in tree.traverse_container(displays.default_display_id()) {
            let Some(node) = tree.get_mut(id) else { continue };
            if is_zoom_skipped(node.ty) {
                continue;
            }
            clear_zoom_transform_inner(node);
        }
        debug!("zoom off");
    }

    /// Re-derives every window's zoom transform after a relayout of `display`.
    #[instrument(skip(self, displays, tree))]
    pub fn update_all_windows_zoom_info(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        display_id: DisplayId,
    ) {
        if !self.is_zoom_on() || display_id != displays.default_display_id() {
            return;
        }
        if let Some((dx, dy)) = self.update_zoom_translate_info(displays, tree, display_id, 0, 0) {
            debug!(dx, dy, "zoom translation adjusted");
        }
        for id in tree.traverse_container(display_id) {
            self.handle_update_window_zoom_info(tree, id);
        }
    }

    /// Re-derives one window's zoom transform. A divider update refreshes the whole
    /// split screen pair.
    pub fn update_window_zoom_info(
        &self,
        displays: &DisplayGroupInfo,
        tree: &mut WindowTree,
        id: WindowId,
    ) {
        if !self.is_zoom_on() {
            return;
        }
        let Some(node) = tree.get(id) else { return };
        if !node.visible || node.display_id != displays.default_display_id() {
            return;
        }
        let ids = if node.ty == WindowType::DockSlice {
            tree.split_screen_windows(node.display_id)
        } else {
            vec![id]
        };
        for id in ids {
            self.handle_update_window_zoom_info(tree, id);
        }
    }

    /// Drops the zoom transform of windows leaving the zoomed display.
    pub fn clear_zoom_transform(&self, tree: &mut WindowTree, ids: &[WindowId]) {
        if !self.is_zoom_on() {
            return;
        }
        for id in ids {
            if let Some(node) = tree.get_mut(*id) {
                clear_zoom_transform_inner(node);
            }
        }
    }

    fn handle_update_window_zoom_info(&self, tree: &mut WindowTree, id: WindowId) {
        let Some(node) = tree.get_mut(id) else { return };
        if is_zoom_skipped(node.ty) {
            return;
        }
        let trans = if node.animating {
            self.calc_animate_zoom_transform(node)
        } else {
            self.calc_zoom_transform_by_zoom_info(node)
        };
        update_client_and_surface_zoom_info(node, trans);
    }

    /// Clamps a pan so the zoomed desktop still covers the display and records it.
    /// Returns the applied delta, or `None` when nothing moved.
    fn update_zoom_translate_info(
        &mut self,
        displays: &DisplayGroupInfo,
        tree: &WindowTree,
        display_id: DisplayId,
        delta_x: i32,
        delta_y: i32,
    ) -> Option<(i32, i32)> {
        let Some(desktop) = tree.desktop_window(display_id).and_then(|w| tree.get(w)) else {
            warn!(%display_id, "no desktop window to bound the zoom");
            return None;
        };
        let Some(info) = displays.display_info(display_id) else {
            warn!(%display_id, "unknown display");
            return None;
        };
        let original = desktop.window_rect;
        let zoomed = if desktop.zoom_transform.is_identity() {
            original
        } else {
            transform_rect(&desktop.zoom_transform.full_matrix(&original), &original)
        };
        let display = info.rect();
        let max_x = display.x - zoomed.x;
        let min_x = display.right() - zoomed.right();
        let max_y = display.y - zoomed.y;
        let min_y = display.bottom() - zoomed.bottom();
        let dx = delta_x.max(min_x).min(max_x);
        let dy = delta_y.max(min_y).min(max_y);
        trace!(%zoomed, delta_x, delta_y, dx, dy, "clamp zoom pan");
        if dx == 0 && dy == 0 {
            return None;
        }
        self.zoom_info.translate_x += dx as f32;
        self.zoom_info.translate_y += dy as f32;
        Some((dx, dy))
    }

    fn calc_zoom_transform_by_zoom_info(&self, node: &WindowNode) -> Transform {
        let rect = node.window_rect;
        if !rect.has_area() {
            return Transform::IDENTITY;
        }
        Transform {
            pivot_x: (self.zoom_info.pivot_x - rect.x as f32) / rect.width as f32,
            pivot_y: (self.zoom_info.pivot_y - rect.y as f32) / rect.height as f32,
            scale_x: self.zoom_info.scale,
            scale_y: self.zoom_info.scale,
            translate_x: self.zoom_info.translate_x,
            translate_y: self.zoom_info.translate_y,
            ..Transform::IDENTITY
        }
    }

    /// Zoom composed with the window's running animation transform.
    fn calc_animate_zoom_transform(&self, node: &WindowNode) -> Transform {
        let rect = node.window_rect;
        if !rect.has_area() {
            return Transform::IDENTITY;
        }
        let last = self.calc_zoom_transform_by_zoom_info(node);
        let last_world = last.world_matrix_about(last.pivot_position(&rect));

        let mut animate = node.transform;
        if animate.translate_z != 0.0 {
            animate.clear_z_axis_offset(&rect);
        }
        let animate_world = animate.world_matrix_about(animate.pivot_position(&rect));

        let world = last_world * animate_world;
        let scale = matrix_scale(&world);
        let translation = matrix_translation(&world);
        Transform {
            scale_x: scale.x,
            scale_y: scale.y,
            translate_x: translation.x,
            translate_y: translation.y,
            translate_z: translation.z,
            rotation_x: animate.rotation_x,
            rotation_y: animate.rotation_y,
            rotation_z: animate.rotation_z,
            ..origin_pivot(&rect)
        }
    }
}

/// Identity transform whose pivot sits at the absolute origin.
fn origin_pivot(rect: &Rect) -> Transform {
    Transform {
        pivot_x: -(rect.x as f32) / rect.width as f32,
        pivot_y: -(rect.y as f32) / rect.height as f32,
        ..Transform::IDENTITY
    }
}

/// The node's current zoom followed by a further zoom about an absolute anchor.
fn calc_zoom_transform(node: &WindowNode, anchor: &DisplayZoomInfo) -> Transform {
    let rect = node.window_rect;
    if !rect.has_area() {
        return Transform::IDENTITY;
    }
    let last = node.zoom_transform;
    let last_world = last.world_matrix_about(last.pivot_position(&rect));

    let zoom = Transform {
        scale_x: anchor.scale,
        scale_y: anchor.scale,
        translate_x: anchor.translate_x,
        translate_y: anchor.translate_y,
        ..Transform::IDENTITY
    };
    let pivot = glam::Vec3::new(anchor.pivot_x, anchor.pivot_y, 0.0);
    let world = zoom.world_matrix_about(pivot) * last_world;

    let scale = matrix_scale(&world);
    let translation = matrix_translation(&world);
    Transform {
        scale_x: scale.x,
        scale_y: scale.y,
        translate_x: translation.x,
        translate_y: translation.y,
        ..origin_pivot(&rect)
    }
}

fn update_client_and_surface_zoom_info(node: &mut WindowNode, trans: Transform) {
    node.zoom_transform = trans;
    node.zoom_on = true;
    if let Some(client) = &node.client {
        client.update_zoom_transform(&trans, true);
        if !node.animating {
            client.transform_surface(&trans);
        }
    }
    trace!(name = %node.name, ?trans, "zoom transform");
}

fn clear_zoom_transform_inner(node: &mut WindowNode) {
    node.zoom_transform = Transform::IDENTITY;
    node.zoom_on = false;
    if let Some(client) = &node.client {
        client.update_zoom_transform(&Transform::IDENTITY, false);
        if !node.animating {
            client.transform_surface(&Transform::IDENTITY);
        }
    }
}
