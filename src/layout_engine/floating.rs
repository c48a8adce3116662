//! Size and position constraints for floating windows.
//!
//! Everything here is pure: the layout policy gathers the node, the display and the
//! active limit rect, and these functions adjust a candidate rect in place.

use tracing::{debug, trace, warn};

use crate::model::{DragType, SizeChangeReason, WindowNode, WindowSizeLimits, WindowType};
use crate::sys::geometry::{Rect, scaled};

pub const MIN_FLOATING_WIDTH: u32 = 320;
pub const MIN_FLOATING_HEIGHT: u32 = 240;
pub const MAX_FLOATING_SIZE: u32 = 1920;
pub const WINDOW_TITLE_BAR_HEIGHT: u32 = 37;
pub const WINDOW_FRAME_WIDTH: u32 = 5;

const CAMERA_SMALL_DISPLAY_DP: u32 = 600;

/// Where the launcher dock sits on its display, if it is docked to an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockWindowShowState {
    #[default]
    NotShown,
    ShownInBottom,
    ShownInLeft,
    ShownInRight,
}

impl DockWindowShowState {
    pub fn of_dock(dock: &Rect, display: &Rect) -> DockWindowShowState {
        if dock.height < dock.width {
            if dock.bottom() == display.bottom() {
                DockWindowShowState::ShownInBottom
            } else {
                DockWindowShowState::NotShown
            }
        } else if dock.x == display.x {
            DockWindowShowState::ShownInLeft
        } else if dock.right() == display.right() {
            DockWindowShowState::ShownInRight
        } else {
            DockWindowShowState::NotShown
        }
    }
}

/// The region a main floating window has to stay reachable in.
#[derive(Debug, Clone, Copy)]
pub struct FloatingBounds {
    pub limit: Rect,
    pub dock: DockWindowShowState,
    pub dock_rect: Rect,
    pub title_bar_height: u32,
}

impl FloatingBounds {
    /// Range the window's edges may occupy while dragging: `min_x` bounds the right
    /// edge, `max_x` and both y values bound the origin.
    fn drag_limits(&self) -> (i32, i32, i32, i32) {
        let title = self.title_bar_height as i32;
        let mut min_x = self.limit.x + title;
        let mut max_x = self.limit.right() - title;
        let min_y = self.limit.y;
        let mut max_y = self.limit.bottom() - title;
        match self.dock {
            DockWindowShowState::ShownInBottom => max_y = self.dock_rect.y - title,
            DockWindowShowState::ShownInLeft => min_x = self.dock_rect.right() + title,
            DockWindowShowState::ShownInRight => max_x = self.dock_rect.x - title,
            DockWindowShowState::NotShown => {}
        }
        (min_x, max_x, min_y, max_y)
    }
}

fn ratio(width: u32, height: u32) -> f32 {
    if height == 0 { f32::MAX } else { width as f32 / height as f32 }
}

/// Size limits the system imposes on a floating window of this type on this display.
pub fn system_size_limits(ty: WindowType, display: &Rect, vpr: f32) -> WindowSizeLimits {
    let mut limits = WindowSizeLimits {
        max_width: scaled(MAX_FLOATING_SIZE, vpr),
        max_height: scaled(MAX_FLOATING_SIZE, vpr),
        ..WindowSizeLimits::default()
    };

    if ty == WindowType::FloatCamera {
        // small displays (sw <= 600dp): 30% of sw in portrait, 50% in landscape
        // larger displays: 12% in portrait, 30% in landscape
        let small_width = display.width.min(display.height);
        let hw_ratio =
            if display.width == 0 { 0.0 } else { display.height as f32 / display.width as f32 };
        let portrait = display.width <= display.height;
        let percent: u64 = match (small_width <= scaled(CAMERA_SMALL_DISPLAY_DP, vpr), portrait) {
            (true, true) => 30,
            (true, false) => 50,
            (false, true) => 12,
            (false, false) => 30,
        };
        limits.min_width = (small_width as u64 * percent / 100) as u32;
        limits.min_height = (limits.min_width as f32 * hw_ratio) as u32;
    } else {
        limits.min_width = scaled(MIN_FLOATING_WIDTH, vpr);
        limits.min_height = scaled(MIN_FLOATING_HEIGHT, vpr);
    }
    trace!(?limits, "system size limits");
    limits
}

/// Merges the app's declared limits (dp) into the system limits (px). Declared bounds
/// only count when they fall inside the system bounds, and the size and ratio bounds
/// are reconciled so neither lets the other escape.
pub fn merge_size_limits(
    system: &WindowSizeLimits,
    configured: &WindowSizeLimits,
    vpr: f32,
) -> WindowSizeLimits {
    let mut limits = *system;

    let configured_max_width = scaled(configured.max_width, vpr);
    let configured_max_height = scaled(configured.max_height, vpr);
    let configured_min_width = scaled(configured.min_width, vpr);
    let configured_min_height = scaled(configured.min_height, vpr);

    if (system.min_width..=system.max_width).contains(&configured_max_width) {
        limits.max_width = configured_max_width;
    }
    if (system.min_height..=system.max_height).contains(&configured_max_height) {
        limits.max_height = configured_max_height;
    }
    if (system.min_width..=limits.max_width).contains(&configured_min_width) {
        limits.min_width = configured_min_width;
    }
    if (system.min_height..=limits.max_height).contains(&configured_min_height) {
        limits.min_height = configured_min_height;
    }

    limits.max_ratio = ratio(limits.max_width, limits.min_height);
    limits.min_ratio = ratio(limits.min_width, limits.max_height);
    if limits.min_ratio <= configured.max_ratio && configured.max_ratio <= limits.max_ratio {
        limits.max_ratio = configured.max_ratio;
    }
    if limits.min_ratio <= configured.min_ratio && configured.min_ratio <= limits.max_ratio {
        limits.min_ratio = configured.min_ratio;
    }

    let new_max_width = (limits.max_height as f32 * limits.max_ratio) as u32;
    limits.max_width = limits.max_width.min(new_max_width);
    let new_min_width = (limits.min_height as f32 * limits.min_ratio) as u32;
    limits.min_width = limits.min_width.max(new_min_width);
    let new_max_height = (limits.max_width as f32 / limits.min_ratio) as u32;
    limits.max_height = limits.max_height.min(new_max_height);
    let new_min_height = (limits.min_width as f32 / limits.max_ratio) as u32;
    limits.min_height = limits.min_height.max(new_min_height);

    debug!(?limits, "merged size limits");
    limits
}

/// Clamps a floating window's size into its effective limits. Main floating windows
/// also get their aspect ratio fixed, and during a drag the edge that is not being
/// dragged stays put.
pub fn limit_floating_window_size(node: &WindowNode, win: &mut Rect) {
    if !node.mode.is_floating() || node.ty == WindowType::AppComponent {
        return;
    }
    let original = *win;
    update_floating_window_size_by_size_limits(node, win);

    if node.stretchable && node.is_main_floating() {
        update_floating_window_size_for_stretchable_window(node, win);
    }

    if node.reason == SizeChangeReason::Drag {
        let last = node.window_rect;
        if original.x != last.x {
            win.x = original.right().saturating_sub_unsigned(win.width);
        }
        if original.y != last.y {
            win.y = original.bottom().saturating_sub_unsigned(win.height);
        }
    }
}

fn update_floating_window_size_by_size_limits(node: &WindowNode, win: &mut Rect) {
    let limits = &node.updated_size_limits;

    // system windows may be smaller than the floating minimum
    if !node.ty.is_system_window() || node.ty == WindowType::FloatCamera {
        win.width = win.width.max(limits.min_width);
        win.height = win.height.max(limits.min_height);
    }
    win.width = win.width.min(limits.max_width);
    win.height = win.height.min(limits.max_height);
    trace!(%win, "after limit by size");

    if limits.is_frozen() {
        win.width = limits.max_width;
        win.height = limits.max_height;
        trace!("window size is frozen");
        return;
    }

    if win.height == 0 {
        warn!("window height is zero");
        return;
    }
    let cur_ratio = ratio(win.width, win.height);
    if !node.is_main_floating() || (limits.min_ratio <= cur_ratio && cur_ratio <= limits.max_ratio) {
        return;
    }

    let new_ratio = if cur_ratio < limits.min_ratio { limits.min_ratio } else { limits.max_ratio };
    if limits.max_width == limits.min_width {
        win.height = (win.width as f32 / new_ratio) as u32;
        return;
    }
    if limits.max_height == limits.min_height {
        win.width = (win.height as f32 * new_ratio) as u32;
        return;
    }

    if node.drag_type == DragType::BottomOrTop {
        win.width = (win.height as f32 * new_ratio) as u32;
    } else {
        win.height = (win.width as f32 / new_ratio) as u32;
    }
    trace!(%win, "after limit by ratio");
}

fn update_floating_window_size_for_stretchable_window(node: &WindowNode, win: &mut Rect) {
    if node.reason == SizeChangeReason::Drag {
        let origin = node.origin_rect;
        if !origin.has_area() {
            warn!(%origin, "invalid origin rect");
            return;
        }
        match node.drag_type {
            DragType::BottomOrTop => {
                win.width = (win.height as u64 * origin.width as u64 / origin.height as u64) as u32;
            }
            DragType::LeftOrRight | DragType::LeftTopCorner | DragType::RightTopCorner => {
                win.height = (win.width as u64 * origin.height as u64 / origin.width as u64) as u32;
            }
            DragType::Undefined => {}
        }
    }

    let limits = &node.updated_size_limits;
    let scale = (win.width as f32 / limits.min_width as f32)
        .min(win.height as f32 / limits.min_height as f32);
    if scale == 0.0 || scale.is_nan() {
        warn!(?limits, "invalid size limits");
        return;
    }
    if scale < 1.0 {
        win.width = (win.width as f32 / scale) as u32;
        win.height = (win.height as f32 / scale) as u32;
    }
}

/// Keeps a dragged window's title bar reachable, shrinking the dragged edge instead of
/// moving the window when the drag resizes it.
pub fn limit_window_position_when_drag(last: &Rect, bounds: &FloatingBounds, win: &mut Rect) {
    let original = *win;
    let (min_x, max_x, min_y, max_y) = bounds.drag_limits();

    // min_x bounds the right edge
    if original.right() < min_x && original.width != last.width {
        win.width = (min_x - original.x).max(0) as u32;
    }
    if original.x > max_x {
        win.x = max_x;
        if original.width != last.width {
            win.width = (original.right() - win.x).max(0) as u32;
        }
    }
    if original.y < min_y {
        win.y = min_y;
        if original.height != last.height {
            win.height = (original.bottom() - win.y).max(0) as u32;
        }
    }
    if win.y > max_y {
        win.y = max_y;
        if original.height != last.height {
            win.height = (original.bottom() - win.y).max(0) as u32;
        }
    }
    trace!(%win, "after limit by position");
}

/// Re-derives the free dimension when a drag pushed a ratio limited window into the
/// edge of its region.
pub fn fix_window_size_by_ratio_if_drag_beyond_limit_region(
    limits: &WindowSizeLimits,
    bounds: &FloatingBounds,
    win: &mut Rect,
) {
    if limits.is_frozen() {
        return;
    }
    if win.height == 0 {
        warn!("window height is zero");
        return;
    }
    let cur_ratio = ratio(win.width, win.height);
    if limits.min_ratio <= cur_ratio && cur_ratio <= limits.max_ratio {
        return;
    }

    let (min_x, max_x, min_y, max_y) = bounds.drag_limits();
    let new_ratio = if cur_ratio < limits.min_ratio { limits.min_ratio } else { limits.max_ratio };
    if win.right() == min_x || win.x == max_x {
        if limits.max_height == limits.min_height {
            return;
        }
        win.height = (win.width as f32 / new_ratio) as u32;
    }
    if win.y == min_y || win.y == max_y {
        if limits.max_width == limits.min_width {
            return;
        }
        win.width = (win.height as f32 * new_ratio) as u32;
    }
    trace!(%win, "after limit by ratio beyond limit region");
}

/// Position limits applied when a window is first shown or moved. `floating_bottom`
/// is the already scaled bottom line; 0 disables it.
pub fn limit_window_position_when_init_or_move(
    reason: SizeChangeReason,
    bounds: &FloatingBounds,
    floating_bottom: u32,
    win: &mut Rect,
) {
    let limit = bounds.limit;
    let title = bounds.title_bar_height as i32;
    let width = win.width as i32;

    win.y = win.y.max(limit.y).min(limit.bottom() - title);
    if bounds.dock == DockWindowShowState::ShownInBottom {
        win.y = win.y.min(bounds.dock_rect.y - title);
    }
    win.x = win.x.max(limit.x + title - width);
    if bounds.dock == DockWindowShowState::ShownInLeft {
        win.x = win.x.max(bounds.dock_rect.width as i32 + title - width);
    }
    win.x = win.x.min(limit.right() - title);
    if bounds.dock == DockWindowShowState::ShownInRight {
        win.x = win.x.min(bounds.dock_rect.x - title);
    }

    if floating_bottom != 0
        && reason == SizeChangeReason::Undefined
        && win.bottom() as i64 >= floating_bottom as i64
    {
        win.y = limit.y;
    }
    trace!(%win, "after limit by position on init or move");
}

/// Fits `win` inside `limit`, shrinking it first if it is larger.
pub fn update_floating_layout_rect(limit: &Rect, win: &mut Rect) {
    win.width = win.width.min(limit.width);
    win.height = win.height.min(limit.height);
    win.x = win.x.max(limit.x).min(limit.right() - win.width as i32);
    win.y = win.y.max(limit.y).min(limit.bottom() - win.height as i32);
}
