//! Hit testing regions derived from a laid-out window rect.

use glam::Vec2;
use tracing::warn;

use super::error::HotAreaError;
use crate::model::{WindowMode, WindowType, is_main_floating_window};
use crate::sys::geometry::Rect;

/// Inflates `win` by `hot_zone` dp on the edges a window of this kind can be grabbed
/// by. The margin is divided by the window's on-screen scale so it stays the same
/// size in device pixels.
pub fn entire_window_hot_zone(
    ty: WindowType,
    mode: WindowMode,
    win: &Rect,
    display: &Rect,
    hot_zone: u32,
    vpr: f32,
    scale: Vec2,
) -> Rect {
    let hot_x = (hot_zone as f32 * vpr / scale.x) as u32;
    let hot_y = (hot_zone as f32 * vpr / scale.y) as u32;

    if ty == WindowType::DockSlice {
        if win.width < win.height { win.inflate(hot_x, 0) } else { win.inflate(0, hot_y) }
    } else if ty == WindowType::LauncherRecent {
        *display
    } else if is_main_floating_window(ty, mode) {
        win.inflate(hot_x, hot_y)
    } else {
        *win
    }
}

/// Turns app requested hot areas (relative to the window) into absolute rects clipped
/// to the window. A request with a negative origin or no area aborts the rest; one
/// whose origin lies outside the window is skipped.
pub fn calculate_touch_hot_areas(win: &Rect, requested: &[Rect]) -> Result<Vec<Rect>, HotAreaError> {
    let mut accepted = Vec::with_capacity(requested.len());
    let mut ok = true;
    for rect in requested {
        if rect.x < 0 || rect.y < 0 || rect.width == 0 || rect.height == 0 {
            ok = false;
            break;
        }
        if rect.x >= win.width as i32 || rect.y >= win.height as i32 {
            ok = false;
            continue;
        }
        let x = win.x + rect.x;
        let y = win.y + rect.y;
        let right = (x + rect.width as i32).min(win.right());
        let bottom = (y + rect.height as i32).min(win.bottom());
        accepted.push(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32));
    }
    if ok {
        Ok(accepted)
    } else {
        let rejected = requested.len() - accepted.len();
        warn!(rejected, "abnormal requested hot areas");
        Err(HotAreaError { accepted, rejected })
    }
}
