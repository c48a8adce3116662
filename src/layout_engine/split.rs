//! Split screen geometry of one display: where the divider sits and the two halves it
//! leaves on either side.

use tracing::{debug, trace};

use crate::common::config::SplitSettings;
use crate::model::WindowMode;
use crate::sys::geometry::{Rect, scaled, span};

pub const DIVIDER_WIDTH: u32 = 8;
pub const DEFAULT_SPLIT_RATIO: f32 = 0.5;

/// Portrait displays stack the split halves vertically.
pub fn is_vertical_display(display: &Rect) -> bool { display.width < display.height }

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutRects {
    pub primary: Rect,
    pub secondary: Rect,
    pub primary_limit: Rect,
    pub secondary_limit: Rect,
    pub divider: Rect,
    pub first_cascade: Rect,
    pub exit_split_points: Vec<i32>,
    pub split_ratio_points: Vec<i32>,
}

impl LayoutRects {
    /// Puts the divider in the middle of the display.
    pub fn init_split_rects(&mut self, display: &Rect, vpr: f32) {
        let divider_width = scaled(DIVIDER_WIDTH, vpr);
        let divider = if is_vertical_display(display) {
            let y = (display.height.saturating_sub(divider_width) as f32 * DEFAULT_SPLIT_RATIO) as i32;
            Rect::new(display.x, display.y + y, display.width, divider_width)
        } else {
            let x = (display.width.saturating_sub(divider_width) as f32 * DEFAULT_SPLIT_RATIO) as i32;
            Rect::new(display.x + x, display.y, divider_width, display.height)
        };
        debug!(%divider, "init divider rect");
        self.set_split_rect(&divider, display);
    }

    /// Derives the primary and secondary rects from a divider position.
    pub fn set_split_rect(&mut self, divider: &Rect, display: &Rect) {
        self.divider = *divider;
        if is_vertical_display(display) {
            self.primary = Rect::new(display.x, display.y, display.width, span(display.y, divider.y));
            let secondary_y = divider.bottom();
            self.secondary =
                Rect::new(display.x, secondary_y, display.width, span(secondary_y, display.bottom()));
        } else {
            self.primary = Rect::new(display.x, display.y, span(display.x, divider.x), display.height);
            let secondary_x = divider.right();
            self.secondary =
                Rect::new(secondary_x, display.y, span(secondary_x, display.right()), display.height);
        }
        trace!(primary = %self.primary, secondary = %self.secondary, "split rects");
    }

    /// Split limit rects start out as the full split rects.
    pub fn reset_split_limit_rects(&mut self) {
        self.primary_limit = self.primary;
        self.secondary_limit = self.secondary;
    }

    /// Shrinks the split limit rects to what is left of the display limit rect.
    pub fn update_split_limit_rects(&mut self, limit: &Rect) {
        self.primary_limit = self.primary_limit.intersection(limit);
        self.secondary_limit = self.secondary_limit.intersection(limit);
        trace!(primary = %self.primary_limit, secondary = %self.secondary_limit, "split limit rects");
    }

    /// Divider coordinate along the split axis for a fraction of the display.
    pub fn split_ratio_point(&self, ratio: f32, display: &Rect) -> i32 {
        if is_vertical_display(display) {
            display.y + (display.height.saturating_sub(self.divider.height) as f32 * ratio) as i32
        } else {
            display.x + (display.width.saturating_sub(self.divider.width) as f32 * ratio) as i32
        }
    }

    pub fn update_split_ratio_points(&mut self, settings: &SplitSettings, display: &Rect) {
        self.exit_split_points = vec![
            self.split_ratio_point(settings.exit_split_start_ratio, display),
            self.split_ratio_point(settings.exit_split_end_ratio, display),
        ];
        self.split_ratio_points =
            settings.split_ratios.iter().map(|r| self.split_ratio_point(*r, display)).collect();
    }

    /// The split ratio point closest to `origin`, or `origin` itself when none is closer
    /// than the larger side of the limit rect.
    pub fn closest_split_ratio_point(&self, origin: i32, limit: &Rect) -> i32 {
        let mut min_diff = limit.width.max(limit.height);
        let mut closest = origin;
        for &point in &self.split_ratio_points {
            let diff = origin.abs_diff(point);
            if diff < min_diff {
                closest = point;
                min_diff = diff;
            }
        }
        closest
    }

    /// The area a window of this mode is laid out in before avoid areas.
    pub fn display_rect_for(&self, mode: WindowMode, display: &Rect) -> Rect {
        match mode {
            WindowMode::SplitPrimary => self.primary,
            WindowMode::SplitSecondary => self.secondary,
            _ => *display,
        }
    }

    /// The area a window of this mode is laid out in once avoid areas are applied.
    pub fn limit_rect_for(&self, mode: WindowMode, limit: &Rect) -> Rect {
        match mode {
            WindowMode::SplitPrimary => self.primary_limit,
            WindowMode::SplitSecondary => self.secondary_limit,
            _ => *limit,
        }
    }
}

/// Keeps the divider entirely within the limit rect along its movement axis.
pub fn limit_divider_move_bounds(rect: &mut Rect, limit: &Rect) {
    if rect.width < rect.height {
        if rect.x < limit.x {
            rect.x = limit.x;
        } else if rect.right() > limit.right() {
            rect.x = limit.right() - rect.width as i32;
        }
    } else if rect.y < limit.y {
        rect.y = limit.y;
    } else if rect.bottom() > limit.bottom() {
        rect.y = limit.bottom() - rect.height as i32;
    }
    trace!(%rect, "limit divider move bounds");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn landscape() -> Rect { Rect::new(0, 0, 2560, 1600) }

    fn portrait() -> Rect { Rect::new(0, 0, 1080, 2340) }

    #[test]
    fn divider_starts_in_the_middle() {
        let mut rects = LayoutRects::default();
        rects.init_split_rects(&landscape(), 2.0);
        assert_eq!(rects.divider, Rect::new(1272, 0, 16, 1600));
        assert_eq!(rects.primary, Rect::new(0, 0, 1272, 1600));
        assert_eq!(rects.secondary, Rect::new(1288, 0, 1272, 1600));

        rects.init_split_rects(&portrait(), 1.0);
        assert_eq!(rects.divider, Rect::new(0, 1166, 1080, 8));
        assert_eq!(rects.primary, Rect::new(0, 0, 1080, 1166));
        assert_eq!(rects.secondary, Rect::new(0, 1174, 1080, 1166));
    }

    #[test]
    fn split_rects_follow_display_offset() {
        let display = Rect::new(2560, 0, 2560, 1600);
        let mut rects = LayoutRects::default();
        rects.init_split_rects(&display, 1.0);
        assert_eq!(rects.primary, Rect::new(2560, 0, 1276, 1600));
        assert_eq!(rects.secondary.right(), display.right());
    }

    #[test]
    fn split_limits_shrink_with_bars() {
        let mut rects = LayoutRects::default();
        rects.init_split_rects(&portrait(), 1.0);
        rects.reset_split_limit_rects();
        rects.update_split_limit_rects(&Rect::new(0, 100, 1080, 2100));
        assert_eq!(rects.primary_limit, Rect::new(0, 100, 1080, 1066));
        assert_eq!(rects.secondary_limit, Rect::new(0, 1174, 1080, 1026));
    }

    #[test]
    fn divider_snaps_to_closest_ratio_point() {
        let mut rects = LayoutRects::default();
        rects.init_split_rects(&landscape(), 1.0);
        let settings = SplitSettings { split_ratios: vec![0.33, 0.5, 0.67], ..SplitSettings::default() };
        rects.update_split_ratio_points(&settings, &landscape());
        assert_eq!(rects.split_ratio_points, vec![842, 1276, 1709]);
        assert_eq!(rects.exit_split_points, vec![255, 2296]);
        assert_eq!(rects.closest_split_ratio_point(1000, &landscape()), 842);
        assert_eq!(rects.closest_split_ratio_point(1500, &landscape()), 1709);
    }

    #[test]
    fn no_ratio_points_keeps_origin() {
        let rects = LayoutRects::default();
        assert_eq!(rects.closest_split_ratio_point(700, &landscape()), 700);
    }

    #[test]
    fn divider_move_bounds() {
        let limit = Rect::new(0, 0, 2560, 1600);
        let mut divider = Rect::new(-20, 0, 8, 1600);
        limit_divider_move_bounds(&mut divider, &limit);
        assert_eq!(divider.x, 0);
        let mut divider = Rect::new(2600, 0, 8, 1600);
        limit_divider_move_bounds(&mut divider, &limit);
        assert_eq!(divider.x, 2552);
        let mut divider = Rect::new(0, 1700, 2560, 8);
        limit_divider_move_bounds(&mut divider, &limit);
        assert_eq!(divider.y, 1592);
    }

    #[test]
    fn mode_selects_rects() {
        let mut rects = LayoutRects::default();
        rects.init_split_rects(&landscape(), 1.0);
        rects.reset_split_limit_rects();
        let limit = Rect::new(0, 50, 2560, 1550);
        assert_eq!(rects.display_rect_for(WindowMode::SplitPrimary, &landscape()), rects.primary);
        assert_eq!(rects.display_rect_for(WindowMode::Floating, &landscape()), landscape());
        assert_eq!(rects.limit_rect_for(WindowMode::SplitSecondary, &limit), rects.secondary_limit);
        assert_eq!(rects.limit_rect_for(WindowMode::Fullscreen, &limit), limit);
    }
}
