//! Integer rectangles in device pixels and the edge classification helpers the
//! layout and avoid-area code share.

use serde::{Deserialize, Serialize};

/// A rectangle in device pixels. The all-zero rect is the "none" sentinel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const EMPTY: Rect = Rect { x: 0, y: 0, width: 0, height: 0 };

    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }

    /// True only for the all-zero sentinel.
    pub fn is_empty(&self) -> bool { *self == Rect::EMPTY }

    pub fn has_area(&self) -> bool { self.width > 0 && self.height > 0 }

    pub fn is_landscape(&self) -> bool { self.width > self.height }

    /// Saturates instead of wrapping for rects reaching past `i32::MAX`.
    pub fn right(&self) -> i32 { self.x.saturating_add(clamp_len(self.width)) }

    pub fn bottom(&self) -> i32 { self.y.saturating_add(clamp_len(self.height)) }

    pub fn area(&self) -> u64 { self.width as u64 * self.height as u64 }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy), ..*self }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Clipped intersection. Non-overlapping rects give a zero sized rect at the
    /// clipped origin, not the sentinel.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, span(x, right), span(y, bottom))
    }

    /// Overlap of two rects expressed relative to `(offset_x, offset_y)`; the
    /// sentinel when they do not overlap.
    pub fn overlap(&self, other: &Rect, offset_x: i32, offset_y: i32) -> Rect {
        let x_begin = self.x.max(other.x);
        let x_end = self.right().min(other.right());
        let y_begin = self.y.max(other.y);
        let y_end = self.bottom().min(other.bottom());
        if y_begin >= y_end || x_begin >= x_end {
            return Rect::EMPTY;
        }
        Rect::new(
            x_begin - offset_x,
            y_begin - offset_y,
            (x_end - x_begin) as u32,
            (y_end - y_begin) as u32,
        )
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, span(x, right), span(y, bottom))
    }

    /// Grows the rect by `dx` on the left and right and `dy` on the top and bottom.
    pub fn inflate(&self, dx: u32, dy: u32) -> Rect {
        Rect::new(
            self.x - dx as i32,
            self.y - dy as i32,
            self.width.saturating_add(dx.saturating_mul(2)),
            self.height.saturating_add(dy.saturating_mul(2)),
        )
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.width, self.height)
    }
}

fn clamp_len(len: u32) -> i32 { i32::try_from(len).unwrap_or(i32::MAX) }

/// Length from `start` to `end`, zero when the span is inverted.
pub fn span(start: i32, end: i32) -> u32 { (i64::from(end) - i64::from(start)).clamp(0, i64::from(u32::MAX)) as u32 }

/// Scales a density independent length by a virtual pixel ratio, truncating.
pub fn scaled(value: u32, vpr: f32) -> u32 { (value as f32 * vpr) as u32 }

/// Which display edge a rect hugs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AvoidPosType {
    Top,
    Bottom,
    Left,
    Right,
    Unknown,
}

impl AvoidPosType {
    /// Classifies a bar by comparing it against the full display rect: full width
    /// bars are top or bottom, full height bars are left or right.
    pub fn of_bar(rect: &Rect, display: &Rect) -> AvoidPosType {
        if rect.width == display.width {
            if rect.y == display.y { AvoidPosType::Top } else { AvoidPosType::Bottom }
        } else if rect.height == display.height {
            if rect.x == display.x { AvoidPosType::Left } else { AvoidPosType::Right }
        } else {
            AvoidPosType::Unknown
        }
    }

    /// Classifies an overlay rect (relative to the host window) with the
    /// proportional diagonal heuristic over the host window's size.
    pub fn of_overlay(window: &Rect, overlay: &Rect) -> AvoidPosType {
        if window.width == 0 || window.height == 0 {
            return AvoidPosType::Unknown;
        }
        let center_x = (overlay.x as u32).wrapping_add(overlay.width >> 1);
        let center_y = (overlay.y as u32).wrapping_add(overlay.height >> 1);
        let slope = window.height as f32 / window.width as f32;
        let res1 = center_y as f32 - slope * center_x as f32;
        let res2 = center_y as f32 + slope * center_x as f32 - window.height as f32;
        if res1 < 0.0 {
            if res2 < 0.0 {
                return AvoidPosType::Top;
            }
            return AvoidPosType::Right;
        }
        if res2 < 0.0 {
            return AvoidPosType::Left;
        }
        AvoidPosType::Bottom
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f32, other: Self) -> bool;
}

impl IsWithin for f32 {
    fn is_within(&self, how_much: f32, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait NearZero {
    fn near_zero(&self) -> bool;
}

impl NearZero for f32 {
    fn near_zero(&self) -> bool { self.is_within(0.001, 0.0) }
}
