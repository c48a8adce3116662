//! Registry of display geometry for one display group.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::LayoutError;
use crate::common::collections::BTreeMap;
use crate::model::DisplayId;
use crate::sys::geometry::Rect;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DisplayInfo {
    pub id: DisplayId,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "default_vpr")]
    pub virtual_pixel_ratio: f32,
    /// Waterfall screens fold their curved edges away; windows are kept off them.
    #[serde(default)]
    pub waterfall_compression: bool,
}

fn default_vpr() -> f32 { 1.0 }

impl DisplayInfo {
    pub fn new(id: DisplayId, rect: Rect, virtual_pixel_ratio: f32) -> Self {
        DisplayInfo {
            id,
            offset_x: rect.x,
            offset_y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation: Rotation::Rotation0,
            virtual_pixel_ratio,
            waterfall_compression: false,
        }
    }

    pub fn rect(&self) -> Rect { Rect::new(self.offset_x, self.offset_y, self.width, self.height) }

    fn set_rect(&mut self, rect: Rect) {
        self.offset_x = rect.x;
        self.offset_y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

#[derive(Debug, Clone)]
pub struct DisplayGroupInfo {
    default_display_id: DisplayId,
    displays: BTreeMap<DisplayId, DisplayInfo>,
    left_display_id: DisplayId,
    right_display_id: DisplayId,
}

impl DisplayGroupInfo {
    pub fn new(default_display_id: DisplayId) -> Self {
        DisplayGroupInfo {
            default_display_id,
            displays: BTreeMap::new(),
            left_display_id: default_display_id,
            right_display_id: default_display_id,
        }
    }

    pub fn default_display_id(&self) -> DisplayId { self.default_display_id }

    pub fn left_display_id(&self) -> DisplayId { self.left_display_id }

    pub fn right_display_id(&self) -> DisplayId { self.right_display_id }

    pub fn len(&self) -> usize { self.displays.len() }

    pub fn is_empty(&self) -> bool { self.displays.is_empty() }

    pub fn contains(&self, id: DisplayId) -> bool { self.displays.contains_key(&id) }

    pub fn display_ids(&self) -> impl Iterator<Item = DisplayId> + '_ {
        self.displays.keys().copied()
    }

    pub fn add_display_info(&mut self, info: DisplayInfo) -> Result<(), LayoutError> {
        if self.displays.contains_key(&info.id) {
            warn!(display = %info.id, "display already registered");
            return Err(LayoutError::DisplayExists(info.id));
        }
        debug!(display = %info.id, rect = %info.rect(), "add display");
        self.displays.insert(info.id, info);
        Ok(())
    }

    pub fn remove_display_info(&mut self, id: DisplayId) {
        if self.displays.remove(&id).is_some() {
            debug!(display = %id, "remove display");
        }
    }

    fn info_mut(&mut self, id: DisplayId) -> Result<&mut DisplayInfo, LayoutError> {
        self.displays.get_mut(&id).ok_or_else(|| {
            warn!(display = %id, "unknown display");
            LayoutError::UnknownDisplay(id)
        })
    }

    pub fn set_display_rect(&mut self, id: DisplayId, rect: Rect) -> Result<(), LayoutError> {
        self.info_mut(id)?.set_rect(rect);
        Ok(())
    }

    pub fn set_display_rotation(&mut self, id: DisplayId, rotation: Rotation) -> Result<(), LayoutError> {
        self.info_mut(id)?.rotation = rotation;
        Ok(())
    }

    pub fn set_display_virtual_pixel_ratio(&mut self, id: DisplayId, vpr: f32) -> Result<(), LayoutError> {
        self.info_mut(id)?.virtual_pixel_ratio = vpr;
        Ok(())
    }

    pub fn display_info(&self, id: DisplayId) -> Option<&DisplayInfo> { self.displays.get(&id) }

    /// The empty rect for unknown displays.
    pub fn display_rect(&self, id: DisplayId) -> Rect {
        self.displays.get(&id).map(DisplayInfo::rect).unwrap_or_default()
    }

    pub fn display_rotation(&self, id: DisplayId) -> Rotation {
        self.displays.get(&id).map(|d| d.rotation).unwrap_or_default()
    }

    /// 1.0 for unknown displays.
    pub fn virtual_pixel_ratio(&self, id: DisplayId) -> f32 {
        self.displays.get(&id).map(|d| d.virtual_pixel_ratio).unwrap_or(1.0)
    }

    pub fn all_display_rects(&self) -> BTreeMap<DisplayId, Rect> {
        self.displays.iter().map(|(id, d)| (*id, d.rect())).collect()
    }

    /// Leftmost and rightmost display by x offset. Ties go to the lowest display id.
    pub fn update_left_and_right_display_id(&mut self) {
        let mut iter = self.displays.values();
        let Some(first) = iter.next() else { return };
        let (mut left, mut right) = (first, first);
        for d in iter {
            if d.offset_x < left.offset_x {
                left = d;
            }
            if d.offset_x > right.offset_x {
                right = d;
            }
        }
        self.left_display_id = left.id;
        self.right_display_id = right.id;
        debug!(left = %self.left_display_id, right = %self.right_display_id, "update left/right display");
    }
}
