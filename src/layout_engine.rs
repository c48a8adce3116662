pub mod avoid_area;
pub mod client;
pub mod display_group;
pub mod engine;
pub mod error;
pub mod floating;
pub mod hot_zone;
pub mod layout_policy;
pub mod split;
pub mod zoom;
pub mod zorder;

pub use avoid_area::{
    AvoidArea, AvoidAreaController, AvoidAreaType, AvoidControlType, CutoutSource, NoCutout,
    OnDisplay, WindowFilter,
};
pub use client::{ChannelClient, ClientEvent, WindowClient};
pub use display_group::{DisplayGroupInfo, DisplayInfo, Rotation};
pub use engine::{EventResponse, LayoutCommand, LayoutEvent, WindowLayoutEngine};
pub use error::{HotAreaError, LayoutError};
pub use layout_policy::WindowLayoutPolicy;
pub use split::LayoutRects;
pub use zoom::{DisplayZoomController, DisplayZoomInfo};
pub use zorder::WindowZorderPolicy;

#[cfg(test)]
mod tests;
