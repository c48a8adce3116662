//! Outbound notifications to window clients.

use std::fmt::Debug;

use crossbeam_channel::Sender;
use serde::Serialize;
use tracing::trace;

use super::avoid_area::{AvoidArea, AvoidAreaType};
use crate::model::{SizeChangeReason, WindowId, WindowMode};
use crate::sys::geometry::Rect;
use crate::sys::transform::Transform;

/// One-way notifications. Implementations must not call back into the engine.
pub trait WindowClient: Debug {
    fn update_window_rect(&self, rect: Rect, deco_status: bool, reason: SizeChangeReason);

    fn update_avoid_area(&self, area: &AvoidArea, ty: AvoidAreaType);

    fn update_zoom_transform(&self, transform: &Transform, zoom_on: bool);

    fn update_window_mode(&self, _mode: WindowMode) {}

    /// Pushes a transform to the window's surface.
    fn transform_surface(&self, _transform: &Transform) {}
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    WindowRect { rect: Rect, deco_status: bool, reason: SizeChangeReason },
    AvoidArea { area: AvoidArea, ty: AvoidAreaType },
    ZoomTransform { transform: Transform, zoom_on: bool },
    WindowMode { mode: WindowMode },
    SurfaceTransform { transform: Transform },
}

/// Forwards every notification over a channel, tagged with the window it was meant for.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    window: WindowId,
    tx: Sender<(WindowId, ClientEvent)>,
}

impl ChannelClient {
    pub fn new(window: WindowId, tx: Sender<(WindowId, ClientEvent)>) -> Self {
        ChannelClient { window, tx }
    }

    fn send(&self, event: ClientEvent) {
        trace!(window = ?self.window, ?event, "client notification");
        // Receiver gone means nobody is listening any more.
        _ = self.tx.send((self.window, event));
    }
}

impl WindowClient for ChannelClient {
    fn update_window_rect(&self, rect: Rect, deco_status: bool, reason: SizeChangeReason) {
        self.send(ClientEvent::WindowRect { rect, deco_status, reason });
    }

    fn update_avoid_area(&self, area: &AvoidArea, ty: AvoidAreaType) {
        self.send(ClientEvent::AvoidArea { area: *area, ty });
    }

    fn update_zoom_transform(&self, transform: &Transform, zoom_on: bool) {
        self.send(ClientEvent::ZoomTransform { transform: *transform, zoom_on });
    }

    fn update_window_mode(&self, mode: WindowMode) { self.send(ClientEvent::WindowMode { mode }); }

    fn transform_surface(&self, transform: &Transform) {
        self.send(ClientEvent::SurfaceTransform { transform: *transform });
    }
}
