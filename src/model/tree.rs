//! Arena of window nodes grouped per display into three stacking layers.
//!
//! Root windows live in the below, app or above layer of their display depending on their
//! type. Sub windows hang under their parent. Siblings are kept sorted by z-order priority,
//! lowest first.

use std::rc::Rc;

use glam::Mat4;
use slotmap::SlotMap;
use tracing::{debug, warn};

use super::window::{
    DisplayId, DragType, SizeChangeReason, WindowFlags, WindowId, WindowMode, WindowModeSupport,
    WindowSizeLimits, WindowType, is_main_floating_window,
};
use crate::common::collections::BTreeMap;
use crate::layout_engine::client::WindowClient;
use crate::sys::geometry::Rect;
use crate::sys::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootLayer {
    Below,
    App,
    Above,
}

impl RootLayer {
    pub fn for_type(ty: WindowType) -> RootLayer {
        if ty.is_below_system_window() {
            RootLayer::Below
        } else if ty.is_above_system_window() {
            RootLayer::Above
        } else {
            RootLayer::App
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DisplayLayers {
    pub below: Vec<WindowId>,
    pub app: Vec<WindowId>,
    pub above: Vec<WindowId>,
}

impl DisplayLayers {
    pub fn get(&self, layer: RootLayer) -> &[WindowId] {
        match layer {
            RootLayer::Below => &self.below,
            RootLayer::App => &self.app,
            RootLayer::Above => &self.above,
        }
    }

    fn get_mut(&mut self, layer: RootLayer) -> &mut Vec<WindowId> {
        match layer {
            RootLayer::Below => &mut self.below,
            RootLayer::App => &mut self.app,
            RootLayer::Above => &mut self.above,
        }
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.below.iter().chain(&self.app).chain(&self.above).copied()
    }
}

#[derive(Debug, Clone)]
pub struct WindowNode {
    pub name: String,
    pub ty: WindowType,
    pub mode: WindowMode,
    pub display_id: DisplayId,
    pub parent: Option<WindowId>,
    pub children: Vec<WindowId>,
    pub priority: i32,
    pub flags: WindowFlags,
    pub mode_support: WindowModeSupport,

    pub request_rect: Rect,
    pub window_rect: Rect,
    /// Rect at the start of a drag, used to keep the aspect ratio of stretchable windows.
    pub origin_rect: Rect,
    pub decor_enable: bool,
    pub deco_status: bool,
    pub stretchable: bool,
    pub drag_type: DragType,
    pub reason: SizeChangeReason,

    /// Limits declared by the app, in density independent pixels.
    pub size_limits: WindowSizeLimits,
    /// Effective limits after merging with the system limits, in device pixels.
    pub updated_size_limits: WindowSizeLimits,

    pub showing_on_multi_displays: bool,
    pub visible: bool,
    pub calling_window: Option<WindowId>,

    /// Touch hot areas requested by the app, relative to the window origin.
    pub requested_hot_areas: Vec<Rect>,
    pub entire_touch_hot_area: Rect,
    pub entire_pointer_hot_area: Rect,
    pub touch_hot_areas: Vec<Rect>,
    pub pointer_hot_areas: Vec<Rect>,

    /// Animation transform.
    pub transform: Transform,
    pub zoom_transform: Transform,
    pub zoom_on: bool,
    pub animating: bool,

    pub client: Option<Rc<dyn WindowClient>>,
}

impl WindowNode {
    pub fn new(name: impl Into<String>, ty: WindowType, mode: WindowMode, display: DisplayId) -> Self {
        WindowNode {
            name: name.into(),
            ty,
            mode,
            display_id: display,
            parent: None,
            children: Vec::new(),
            priority: 0,
            flags: WindowFlags::empty(),
            mode_support: WindowModeSupport::default(),
            request_rect: Rect::EMPTY,
            window_rect: Rect::EMPTY,
            origin_rect: Rect::EMPTY,
            decor_enable: false,
            deco_status: false,
            stretchable: false,
            drag_type: DragType::Undefined,
            reason: SizeChangeReason::Undefined,
            size_limits: WindowSizeLimits::default(),
            updated_size_limits: WindowSizeLimits::default(),
            showing_on_multi_displays: false,
            visible: true,
            calling_window: None,
            requested_hot_areas: Vec::new(),
            entire_touch_hot_area: Rect::EMPTY,
            entire_pointer_hot_area: Rect::EMPTY,
            touch_hot_areas: Vec::new(),
            pointer_hot_areas: Vec::new(),
            transform: Transform::IDENTITY,
            zoom_transform: Transform::IDENTITY,
            zoom_on: false,
            animating: false,
            client: None,
        }
    }

    pub fn with_request_rect(mut self, rect: Rect) -> Self {
        self.request_rect = rect;
        self
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_parent(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_client(mut self, client: Rc<dyn WindowClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn is_main_floating(&self) -> bool { is_main_floating_window(self.ty, self.mode) }

    pub fn is_split_mode(&self) -> bool { self.mode.is_split_mode() }

    pub fn needs_transform(&self) -> bool { self.zoom_on || !self.transform.is_identity() }

    /// Screen matrix of the transform that currently applies to the window.
    pub fn transform_matrix(&self) -> Mat4 {
        let trans = if self.zoom_on { &self.zoom_transform } else { &self.transform };
        trans.full_matrix(&self.window_rect)
    }
}

#[derive(Debug, Default)]
pub struct WindowTree {
    nodes: SlotMap<WindowId, WindowNode>,
    displays: BTreeMap<DisplayId, DisplayLayers>,
    focused: Option<WindowId>,
}

impl WindowTree {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, id: WindowId) -> Option<&WindowNode> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowNode> { self.nodes.get_mut(id) }

    pub fn contains(&self, id: WindowId) -> bool { self.nodes.contains_key(id) }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &WindowNode)> { self.nodes.iter() }

    pub fn ensure_display(&mut self, display: DisplayId) -> &mut DisplayLayers {
        self.displays.entry(display).or_default()
    }

    pub fn display_ids(&self) -> impl Iterator<Item = DisplayId> + '_ {
        self.displays.keys().copied()
    }

    pub fn layers(&self, display: DisplayId) -> Option<&DisplayLayers> { self.displays.get(&display) }

    pub fn layer(&self, display: DisplayId, layer: RootLayer) -> &[WindowId] {
        self.displays.get(&display).map(|l| l.get(layer)).unwrap_or_default()
    }

    pub fn focused(&self) -> Option<WindowId> { self.focused }

    pub fn set_focused(&mut self, id: Option<WindowId>) { self.focused = id; }

    /// Inserts a node as a child of its parent when it names one, otherwise as a root
    /// of its display layer. Siblings stay sorted by priority; equal priorities keep
    /// insertion order.
    pub fn insert(&mut self, mut node: WindowNode) -> WindowId {
        let parent = node.parent.filter(|p| self.nodes.contains_key(*p));
        if let Some(p) = parent {
            node.display_id = self.nodes[p].display_id;
        } else if node.parent.is_some() {
            warn!(name = %node.name, "parent window is gone, inserting as root");
            node.parent = None;
        }
        let display_id = node.display_id;
        let priority = node.priority;
        let layer = RootLayer::for_type(node.ty);
        let id = self.nodes.insert(node);
        match parent {
            Some(p) => {
                let mut siblings = std::mem::take(&mut self.nodes[p].children);
                self.insert_sorted(&mut siblings, id, priority);
                self.nodes[p].children = siblings;
            }
            None => {
                let mut roots = std::mem::take(self.ensure_display(display_id).get_mut(layer));
                self.insert_sorted(&mut roots, id, priority);
                *self.ensure_display(display_id).get_mut(layer) = roots;
            }
        }
        debug!(?id, ?display_id, ?layer, priority, "inserted window");
        id
    }

    fn insert_sorted(&self, list: &mut Vec<WindowId>, id: WindowId, priority: i32) {
        let pos = list
            .iter()
            .position(|w| self.nodes.get(*w).is_some_and(|n| n.priority > priority))
            .unwrap_or(list.len());
        list.insert(pos, id);
    }

    /// Removes a window with its whole subtree. Returns the removed root node.
    pub fn remove(&mut self, id: WindowId) -> Option<WindowNode> {
        let node = self.nodes.get(id)?;
        let parent = node.parent;
        let display = node.display_id;
        match parent {
            Some(p) => {
                if let Some(parent) = self.nodes.get_mut(p) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => {
                if let Some(layers) = self.displays.get_mut(&display) {
                    layers.below.retain(|w| *w != id);
                    layers.app.retain(|w| *w != id);
                    layers.above.retain(|w| *w != id);
                }
            }
        }
        let mut removed = None;
        for w in self.subtree(id) {
            if self.focused == Some(w) {
                self.focused = None;
            }
            let node = self.nodes.remove(w);
            if w == id {
                removed = node;
            }
        }
        removed
    }

    /// Drops a display's layers together with every window on it.
    pub fn remove_display(&mut self, display: DisplayId) -> Vec<WindowId> {
        let Some(layers) = self.displays.remove(&display) else {
            return Vec::new();
        };
        let roots: Vec<_> = layers.iter().collect();
        let mut removed = Vec::new();
        for root in roots {
            for w in self.subtree(root) {
                self.nodes.remove(w);
                removed.push(w);
            }
        }
        if self.focused.is_some_and(|f| removed.contains(&f)) {
            self.focused = None;
        }
        removed
    }

    /// The node followed by its descendants, depth first.
    pub fn subtree(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(w) = stack.pop() {
            let Some(node) = self.nodes.get(w) else { continue };
            out.push(w);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Every window of a display from the topmost down. Children with a negative
    /// priority sit directly below their parent, the others directly above it.
    pub fn traverse_container(&self, display: DisplayId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let Some(layers) = self.displays.get(&display) else {
            return out;
        };
        for root in layers.iter() {
            let Some(node) = self.nodes.get(root) else { continue };
            let split = node
                .children
                .iter()
                .position(|c| self.nodes.get(*c).is_none_or(|n| n.priority >= 0))
                .unwrap_or(node.children.len());
            out.extend_from_slice(&node.children[..split]);
            out.push(root);
            out.extend_from_slice(&node.children[split..]);
        }
        out.reverse();
        out
    }

    pub fn desktop_window(&self, display: DisplayId) -> Option<WindowId> {
        self.layer(display, RootLayer::Below)
            .iter()
            .copied()
            .find(|w| self.nodes.get(*w).is_some_and(|n| n.ty == WindowType::Desktop))
    }

    /// The visible split-screen pair of a display together with its divider.
    pub fn split_screen_windows(&self, display: DisplayId) -> Vec<WindowId> {
        let Some(layers) = self.displays.get(&display) else {
            return Vec::new();
        };
        layers
            .iter()
            .filter(|w| {
                self.nodes.get(*w).is_some_and(|n| {
                    n.visible && (n.is_split_mode() || n.ty == WindowType::DockSlice)
                })
            })
            .collect()
    }

    pub fn draw_tree(&self, display_id: DisplayId) -> String {
        let Some(layers) = self.displays.get(&display_id) else {
            return String::new();
        };
        let layer_tree = |name: &str, ids: &[WindowId]| {
            let children: Vec<_> = ids.iter().map(|w| self.ascii_tree(*w)).collect();
            if children.is_empty() {
                ascii_tree::Tree::Leaf(vec![name.to_string()])
            } else {
                ascii_tree::Tree::Node(name.to_string(), children)
            }
        };
        let tree = ascii_tree::Tree::Node(
            display_id.to_string(),
            vec![
                layer_tree("above", &layers.above),
                layer_tree("app", &layers.app),
                layer_tree("below", &layers.below),
            ],
        );
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!(%display_id, "failed to render window tree");
        }
        out
    }

    fn ascii_tree(&self, id: WindowId) -> ascii_tree::Tree {
        let Some(node) = self.nodes.get(id) else {
            return ascii_tree::Tree::Leaf(vec![format!("{id:?} <gone>")]);
        };
        let hidden = if node.visible { "" } else { " (hidden)" };
        let desc = format!("{id:?} {} {} {:?} {}{hidden}", node.name, node.ty, node.mode, node.window_rect);
        let children: Vec<_> = node.children.iter().map(|c| self.ascii_tree(*c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}
