pub mod tree;
pub mod window;

pub use tree::{DisplayLayers, RootLayer, WindowNode, WindowTree};
pub use window::{
    DisplayId, DragType, SizeChangeReason, WindowFlags, WindowId, WindowMode, WindowModeSupport,
    WindowSizeLimits, WindowType, is_main_floating_window, is_main_fullscreen_window,
};
