use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

slotmap::new_key_type! {
    pub struct WindowId;
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct DisplayId(pub u64);

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "display#{}", self.0)
    }
}

/// Window types grouped into numeric ranges. The range a type falls into decides which
/// layer of the window tree it lives in.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u32)]
pub enum WindowType {
    AppMainWindow = 1,

    Media = 1000,
    AppSubWindow = 1001,
    AppComponent = 1002,

    Wallpaper = 2000,
    Desktop = 2001,

    AppLaunching = 2100,
    DockSlice,
    IncomingCall,
    SearchingBar,
    SystemAlarmWindow,
    InputMethodFloat,
    Float,
    Toast,
    StatusBar,
    Panel,
    Keyguard,
    VolumeOverlay,
    NavigationBar,
    DraggingEffect,
    Pointer,
    LauncherRecent,
    LauncherDock,
    BootAnimation,
    FreezeDisplay,
    VoiceInteraction,
    FloatCamera,
    Placeholder,

    SystemSubWindow = 2500,
}

const APP_MAIN_WINDOW_BASE: u32 = 1;
const APP_MAIN_WINDOW_END: u32 = 2;
const APP_SUB_WINDOW_BASE: u32 = 1000;
const APP_SUB_WINDOW_END: u32 = 1003;
const BELOW_APP_SYSTEM_WINDOW_BASE: u32 = 2000;
const BELOW_APP_SYSTEM_WINDOW_END: u32 = 2002;
const ABOVE_APP_SYSTEM_WINDOW_BASE: u32 = 2100;
const ABOVE_APP_SYSTEM_WINDOW_END: u32 = 2122;
const SYSTEM_SUB_WINDOW_BASE: u32 = 2500;
const SYSTEM_SUB_WINDOW_END: u32 = 2501;

impl WindowType {
    fn raw(self) -> u32 { u32::from(self) }

    pub fn is_main_window(self) -> bool {
        (APP_MAIN_WINDOW_BASE..APP_MAIN_WINDOW_END).contains(&self.raw())
    }

    pub fn is_sub_window(self) -> bool {
        (APP_SUB_WINDOW_BASE..APP_SUB_WINDOW_END).contains(&self.raw())
    }

    pub fn is_app_window(self) -> bool { self.is_main_window() || self.is_sub_window() }

    pub fn is_below_system_window(self) -> bool {
        (BELOW_APP_SYSTEM_WINDOW_BASE..BELOW_APP_SYSTEM_WINDOW_END).contains(&self.raw())
    }

    pub fn is_above_system_window(self) -> bool {
        (ABOVE_APP_SYSTEM_WINDOW_BASE..ABOVE_APP_SYSTEM_WINDOW_END).contains(&self.raw())
    }

    pub fn is_system_sub_window(self) -> bool {
        (SYSTEM_SUB_WINDOW_BASE..SYSTEM_SUB_WINDOW_END).contains(&self.raw())
    }

    pub fn is_system_window(self) -> bool {
        self.is_below_system_window() || self.is_above_system_window() || self.is_system_sub_window()
    }

    /// Sub windows of either kind hang under a parent instead of a layer root.
    pub fn has_parent(self) -> bool { self.is_sub_window() || self.is_system_sub_window() }

    pub fn is_system_bar_window(self) -> bool {
        matches!(self, WindowType::StatusBar | WindowType::NavigationBar)
    }

    /// Windows whose rect is carved out of the windows they overlap.
    pub fn is_overlay_window(self) -> bool {
        self.is_system_bar_window() || self == WindowType::InputMethodFloat
    }

    /// Windows whose layout shrinks the display limit rect.
    pub fn is_avoid_producer(self) -> bool { self.is_system_bar_window() }

    pub fn is_app_floating_window(self) -> bool {
        matches!(self, WindowType::Float | WindowType::FloatCamera)
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Fullscreen,
    SplitPrimary,
    SplitSecondary,
    Floating,
    Pip,
}

impl WindowMode {
    pub fn is_split_mode(self) -> bool {
        matches!(self, WindowMode::SplitPrimary | WindowMode::SplitSecondary)
    }

    pub fn is_floating(self) -> bool { self == WindowMode::Floating }

    /// Modes that receive system, cutout and keyboard avoid areas.
    pub fn receives_avoid_area(self) -> bool {
        self == WindowMode::Fullscreen || self.is_split_mode()
    }

    pub fn support_flag(self) -> WindowModeSupport {
        match self {
            WindowMode::Fullscreen => WindowModeSupport::FULLSCREEN,
            WindowMode::SplitPrimary => WindowModeSupport::SPLIT_PRIMARY,
            WindowMode::SplitSecondary => WindowModeSupport::SPLIT_SECONDARY,
            WindowMode::Floating => WindowModeSupport::FLOATING,
            WindowMode::Pip => WindowModeSupport::PIP,
        }
    }
}

pub fn is_main_floating_window(ty: WindowType, mode: WindowMode) -> bool {
    ty.is_main_window() && mode.is_floating()
}

pub fn is_main_fullscreen_window(ty: WindowType, mode: WindowMode) -> bool {
    ty.is_main_window() && mode == WindowMode::Fullscreen
}

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        const NEED_AVOID = 1;
        const PARENT_LIMIT = 1 << 1;
        const SHOW_WHEN_LOCKED = 1 << 2;
        const FORBID_SPLIT_MOVE = 1 << 3;
        const WATER_MARK = 1 << 4;
    }
}

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowModeSupport: u32 {
        const FULLSCREEN = 1;
        const FLOATING = 1 << 1;
        const SPLIT_PRIMARY = 1 << 2;
        const SPLIT_SECONDARY = 1 << 3;
        const PIP = 1 << 4;
    }
}

impl Default for WindowModeSupport {
    fn default() -> Self { WindowModeSupport::all() }
}

impl WindowModeSupport {
    pub fn supports(self, mode: WindowMode) -> bool { self.contains(mode.support_flag()) }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DragType {
    #[default]
    Undefined,
    LeftOrRight,
    BottomOrTop,
    LeftTopCorner,
    RightTopCorner,
}

/// Why a window's rect is being recomputed. Consumed by the layout pass and reported to
/// the client with the new rect.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizeChangeReason {
    #[default]
    Undefined,
    Maximize,
    Recover,
    Rotation,
    Drag,
    DragStart,
    DragEnd,
    Resize,
    Move,
    Hide,
    Transform,
}

impl SizeChangeReason {
    /// Move is sticky across layout passes so a continuing move keeps its semantics.
    pub fn survives_layout(self) -> bool { self == SizeChangeReason::Move }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WindowSizeLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_ratio: f32,
    pub min_ratio: f32,
}

impl Default for WindowSizeLimits {
    fn default() -> Self {
        WindowSizeLimits {
            max_width: u32::MAX,
            max_height: u32::MAX,
            min_width: 0,
            min_height: 0,
            max_ratio: f32::MAX,
            min_ratio: 0.0,
        }
    }
}

impl WindowSizeLimits {
    pub fn is_frozen(&self) -> bool {
        self.max_width == self.min_width && self.max_height == self.min_height
    }

    pub fn is_satisfied_by(&self, rect: &crate::sys::geometry::Rect) -> bool {
        if rect.height == 0 {
            return false;
        }
        let ratio = rect.width as f32 / rect.height as f32;
        (self.min_width..=self.max_width).contains(&rect.width)
            && (self.min_height..=self.max_height).contains(&rect.height)
            && self.min_ratio <= ratio
            && ratio <= self.max_ratio
    }
}
