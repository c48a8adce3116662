use crate::common::collections::HashMap;
use crate::model::WindowType;

/// Stacking priority of each window type; lower sits lower in its layer.
#[derive(Debug, Clone)]
pub struct WindowZorderPolicy {
    priorities: HashMap<WindowType, i32>,
}

const APP_MAIN_BASELINE: i32 = 0;

const PRIORITIES: &[(WindowType, i32)] = &[
    // below app
    (WindowType::Wallpaper, 0),
    (WindowType::Desktop, 1),
    // app
    (WindowType::AppMainWindow, 0),
    (WindowType::Media, -1),
    (WindowType::AppSubWindow, 1),
    (WindowType::AppComponent, 1),
    (WindowType::AppLaunching, 101),
    (WindowType::DockSlice, 0),
    (WindowType::Placeholder, 0),
    // above app
    (WindowType::LauncherRecent, 102),
    (WindowType::LauncherDock, 103),
    (WindowType::SearchingBar, 104),
    (WindowType::VoiceInteraction, 105),
    (WindowType::Float, 106),
    (WindowType::FloatCamera, 107),
    (WindowType::Toast, 108),
    (WindowType::StatusBar, 109),
    (WindowType::Panel, 110),
    (WindowType::VolumeOverlay, 111),
    (WindowType::NavigationBar, 112),
    (WindowType::InputMethodFloat, 113),
    (WindowType::Keyguard, 115),
    (WindowType::SystemAlarmWindow, 116),
    (WindowType::IncomingCall, 117),
    (WindowType::BootAnimation, 119),
    (WindowType::Pointer, 120),
    (WindowType::FreezeDisplay, 121),
    (WindowType::DraggingEffect, 122),
];

impl Default for WindowZorderPolicy {
    fn default() -> Self {
        WindowZorderPolicy { priorities: PRIORITIES.iter().copied().collect() }
    }
}

impl WindowZorderPolicy {
    pub fn new() -> Self { Self::default() }

    /// Types missing from the table stack like an app main window.
    pub fn window_priority(&self, ty: WindowType) -> i32 {
        self.priorities.get(&ty).copied().unwrap_or(APP_MAIN_BASELINE)
    }
}
