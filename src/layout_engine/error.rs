use thiserror::Error;

use crate::model::{DisplayId, WindowId};
use crate::sys::geometry::Rect;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("unknown display {0}")]
    UnknownDisplay(DisplayId),
    #[error("display {0} is already registered")]
    DisplayExists(DisplayId),
    #[error("unknown window {0:?}")]
    UnknownWindow(WindowId),
    #[error("display map has {got} entries, expected {expected}")]
    DisplayCountMismatch { expected: usize, got: usize },
    #[error("display {found} does not match changed display {changed}")]
    WrongDisplay { changed: DisplayId, found: DisplayId },
    #[error("destroyed display {0} is still registered")]
    DisplayStillPresent(DisplayId),
    #[error("overlay {window:?} recorded={recorded} but adding={adding}")]
    OverlayStateMismatch { window: WindowId, adding: bool, recorded: bool },
    #[error("window {0:?} is not an overlay window")]
    NotOverlay(WindowId),
    #[error("window {0:?} is not listening for avoid areas")]
    NotListening(WindowId),
    #[error("window change processing is forbidden")]
    ForbiddenWindowChange,
}

/// A touch hot area request was partially rejected. `accepted` holds the areas that
/// were computed before the failing request or around out-of-window requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{rejected} requested hot area(s) rejected, {} accepted", .accepted.len())]
pub struct HotAreaError {
    pub accepted: Vec<Rect>,
    pub rejected: usize,
}
