//! Overlay visibility shared between the UI thread and the hook thread
//!
//! The UI flips bits as its windows show and hide; the hook thread only
//! ever performs a single atomic load.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Predicate consulted before the screenshot chord fires.
///
/// Called on the hook thread inside the OS input callback, so it must not
/// block or touch the UI event loop.
pub trait VisibilityGuard: Send + Sync {
    fn is_overlay_visible(&self) -> bool;
}

impl<F> VisibilityGuard for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_overlay_visible(&self) -> bool {
        self()
    }
}

/// Windows that block a new screenshot while shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    /// Capture prompt shown right after a screenshot
    CaptureDialog,
    /// Gallery of captured screenshots
    Viewer,
    /// AI response window
    Response,
}

impl Overlay {
    fn bit(self) -> u8 {
        match self {
            Overlay::CaptureDialog => 0b001,
            Overlay::Viewer => 0b010,
            Overlay::Response => 0b100,
        }
    }
}

/// Cloneable handle to the set of currently shown overlays
#[derive(Debug, Clone, Default)]
pub struct OverlayVisibility {
    shown: Arc<AtomicU8>,
}

impl OverlayVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_visible(&self, overlay: Overlay, visible: bool) {
        if visible {
            self.shown.fetch_or(overlay.bit(), Ordering::Release);
        } else {
            self.shown.fetch_and(!overlay.bit(), Ordering::Release);
        }
    }

    pub fn is_visible(&self, overlay: Overlay) -> bool {
        self.shown.load(Ordering::Acquire) & overlay.bit() != 0
    }

    pub fn any_visible(&self) -> bool {
        self.shown.load(Ordering::Acquire) != 0
    }
}

impl VisibilityGuard for OverlayVisibility {
    fn is_overlay_visible(&self) -> bool {
        self.any_visible()
    }
}
