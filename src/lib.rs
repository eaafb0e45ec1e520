//! blash-hotkeys: global keyboard shortcut engine for the blash overlay
//!
//! Captures every key event system-wide on a dedicated hook thread, tracks
//! which modifier and navigation keys are held, and turns configured
//! combinations into [`Command`]s for the UI thread:
//! - Ctrl+Alt: take a screenshot (unless an overlay is already showing)
//! - mode key + arrows: move the overlay
//! - mode key + configured keys: toggle visibility, quit
//!
//! Consumed keys are suppressed so other applications never see them.
//! Window painting, screen capture and AI calls live in the UI shell and
//! are reached only through [`CommandSink`].

pub mod config;
pub mod dispatch;
pub mod events;
pub mod hotkey;
pub mod lifecycle;
pub mod overlay;
pub mod state;

pub use config::ShortcutConfig;
pub use dispatch::{CommandDispatcher, CommandReceiver, CommandSink};
pub use events::Command;
pub use hotkey::{HookThreadRunner, RunnerState};
pub use overlay::{Overlay, OverlayVisibility, VisibilityGuard};
