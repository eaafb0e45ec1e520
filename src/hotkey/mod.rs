//! Hotkey module for global keyboard event capture
//!
//! Installs a system-wide keyboard hook on a dedicated thread and runs
//! every key event through the shortcut state machine before the rest of
//! the system sees it.

mod hook;
pub mod injected;
mod keys;
mod listener;
#[cfg(target_os = "windows")]
pub mod windows;

pub use hook::{Decision, KeyEvent, KeyEventHook};
pub use injected::{EventInjector, InjectedHook};
pub use keys::{codes, HeldKeys, KeyCode, ModifierRole, NavKey};
pub use listener::{
    HookBackend, HookError, HookThreadRunner, QuitSignal, RunnerState, RunnerStatus,
    DEFAULT_JOIN_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
};

/// The hook backend for the current platform
#[cfg(target_os = "windows")]
pub fn platform_backend() -> windows::WindowsHook {
    windows::WindowsHook::new()
}

/// No system-wide hook on this platform; events only arrive through the
/// returned backend's injector.
#[cfg(not(target_os = "windows"))]
pub fn platform_backend() -> InjectedHook {
    tracing::warn!("no system-wide keyboard hook on this platform, using injected backend");
    InjectedHook::new().0
}
