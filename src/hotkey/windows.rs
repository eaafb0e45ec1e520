//! Windows low-level keyboard hook backend.
//!
//! Installs `WH_KEYBOARD_LL` on the hook thread and runs a standard
//! `GetMessageW` pump there. The hook procedure is a plain `extern "system"`
//! function, so the [`KeyEventHook`] it drives lives in a thread-local that
//! only the hook thread ever touches.
//!
//! # Safety
//!
//! `unsafe` is used only for Win32 FFI calls; each block carries a
//! `// SAFETY:` note.

#![cfg(target_os = "windows")]

use std::cell::{Cell, RefCell};

use tracing::{debug, trace};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
    MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
    WM_USER,
};

use super::hook::{Decision, KeyEvent, KeyEventHook};
use super::keys::KeyCode;
use super::listener::{HookBackend, HookError, QuitSignal};

thread_local! {
    /// Evaluator reached from the hook procedure; set only on the hook thread
    static ACTIVE_HOOK: RefCell<Option<KeyEventHook>> = const { RefCell::new(None) };

    /// Handle returned by `SetWindowsHookExW`
    static HOOK_HANDLE: Cell<Option<HHOOK>> = const { Cell::new(None) };
}

/// `WH_KEYBOARD_LL` backend
#[derive(Debug, Default)]
pub struct WindowsHook;

impl WindowsHook {
    pub fn new() -> Self {
        Self
    }
}

impl HookBackend for WindowsHook {
    fn install(&mut self, hook: KeyEventHook) -> Result<QuitSignal, HookError> {
        ACTIVE_HOOK.with(|slot| *slot.borrow_mut() = Some(hook));

        // Force creation of this thread's message queue so a quit posted
        // before the first GetMessageW call is not lost.
        let mut msg = MSG::default();
        // SAFETY: msg is a valid out-pointer; no window filter.
        let _ = unsafe { PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE) };

        // SAFETY: keyboard_hook_proc matches HOOKPROC; a null module handle is
        // allowed for low-level hooks living in the current process.
        let handle = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) }
            .map_err(|e| {
                ACTIVE_HOOK.with(|slot| *slot.borrow_mut() = None);
                HookError::InstallFailed(e.to_string())
            })?;
        HOOK_HANDLE.with(|cell| cell.set(Some(handle)));

        // SAFETY: no preconditions.
        let thread_id = unsafe { GetCurrentThreadId() };
        debug!(thread_id, "WH_KEYBOARD_LL installed");

        Ok(QuitSignal::new(move || {
            // SAFETY: posting to a thread id is valid from any thread; fails
            // harmlessly if the thread is gone.
            unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
                .map_err(|e| HookError::QuitSignal(e.to_string()))
        }))
    }

    fn pump(&mut self) {
        let mut msg = MSG::default();
        // SAFETY: standard GetMessage/DispatchMessage loop on the thread that
        // owns the hook. GetMessageW returns 0 on WM_QUIT and -1 on error.
        unsafe {
            while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        let result = match HOOK_HANDLE.with(|cell| cell.take()) {
            // SAFETY: the handle came from SetWindowsHookExW on this thread.
            Some(handle) => unsafe { UnhookWindowsHookEx(handle) }
                .map_err(|e| HookError::UninstallFailed(e.to_string())),
            None => Ok(()),
        };
        ACTIVE_HOOK.with(|slot| *slot.borrow_mut() = None);
        result
    }
}

/// Run the thread-local hook, passing the event on any re-entrancy.
fn evaluate(event: KeyEvent) -> Decision {
    ACTIVE_HOOK
        .try_with(|slot| match slot.try_borrow_mut() {
            Ok(mut active) => active
                .as_mut()
                .map_or(Decision::Pass, |hook| hook.handle(event)),
            Err(_) => Decision::Pass,
        })
        .unwrap_or(Decision::Pass)
}

/// Low-level keyboard hook procedure.
///
/// # Safety
///
/// Called by Windows on the hook thread while it waits in `GetMessageW`.
/// Must return quickly or Windows silently removes the hook.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key = KeyCode(kbs.vkCode);

        let event = match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyEvent::Down(key)),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyEvent::Up(key)),
            _ => None,
        };

        if let Some(event) = event {
            if evaluate(event) == Decision::Suppress {
                trace!(?event, "suppressed");
                return LRESULT(1);
            }
        }
    }

    // SAFETY: forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
