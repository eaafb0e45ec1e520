//! Hook thread lifecycle
//!
//! [`HookThreadRunner`] owns the dedicated thread that installs the
//! keyboard hook and runs its message pump. The platform specifics live
//! behind [`HookBackend`]; the runner only knows how to start the thread,
//! wait for the hook to come up, post the quit signal and join.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ShortcutConfig;
use crate::dispatch::CommandDispatcher;
use crate::overlay::VisibilityGuard;

use super::hook::KeyEventHook;

/// How long `stop()` waits for the hook thread before abandoning it
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `start()` waits for the hook to be installed
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while running the hook thread
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to install keyboard hook: {0}")]
    InstallFailed(String),

    #[error("failed to uninstall keyboard hook: {0}")]
    UninstallFailed(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to signal hook thread to quit: {0}")]
    QuitSignal(String),

    #[error("hook thread did not report within {0:?}")]
    StartupTimeout(Duration),
}

/// Wakes the hook thread's pump and asks it to return
pub struct QuitSignal(Box<dyn Fn() -> Result<(), HookError> + Send + Sync>);

impl QuitSignal {
    pub fn new<F>(signal: F) -> Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self(Box::new(signal))
    }

    pub fn send(&self) -> Result<(), HookError> {
        (self.0)()
    }
}

impl fmt::Debug for QuitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QuitSignal")
    }
}

/// Platform side of the hook thread.
///
/// Every method is called on the hook thread, in order: `install`, then
/// `pump` (only if install succeeded), then `uninstall`.
pub trait HookBackend: Send + 'static {
    /// Install the hook so that every key event reaches `hook`, and return
    /// the signal that makes `pump` return.
    fn install(&mut self, hook: KeyEventHook) -> Result<QuitSignal, HookError>;

    /// Deliver events until the quit signal arrives.
    fn pump(&mut self);

    /// Remove the hook and release thread-local resources.
    fn uninstall(&mut self) -> Result<(), HookError>;
}

/// Lifecycle state of the hook thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    StoppingRequested = 3,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunnerState::Starting,
            2 => RunnerState::Running,
            3 => RunnerState::StoppingRequested,
            _ => RunnerState::Stopped,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::Stopped => write!(f, "Stopped"),
            RunnerState::Starting => write!(f, "Starting"),
            RunnerState::Running => write!(f, "Running"),
            RunnerState::StoppingRequested => write!(f, "StoppingRequested"),
        }
    }
}

/// Cloneable, lock-free view of the runner's state
#[derive(Debug, Clone)]
pub struct RunnerStatus(Arc<AtomicU8>);

impl RunnerStatus {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RunnerState::Stopped as u8)))
    }

    pub fn get(&self) -> RunnerState {
        RunnerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: RunnerState) {
        let old = RunnerState::from_u8(self.0.swap(state as u8, Ordering::SeqCst));
        if old != state {
            info!(from = %old, to = %state, "hook runner transition");
        }
    }
}

/// The live hook thread
struct ActiveThread {
    handle: JoinHandle<()>,
    quit: QuitSignal,
    done_rx: mpsc::Receiver<()>,
}

/// Starts and stops the dedicated hook thread
pub struct HookThreadRunner {
    config: Arc<ShortcutConfig>,
    dispatcher: CommandDispatcher,
    guard: Arc<dyn VisibilityGuard>,
    status: RunnerStatus,
    active: Mutex<Option<ActiveThread>>,
    startup_timeout: Duration,
    join_timeout: Duration,
}

impl HookThreadRunner {
    pub fn new(
        config: Arc<ShortcutConfig>,
        dispatcher: CommandDispatcher,
        guard: Arc<dyn VisibilityGuard>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            guard,
            status: RunnerStatus::new(),
            active: Mutex::new(None),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Current state. A hook thread that has exited on its own is reaped
    /// first, so a dead pump is never reported as running.
    pub fn state(&self) -> RunnerState {
        if let Ok(mut active) = self.active.try_lock() {
            self.reap_exited(&mut active);
        }
        self.status.get()
    }

    pub fn status(&self) -> RunnerStatus {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunnerState::Running
    }

    /// Spawn the hook thread and wait until the hook is installed.
    ///
    /// A no-op while already starting or running. On failure the runner is
    /// left stopped and the error is returned to the caller.
    pub fn start<B: HookBackend>(&self, backend: B) -> Result<(), HookError> {
        let mut active = self.lock_active();
        self.reap_exited(&mut active);
        if active.is_some() || self.status.get() != RunnerState::Stopped {
            debug!(state = %self.status.get(), "hook runner already started");
            return Ok(());
        }

        self.status.set(RunnerState::Starting);

        let hook = KeyEventHook::new(
            Arc::clone(&self.config),
            self.dispatcher.clone(),
            Arc::clone(&self.guard),
        );
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<QuitSignal, HookError>>(1);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("hotkey-hook".to_string())
            .spawn(move || {
                run_hook_thread(backend, hook, ready_tx);
                let _ = done_tx.send(());
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.status.set(RunnerState::Stopped);
                return Err(HookError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv_timeout(self.startup_timeout) {
            Ok(Ok(quit)) => {
                *active = Some(ActiveThread {
                    handle,
                    quit,
                    done_rx,
                });
                self.status.set(RunnerState::Running);
                Ok(())
            }
            Ok(Err(e)) => {
                if handle.join().is_err() {
                    warn!("hook thread panicked after failed install");
                }
                self.status.set(RunnerState::Stopped);
                Err(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.startup_timeout, "hook thread unresponsive, abandoning it");
                self.status.set(RunnerState::Stopped);
                Err(HookError::StartupTimeout(self.startup_timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                self.status.set(RunnerState::Stopped);
                Err(HookError::InstallFailed(
                    "hook thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Ask the pump to quit and join the thread, abandoning it if it does
    /// not finish within the join timeout. Safe to call when stopped.
    pub fn stop(&self) {
        let mut active = self.lock_active();
        let Some(thread) = active.take() else {
            return;
        };

        self.status.set(RunnerState::StoppingRequested);

        if let Err(e) = thread.quit.send() {
            warn!(error = %e, "failed to post quit to hook thread");
        }

        match thread.done_rx.recv_timeout(self.join_timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if thread.handle.join().is_err() {
                    error!("hook thread panicked");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.join_timeout, "hook thread did not exit, abandoning it");
            }
        }

        self.status.set(RunnerState::Stopped);
    }

    /// Join and forget a hook thread whose pump returned without a stop
    /// request, leaving the runner stopped and restartable.
    fn reap_exited(&self, active: &mut Option<ActiveThread>) {
        let exited = active.as_ref().is_some_and(|thread| {
            !matches!(thread.done_rx.try_recv(), Err(mpsc::TryRecvError::Empty))
        });
        if !exited {
            return;
        }

        if let Some(thread) = active.take() {
            if thread.handle.join().is_err() {
                error!("hook thread panicked");
            }
        }
        warn!("hook thread exited without a stop request");
        self.status.set(RunnerState::Stopped);
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveThread>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for HookThreadRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the hook thread
fn run_hook_thread<B: HookBackend>(
    mut backend: B,
    hook: KeyEventHook,
    ready_tx: mpsc::SyncSender<Result<QuitSignal, HookError>>,
) {
    info!("hook thread started");

    match backend.install(hook) {
        Ok(quit) => {
            if ready_tx.send(Ok(quit)).is_err() {
                // The starter gave up waiting; nobody can stop us, so leave now.
                warn!("hook runner stopped waiting, uninstalling");
            } else {
                info!("keyboard hook installed");
                backend.pump();
            }

            if let Err(e) = backend.uninstall() {
                warn!(error = %e, "hook uninstall failed");
            }
        }
        Err(e) => {
            error!(error = %e, "keyboard hook installation failed");
            let _ = ready_tx.send(Err(e));
        }
    }

    info!("hook thread stopped");
}
