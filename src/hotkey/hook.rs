//! The per-event callback boundary
//!
//! [`KeyEventHook`] is what a platform backend calls for every key event.
//! It feeds the state machine, hands any resulting command to the
//! dispatcher and returns the pass/suppress decision. Nothing escapes it:
//! an internal fault lets the key through.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::ShortcutConfig;
use crate::dispatch::CommandDispatcher;
use crate::overlay::VisibilityGuard;
use crate::state::ModifierStateMachine;

use super::keys::KeyCode;

/// A key transition reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(KeyCode),
    Up(KeyCode),
}

impl KeyEvent {
    pub fn key(&self) -> KeyCode {
        match *self {
            KeyEvent::Down(key) | KeyEvent::Up(key) => key,
        }
    }

    pub fn is_down(&self) -> bool {
        matches!(self, KeyEvent::Down(_))
    }
}

/// What the OS should do with the intercepted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    /// Forward unchanged to the rest of the system
    #[default]
    Pass,
    /// Swallow; the focused application never sees it
    Suppress,
}

/// Everything the hook thread needs to evaluate one event
pub struct KeyEventHook {
    machine: ModifierStateMachine,
    dispatcher: CommandDispatcher,
    guard: Arc<dyn VisibilityGuard>,
}

impl KeyEventHook {
    pub fn new(
        config: Arc<ShortcutConfig>,
        dispatcher: CommandDispatcher,
        guard: Arc<dyn VisibilityGuard>,
    ) -> Self {
        Self {
            machine: ModifierStateMachine::new(config),
            dispatcher,
            guard,
        }
    }

    /// Evaluate `event`, dispatching any command it produces.
    ///
    /// Runs inline with the OS input pipeline: no blocking, and a panic
    /// during evaluation results in [`Decision::Pass`].
    pub fn handle(&mut self, event: KeyEvent) -> Decision {
        let machine = &mut self.machine;
        let guard = &*self.guard;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| machine.handle(event, guard)));

        let eval = match outcome {
            Ok(eval) => eval,
            Err(_) => {
                error!(?event, "key evaluation panicked, passing event through");
                return Decision::Pass;
            }
        };

        if let Some(command) = eval.command {
            if let Err(e) = self.dispatcher.dispatch(command) {
                debug!(error = %e, "command dropped");
            }
        }

        eval.decision
    }
}
