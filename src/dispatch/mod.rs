//! Cross-thread command hand-off
//!
//! The hook thread pushes [`Command`]s through a [`CommandDispatcher`]
//! without ever blocking; the UI side drains them in order from the paired
//! [`CommandReceiver`]. Quit is additionally latched in a shared flag so it
//! survives a receiver that has already gone away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::events::Command;

/// Errors that can occur while dispatching a command
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("command sink is closed, dropped {0}")]
    SinkClosed(Command),
}

/// UI-side consumer of commands
pub trait CommandSink {
    fn on_command(&mut self, command: Command);
}

/// Sending half, owned by the hook thread
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    tx: mpsc::UnboundedSender<Command>,
    quit_requested: Arc<AtomicBool>,
}

/// Receiving half, owned by the UI thread
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
    quit_requested: Arc<AtomicBool>,
}

impl CommandDispatcher {
    /// Create a connected dispatcher/receiver pair
    pub fn channel() -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let quit_requested = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                quit_requested: Arc::clone(&quit_requested),
            },
            CommandReceiver { rx, quit_requested },
        )
    }

    /// Queue a command for the UI thread. Never blocks.
    pub fn dispatch(&self, command: Command) -> Result<(), DispatchError> {
        if command == Command::Quit {
            self.quit_requested.store(true, Ordering::SeqCst);
        }

        self.tx.send(command).map_err(|e| {
            if e.0 == Command::Quit {
                debug!("quit could not be queued, relying on the quit flag");
            }
            DispatchError::SinkClosed(e.0)
        })
    }

    pub fn screenshot(&self) -> Result<(), DispatchError> {
        self.dispatch(Command::Screenshot)
    }

    pub fn toggle_visibility(&self) -> Result<(), DispatchError> {
        self.dispatch(Command::ToggleVisibility)
    }

    pub fn quit(&self) -> Result<(), DispatchError> {
        self.dispatch(Command::Quit)
    }

    pub fn move_by(&self, dx: i32, dy: i32) -> Result<(), DispatchError> {
        self.dispatch(Command::Move { dx, dy })
    }

    /// Whether a quit has been dispatched, delivered or not
    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandReceiver {
    /// Wait for the next command; `None` once every dispatcher is dropped
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Blocking receive for a plain (non-async) UI thread
    pub fn blocking_recv(&mut self) -> Option<Command> {
        self.rx.blocking_recv()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    /// Deliver commands to `sink` until Quit has been delivered or the
    /// dispatching side is gone.
    pub async fn forward_to<S>(&mut self, sink: &mut S)
    where
        S: CommandSink + ?Sized,
    {
        info!("command forwarding started");

        while let Some(command) = self.rx.recv().await {
            debug!(%command, "delivering command");
            sink.on_command(command);
            if command == Command::Quit {
                break;
            }
        }

        info!("command forwarding stopped");
    }
}
