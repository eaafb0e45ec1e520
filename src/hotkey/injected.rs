//! In-process hook backend
//!
//! Stands in for an OS hook where none is available: events are pushed in
//! through an [`EventInjector`] and evaluated synchronously on the hook
//! thread, and the injector gets the pass/suppress decision back just like
//! the OS would. Used for headless runs and tests.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

use super::hook::{Decision, KeyEvent, KeyEventHook};
use super::keys::KeyCode;
use super::listener::{HookBackend, HookError, QuitSignal};

enum PumpMessage {
    Event {
        event: KeyEvent,
        reply: mpsc::SyncSender<Decision>,
    },
    Quit,
}

/// Channel-fed [`HookBackend`]
pub struct InjectedHook {
    tx: Sender<PumpMessage>,
    rx: Receiver<PumpMessage>,
    hook: Option<KeyEventHook>,
    refuse: Option<String>,
}

/// Feeds events to an [`InjectedHook`] from any thread
#[derive(Clone)]
pub struct EventInjector {
    tx: Sender<PumpMessage>,
}

impl InjectedHook {
    pub fn new() -> (Self, EventInjector) {
        let (tx, rx) = mpsc::channel();
        let injector = EventInjector { tx: tx.clone() };
        (
            Self {
                tx,
                rx,
                hook: None,
                refuse: None,
            },
            injector,
        )
    }

    /// A backend whose installation fails with `reason`
    pub fn refusing(reason: impl Into<String>) -> Self {
        let (mut backend, _) = Self::new();
        backend.refuse = Some(reason.into());
        backend
    }
}

impl HookBackend for InjectedHook {
    fn install(&mut self, hook: KeyEventHook) -> Result<QuitSignal, HookError> {
        if let Some(reason) = self.refuse.take() {
            return Err(HookError::InstallFailed(reason));
        }

        self.hook = Some(hook);
        let tx = self.tx.clone();
        Ok(QuitSignal::new(move || {
            tx.send(PumpMessage::Quit)
                .map_err(|_| HookError::QuitSignal("pump already gone".to_string()))
        }))
    }

    fn pump(&mut self) {
        let Some(hook) = self.hook.as_mut() else {
            return;
        };

        while let Ok(message) = self.rx.recv() {
            match message {
                PumpMessage::Event { event, reply } => {
                    let _ = reply.send(hook.handle(event));
                }
                PumpMessage::Quit => {
                    debug!("injected pump received quit");
                    break;
                }
            }
        }
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        self.hook = None;
        Ok(())
    }
}

impl EventInjector {
    /// Deliver `event` and wait for the hook's decision.
    ///
    /// Blocks until the pump is running; returns `None` once the backend
    /// has been dropped.
    pub fn send(&self, event: KeyEvent) -> Option<Decision> {
        let (reply, decision) = mpsc::sync_channel(1);
        self.tx.send(PumpMessage::Event { event, reply }).ok()?;
        decision.recv().ok()
    }

    pub fn press(&self, key: KeyCode) -> Option<Decision> {
        self.send(KeyEvent::Down(key))
    }

    pub fn release(&self, key: KeyCode) -> Option<Decision> {
        self.send(KeyEvent::Up(key))
    }
}
