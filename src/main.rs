//! blash-hotkeys: background shortcut daemon for the blash overlay
//!
//! Runs the global keyboard hook and stands in for the UI thread:
//! commands are logged and overlay state is tracked headlessly.
//!
//! Configuration:
//! - `BLASH_SHORTCUTS`: path of the shortcut file (default `kb_sht.json`)
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use blash_hotkeys::config::{self, ShortcutConfig};
use blash_hotkeys::hotkey::{self, HookThreadRunner};
use blash_hotkeys::lifecycle::ShutdownSignal;
use blash_hotkeys::{Command, CommandDispatcher, CommandSink, OverlayVisibility};

/// Headless stand-in for the overlay window
#[derive(Debug)]
struct HeadlessOverlay {
    visible: bool,
    position: (i32, i32),
}

impl CommandSink for HeadlessOverlay {
    fn on_command(&mut self, command: Command) {
        match command {
            Command::Screenshot => info!("screenshot requested"),
            Command::ToggleVisibility => {
                self.visible = !self.visible;
                info!(visible = self.visible, "overlay visibility toggled");
            }
            Command::Move { dx, dy } => {
                self.position.0 += dx;
                self.position.1 += dy;
                info!(x = self.position.0, y = self.position.1, "overlay moved");
            }
            Command::Quit => info!("quit requested"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "blash-hotkeys starting"
    );

    let config_path = config::config_path();
    let shortcuts = Arc::new(ShortcutConfig::load_or_default(&config_path));

    let overlays = OverlayVisibility::new();
    let (dispatcher, mut commands) = CommandDispatcher::channel();
    let runner = HookThreadRunner::new(shortcuts, dispatcher, Arc::new(overlays.clone()));

    match runner.start(hotkey::platform_backend()) {
        Ok(()) => info!("keyboard hook started"),
        Err(e) => {
            error!(error = %e, "failed to start keyboard hook");
            warn!("continuing without global hotkeys");
        }
    }

    let shutdown = ShutdownSignal::new();
    let mut overlay = HeadlessOverlay {
        visible: true,
        position: (0, 0),
    };

    tokio::select! {
        _ = commands.forward_to(&mut overlay) => {
            info!("command stream ended");
        }
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    // Joining the hook thread may block for the join timeout
    if let Err(e) = tokio::task::spawn_blocking(move || runner.stop()).await {
        warn!(error = %e, "hook shutdown task failed");
    }

    info!("blash-hotkeys stopped");

    Ok(())
}
