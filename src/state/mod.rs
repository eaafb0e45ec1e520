//! Shortcut state machine
//!
//! Keeps the live set of held keys for the hook thread and turns key
//! transitions into pass/suppress decisions and commands:
//! - Ctrl+Alt chord (either order): screenshot, edge-triggered
//! - Mode key + arrows: move the overlay, diagonals combine
//! - Mode key + configured key: toggle visibility, quit, or swallow

mod machine;

pub use machine::{Evaluation, ModifierStateMachine};
