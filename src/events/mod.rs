//! Commands produced by the shortcut engine
//!
//! These are the only thing that crosses from the hook thread to the UI
//! thread.

use serde::{Deserialize, Serialize};

/// Application command emitted when a shortcut fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Ctrl+Alt chord: capture the screen
    Screenshot,

    /// Show or hide the overlay toolbar
    ToggleVisibility,

    /// Exit the application
    Quit,

    /// Move the overlay by a pixel offset (Y grows downwards)
    Move { dx: i32, dy: i32 },
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Screenshot => write!(f, "SCREENSHOT"),
            Command::ToggleVisibility => write!(f, "TOGGLE_VISIBILITY"),
            Command::Quit => write!(f, "QUIT"),
            Command::Move { dx, dy } => write!(f, "MOVE ({dx}, {dy})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let command = Command::Move { dx: 10, dy: -10 };
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains("\"move\""));
        assert!(json.contains("-10"));
    }

    #[test]
    fn test_command_deserialization() {
        let json = r#"{"type":"toggle_visibility"}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(command, Command::ToggleVisibility);
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Quit.to_string(), "QUIT");
        assert_eq!(Command::Move { dx: -5, dy: 0 }.to_string(), "MOVE (-5, 0)");
    }
}
