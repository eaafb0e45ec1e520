//! Shortcut configuration loading and resolution
//!
//! The configuration file is a JSON document:
//!
//! ```json
//! {
//!   "screenshot": { "keys": ["CONTROL", "MENU"], "trigger_on": "second_modifier" },
//!   "f2_mode": {
//!     "modifier": "F2",
//!     "move_step": 10,
//!     "actions": { "J": "toggle_visibility", "q": "quit_app" }
//!   }
//! }
//! ```
//!
//! Names are resolved into [`KeyCode`]s and action strings into [`Action`]s
//! once, at load time. A missing or malformed file yields the default
//! configuration instead of an error.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hotkey::{codes, KeyCode, ModifierRole, NavKey};

/// File name used when no path is configured
pub const DEFAULT_CONFIG_FILE: &str = "kb_sht.json";

/// Environment variable overriding the configuration path
pub const CONFIG_PATH_ENV: &str = "BLASH_SHORTCUTS";

/// Overlay movement per arrow key press, in pixels
pub const DEFAULT_MOVE_STEP: i32 = 10;

/// Errors that can occur while reading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolve the configuration path from the environment, falling back to
/// `kb_sht.json` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShortcuts {
    screenshot: RawScreenshot,
    f2_mode: RawMode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScreenshot {
    keys: Vec<String>,
    trigger_on: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMode {
    modifier: Option<String>,
    move_step: Option<i32>,
    actions: BTreeMap<String, String>,
}

/// When the screenshot chord fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Fire when the second required modifier goes down while the first is held
    SecondModifier,
    #[default]
    Disabled,
}

/// Keys and policy for the screenshot chord
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotRule {
    keys: Vec<KeyCode>,
    policy: TriggerPolicy,
}

impl ScreenshotRule {
    pub fn new(keys: Vec<KeyCode>, policy: TriggerPolicy) -> Self {
        Self { keys, policy }
    }

    pub fn keys(&self) -> &[KeyCode] {
        &self.keys
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    /// Whether any configured key belongs to `role`
    pub fn requires(&self, role: ModifierRole) -> bool {
        self.keys.iter().any(|key| key.role() == Some(role))
    }

    /// The trigger is live only for the second-modifier policy with both
    /// Ctrl and Alt among the configured keys.
    pub fn is_armed(&self) -> bool {
        self.policy == TriggerPolicy::SecondModifier
            && self.requires(ModifierRole::Ctrl)
            && self.requires(ModifierRole::Alt)
    }
}

/// Command bound to a key while the mode key is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleVisibility,
    Quit,
    /// Arrow key: moves by the combined delta of every held arrow
    Move(NavKey),
    /// Recognised key with an unknown action: swallowed, nothing emitted
    Consume,
}

impl Action {
    fn from_config(name: &str) -> Self {
        match name {
            "toggle_visibility" => Action::ToggleVisibility,
            "quit_app" => Action::Quit,
            other => {
                debug!(action = other, "unknown mode action, key will be consumed");
                Action::Consume
            }
        }
    }
}

/// Mode key plus the table of keys it re-routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeConfig {
    modifier: KeyCode,
    move_step: i32,
    actions: HashMap<KeyCode, Action>,
}

impl ModeConfig {
    /// Build a mode table; arrow keys always map to movement and override
    /// any entry given for them.
    pub fn new(modifier: KeyCode, move_step: i32, mut actions: HashMap<KeyCode, Action>) -> Self {
        for (key, nav) in [
            (codes::UP, NavKey::Up),
            (codes::DOWN, NavKey::Down),
            (codes::LEFT, NavKey::Left),
            (codes::RIGHT, NavKey::Right),
        ] {
            actions.insert(key, Action::Move(nav));
        }
        actions.remove(&modifier);

        Self {
            modifier,
            move_step,
            actions,
        }
    }

    pub fn modifier(&self) -> KeyCode {
        self.modifier
    }

    pub fn move_step(&self) -> i32 {
        self.move_step
    }

    pub fn action_for(&self, key: KeyCode) -> Option<Action> {
        self.actions.get(&key).copied()
    }
}

/// Immutable, resolved shortcut configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutConfig {
    screenshot: ScreenshotRule,
    mode: Option<ModeConfig>,
}

impl Default for ShortcutConfig {
    /// Same as an empty document: no screenshot trigger, `F2` mode key with
    /// arrow movement only.
    fn default() -> Self {
        Self::resolve(RawShortcuts::default())
    }
}

impl ShortcutConfig {
    pub fn new(screenshot: ScreenshotRule, mode: Option<ModeConfig>) -> Self {
        Self { screenshot, mode }
    }

    /// Load and resolve the configuration at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        info!(?path, armed = config.screenshot.is_armed(), "shortcut configuration loaded");
        Ok(config)
    }

    /// Load the configuration, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "using default shortcut configuration");
                Self::default()
            }
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawShortcuts = serde_json::from_str(text)?;
        Ok(Self::resolve(raw))
    }

    pub fn screenshot(&self) -> &ScreenshotRule {
        &self.screenshot
    }

    /// `None` when the mode key name could not be resolved
    pub fn mode(&self) -> Option<&ModeConfig> {
        self.mode.as_ref()
    }

    fn resolve(raw: RawShortcuts) -> Self {
        let keys = raw
            .screenshot
            .keys
            .iter()
            .filter_map(|name| {
                let key = KeyCode::from_name(name);
                if key.is_none() {
                    warn!(key = %name, "ignoring unknown screenshot key");
                }
                key
            })
            .collect();
        let policy = match raw.screenshot.trigger_on.as_deref() {
            Some("second_modifier") => TriggerPolicy::SecondModifier,
            _ => TriggerPolicy::Disabled,
        };

        Self {
            screenshot: ScreenshotRule::new(keys, policy),
            mode: Self::resolve_mode(raw.f2_mode),
        }
    }

    fn resolve_mode(raw: RawMode) -> Option<ModeConfig> {
        let name = raw.modifier.as_deref().unwrap_or("F2");
        let Some(modifier) = KeyCode::from_name(name) else {
            warn!(modifier = name, "unknown mode key, mode actions disabled");
            return None;
        };

        let move_step = match raw.move_step {
            Some(step) if step > 0 => step,
            Some(step) => {
                warn!(step, "move_step must be positive, using default");
                DEFAULT_MOVE_STEP
            }
            None => DEFAULT_MOVE_STEP,
        };

        let mut actions = HashMap::new();
        for (name, action) in &raw.actions {
            match KeyCode::from_name_or_char(name) {
                Some(key) => {
                    actions.insert(key, Action::from_config(action));
                }
                None => warn!(key = %name, "ignoring unknown mode action key"),
            }
        }

        Some(ModeConfig::new(modifier, move_step, actions))
    }
}
