//! Key identifiers and held-key tracking
//!
//! Provides the virtual-key constants the shortcut engine understands, the
//! symbolic name table used by the configuration file, and a struct caching
//! which modifier and navigation keys are currently held.

use std::fmt;

/// Platform virtual-key code.
///
/// Values follow the Windows virtual-key numbering, which is what the
/// low-level hook reports. Only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

/// Virtual-key constants for the keys the engine cares about
pub mod codes {
    use super::KeyCode;

    pub const TAB: KeyCode = KeyCode(0x09);
    pub const RETURN: KeyCode = KeyCode(0x0D);
    /// Generic Control
    pub const CONTROL: KeyCode = KeyCode(0x11);
    /// Generic Alt
    pub const MENU: KeyCode = KeyCode(0x12);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);

    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);

    pub const F1: KeyCode = KeyCode(0x70);
    pub const F2: KeyCode = KeyCode(0x71);
    pub const F3: KeyCode = KeyCode(0x72);
    pub const F4: KeyCode = KeyCode(0x73);
    pub const F5: KeyCode = KeyCode(0x74);
    pub const F6: KeyCode = KeyCode(0x75);
    pub const F7: KeyCode = KeyCode(0x76);
    pub const F8: KeyCode = KeyCode(0x77);
    pub const F9: KeyCode = KeyCode(0x78);
    pub const F10: KeyCode = KeyCode(0x79);
    pub const F11: KeyCode = KeyCode(0x7A);
    pub const F12: KeyCode = KeyCode(0x7B);

    pub const LCONTROL: KeyCode = KeyCode(0xA2);
    pub const RCONTROL: KeyCode = KeyCode(0xA3);
    pub const LMENU: KeyCode = KeyCode(0xA4);
    pub const RMENU: KeyCode = KeyCode(0xA5);

    pub const J: KeyCode = KeyCode(b'J' as u32);
}

/// Symbolic names accepted in the configuration file.
///
/// Order matters for reverse lookup: the first entry for a code wins, so
/// the generic modifier names sit before their sided variants.
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("CONTROL", codes::CONTROL),
    ("LCONTROL", codes::LCONTROL),
    ("RCONTROL", codes::RCONTROL),
    ("MENU", codes::MENU),
    ("LMENU", codes::LMENU),
    ("RMENU", codes::RMENU),
    ("RETURN", codes::RETURN),
    ("ESCAPE", codes::ESCAPE),
    ("SPACE", codes::SPACE),
    ("TAB", codes::TAB),
    ("UP", codes::UP),
    ("DOWN", codes::DOWN),
    ("LEFT", codes::LEFT),
    ("RIGHT", codes::RIGHT),
    ("F1", codes::F1),
    ("F2", codes::F2),
    ("F3", codes::F3),
    ("F4", codes::F4),
    ("F5", codes::F5),
    ("F6", codes::F6),
    ("F7", codes::F7),
    ("F8", codes::F8),
    ("F9", codes::F9),
    ("F10", codes::F10),
    ("F11", codes::F11),
    ("F12", codes::F12),
    ("J", codes::J),
];

/// Logical modifier a physical key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierRole {
    Ctrl,
    Alt,
}

impl ModifierRole {
    /// The role that completes a Ctrl+Alt chord together with this one
    pub fn counterpart(self) -> Self {
        match self {
            ModifierRole::Ctrl => ModifierRole::Alt,
            ModifierRole::Alt => ModifierRole::Ctrl,
        }
    }
}

/// Arrow keys used to move the overlay while the mode key is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
}

impl NavKey {
    /// Delta contributed by this key; screen Y grows downwards.
    pub fn delta(self, step: i32) -> (i32, i32) {
        match self {
            NavKey::Up => (0, -step),
            NavKey::Down => (0, step),
            NavKey::Left => (-step, 0),
            NavKey::Right => (step, 0),
        }
    }
}

impl KeyCode {
    /// Look up a symbolic key name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        NAMED_KEYS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|&(_, code)| code)
    }

    /// Look up a symbolic name, falling back to a single alphanumeric
    /// character mapped to its upper-case character code.
    pub fn from_name_or_char(name: &str) -> Option<Self> {
        Self::from_name(name).or_else(|| {
            let mut chars = name.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {
                    Some(KeyCode(c.to_ascii_uppercase() as u32))
                }
                _ => None,
            }
        })
    }

    /// Canonical symbolic name; sided modifiers collapse to `CONTROL`/`MENU`.
    pub fn name(self) -> Option<&'static str> {
        let code = match self.role() {
            Some(ModifierRole::Ctrl) => codes::CONTROL,
            Some(ModifierRole::Alt) => codes::MENU,
            None => self,
        };
        NAMED_KEYS
            .iter()
            .find(|&&(_, known)| known == code)
            .map(|&(name, _)| name)
    }

    pub fn role(self) -> Option<ModifierRole> {
        match self {
            codes::CONTROL | codes::LCONTROL | codes::RCONTROL => Some(ModifierRole::Ctrl),
            codes::MENU | codes::LMENU | codes::RMENU => Some(ModifierRole::Alt),
            _ => None,
        }
    }

    pub fn nav(self) -> Option<NavKey> {
        match self {
            codes::UP => Some(NavKey::Up),
            codes::DOWN => Some(NavKey::Down),
            codes::LEFT => Some(NavKey::Left),
            codes::RIGHT => Some(NavKey::Right),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return write!(f, "{name}");
        }
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_alphanumeric() => write!(f, "{c}"),
            _ => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Tracks which modifier, mode and navigation keys are currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    /// Mode key is held
    pub mode: bool,
    /// Any Control variant is held
    pub ctrl: bool,
    /// Any Alt variant is held
    pub alt: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    pub fn role(&self, role: ModifierRole) -> bool {
        match role {
            ModifierRole::Ctrl => self.ctrl,
            ModifierRole::Alt => self.alt,
        }
    }

    pub fn set_role(&mut self, role: ModifierRole, held: bool) {
        match role {
            ModifierRole::Ctrl => self.ctrl = held,
            ModifierRole::Alt => self.alt = held,
        }
    }

    pub fn set_nav(&mut self, nav: NavKey, held: bool) {
        match nav {
            NavKey::Up => self.up = held,
            NavKey::Down => self.down = held,
            NavKey::Left => self.left = held,
            NavKey::Right => self.right = held,
        }
    }

    /// Combined movement of every held arrow key
    pub fn movement(&self, step: i32) -> (i32, i32) {
        [
            (self.up, NavKey::Up),
            (self.down, NavKey::Down),
            (self.left, NavKey::Left),
            (self.right, NavKey::Right),
        ]
        .into_iter()
        .filter(|(held, _)| *held)
        .map(|(_, nav)| nav.delta(step))
        .fold((0, 0), |(x, y), (dx, dy)| (x + dx, y + dy))
    }
}
