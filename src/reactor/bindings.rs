use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::reactor::commands::{MouseAction, WmCommand};
use crate::reactor::error::WmError;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SUPER = 1 << 0;
        const SHIFT = 1 << 1;
        const CONTROL = 1 << 2;
        const ALT = 1 << 3;
    }
}

/// Which display server the manager is driving. Guarded bindings only fire
/// when this matches.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Backend {
    X11,
    Wayland,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// A parsed chord like `mod+shift+h`: modifier set plus a final key token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub mods: Modifiers,
    pub key: String,
}

impl KeyChord {
    pub fn new(mods: Modifiers, key: &str) -> Self {
        Self {
            mods,
            key: normalize_key(key),
        }
    }

    /// Parses `mod+shift+h` style chords. Every token but the last must be a
    /// modifier; the last is the key.
    pub fn parse(chord: &str) -> Result<Self, WmError> {
        let tokens: Vec<&str> = chord.split('+').map(str::trim).collect();
        let [modifiers @ .., key] = tokens.as_slice() else {
            return Err(WmError::Config(format!("empty binding '{chord}'")));
        };
        if key.is_empty() {
            return Err(WmError::Config(format!("binding '{chord}' has no key")));
        }
        let mut mods = Modifiers::empty();
        for token in modifiers {
            mods |= parse_modifier(token)
                .ok_or_else(|| WmError::Config(format!("unknown modifier '{token}' in '{chord}'")))?;
        }
        Ok(Self::new(mods, key))
    }
}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token.to_ascii_lowercase().as_str() {
        "mod" | "mod4" | "super" => Some(Modifiers::SUPER),
        "shift" => Some(Modifiers::SHIFT),
        "control" | "ctrl" => Some(Modifiers::CONTROL),
        "alt" | "mod1" => Some(Modifiers::ALT),
        _ => None,
    }
}

/// Single letters are matched case-insensitively; named keys (Return, Tab)
/// keep their spelling.
fn normalize_key(key: &str) -> String {
    if key.chars().count() == 1 { key.to_ascii_lowercase() } else { key.to_string() }
}

fn parse_button(token: &str) -> Option<MouseButton> {
    match token {
        "Button1" => Some(MouseButton::Left),
        "Button2" => Some(MouseButton::Middle),
        "Button3" => Some(MouseButton::Right),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub command: WmCommand,
    pub when: Option<Backend>,
}

/// All configured bindings, keyed for exact-match lookup. An event whose
/// chord is not bound resolves to None and is ignored.
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    keys: HashMap<KeyChord, Binding>,
    mouse: HashMap<(Modifiers, MouseButton), MouseAction>,
}

impl BindingTable {
    /// Unparsable chords are configuration errors and abort startup.
    pub fn from_config(config: &Config) -> Result<Self, WmError> {
        let mut table = Self::default();
        for (chord, binding) in &config.keys {
            let chord = KeyChord::parse(chord)?;
            table.keys.insert(
                chord,
                Binding {
                    command: binding.command().clone(),
                    when: match binding {
                        crate::common::config::KeyBinding::Guarded { when, .. } => Some(*when),
                        crate::common::config::KeyBinding::Plain(_) => None,
                    },
                },
            );
        }
        for (chord, action) in &config.mouse {
            let parsed = KeyChord::parse(chord)?;
            let button = parse_button(&parsed.key)
                .ok_or_else(|| WmError::Config(format!("unknown mouse button in '{chord}'")))?;
            table.mouse.insert((parsed.mods, button), *action);
        }
        Ok(table)
    }

    pub fn lookup_key(&self, mods: Modifiers, key: &str) -> Option<&Binding> {
        self.keys.get(&KeyChord::new(mods, key))
    }

    pub fn lookup_mouse(&self, mods: Modifiers, button: MouseButton) -> Option<MouseAction> {
        self.mouse.get(&(mods, button)).copied()
    }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}
