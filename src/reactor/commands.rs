use serde::{Deserialize, Serialize};

use crate::layout_engine::Direction;

/// Everything a key binding or external client can ask the manager to do.
/// Unit variants appear in the config file as bare strings, payload variants
/// as single-key tables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WmCommand {
    MoveFocus(Direction),
    FocusNext,
    Shuffle(Direction),
    Grow(Direction),
    Normalize,
    NextLayout,
    SetLayout(String),
    ToggleFullscreen,
    ToggleFloating,
    CloseFocused,
    SwitchToGroup(String),
    MoveWindowToGroup {
        group: String,
        #[serde(default)]
        follow: bool,
    },
    NextGroup,
    PrevGroup,
    ToggleScratchpad(String),
    Spawn(String),
    SpawnTerminal,
    RaiseFocused,
}

/// What a mouse binding does while the button is held.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    Move,
    Resize,
    Raise,
}
