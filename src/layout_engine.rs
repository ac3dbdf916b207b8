use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod selector;
pub mod systems;
pub mod utils;

pub use selector::LayoutSelector;
pub use systems::{
    ColumnsLayout, FloatingLayout, LayoutCalcInputs, LayoutSystem, LayoutSystemKind, MaxLayout,
    MoveOutcome, RatioTileLayout, TileLayout, MIN_PANE,
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Whether this direction points toward larger coordinates.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }
}
