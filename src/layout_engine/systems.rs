use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::common::geometry::Rect;
use crate::layout_engine::Direction;
use crate::model::window::WindowId;

/// No pane may be grown or shrunk past this edge length; violating
/// operations are silent no-ops.
pub const MIN_PANE: f64 = 40.0;

/// Inputs shared by every layout calculation.
#[derive(Clone, Copy)]
pub struct LayoutCalcInputs<'a> {
    /// Container rect with the outer margin already removed.
    pub area: Rect,
    /// Per-pane inset.
    pub margin: f64,
    /// Stored explicit frames, honored by the floating passthrough.
    pub frames: &'a HashMap<WindowId, Rect>,
}

/// Result of asking a layout system to move a window directionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The system rearranged its own structure.
    Moved,
    /// The move hit an edge; nothing changed.
    NoOp,
    /// The system has no directional structure; the caller should fall back
    /// to swapping in the group's tiling order.
    Unhandled,
}

/// A tiling algorithm. `calculate` is pure: same state, same inputs, same
/// output. Only systems with internal arrangement state (Columns) override
/// the mutation hooks.
#[enum_dispatch]
pub trait LayoutSystem {
    fn name(&self) -> &'static str;

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)>;

    fn add_window(&mut self, _wid: WindowId) {}

    fn remove_window(&mut self, _wid: WindowId) {}

    fn move_window(&mut self, _wid: WindowId, _direction: Direction) -> MoveOutcome {
        MoveOutcome::Unhandled
    }

    /// Grows (or, against a container edge, shrinks) the pane holding `wid`
    /// by `amount` pixels. Returns false when nothing changed.
    fn grow(&mut self, _wid: WindowId, _direction: Direction, _amount: f64, _area: Rect) -> bool {
        false
    }

    /// Resets all accumulated size adjustments.
    fn normalize(&mut self) {}
}

mod columns;
pub use columns::ColumnsLayout;
mod ratio_tile;
pub use ratio_tile::RatioTileLayout;
mod max;
pub use max::MaxLayout;
mod tile;
pub use tile::TileLayout;
mod floating;
pub use floating::FloatingLayout;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[enum_dispatch(LayoutSystem)]
pub enum LayoutSystemKind {
    Columns(ColumnsLayout),
    RatioTile(RatioTileLayout),
    Max(MaxLayout),
    Tile(TileLayout),
    Floating(FloatingLayout),
}
