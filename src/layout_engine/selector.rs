use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::LayoutSpec;
use crate::layout_engine::systems::{
    ColumnsLayout, FloatingLayout, LayoutSystem, LayoutSystemKind, MaxLayout, RatioTileLayout,
    TileLayout,
};
use crate::model::window::WindowId;
use crate::reactor::error::WmError;

/// A group's layout cycle: the configured systems plus which one is current.
/// Window membership changes are forwarded to every system so switching
/// layouts never loses arrangement state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LayoutSelector {
    systems: Vec<LayoutSystemKind>,
    current: usize,
}

impl LayoutSelector {
    pub fn new(systems: Vec<LayoutSystemKind>) -> Result<Self, WmError> {
        if systems.is_empty() {
            return Err(WmError::Config("at least one layout is required".to_string()));
        }
        Ok(Self {
            systems,
            current: 0,
        })
    }

    pub fn from_specs(specs: &[LayoutSpec]) -> Result<Self, WmError> {
        let systems = specs
            .iter()
            .map(|spec| match *spec {
                LayoutSpec::RatioTile => LayoutSystemKind::RatioTile(RatioTileLayout::default()),
                LayoutSpec::Columns { num_columns } => {
                    LayoutSystemKind::Columns(ColumnsLayout::new(num_columns))
                }
                LayoutSpec::Max => LayoutSystemKind::Max(MaxLayout::default()),
                LayoutSpec::Tile { ratio } => LayoutSystemKind::Tile(TileLayout::new(ratio)),
                LayoutSpec::Floating => LayoutSystemKind::Floating(FloatingLayout::default()),
            })
            .collect();
        Self::new(systems)
    }

    pub fn current(&self) -> &LayoutSystemKind { &self.systems[self.current] }

    pub fn current_mut(&mut self) -> &mut LayoutSystemKind { &mut self.systems[self.current] }

    pub fn current_name(&self) -> &'static str { self.current().name() }

    /// Advances to the next layout in the cycle, wrapping around.
    pub fn next(&mut self) {
        self.current = (self.current + 1) % self.systems.len();
        debug!(layout = self.current_name(), "switched layout");
    }

    /// Selects the first system with the given name. Returns false when no
    /// system matches.
    pub fn set_by_name(&mut self, name: &str) -> bool {
        match self.systems.iter().position(|s| s.name() == name) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize { self.systems.len() }

    pub fn is_empty(&self) -> bool { self.systems.is_empty() }

    pub fn names(&self) -> Vec<&'static str> { self.systems.iter().map(|s| s.name()).collect() }

    pub fn add_window(&mut self, wid: WindowId) {
        for system in &mut self.systems {
            system.add_window(wid);
        }
    }

    pub fn remove_window(&mut self, wid: WindowId) {
        for system in &mut self.systems {
            system.remove_window(wid);
        }
    }
}
