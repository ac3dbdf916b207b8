use serde::{Deserialize, Serialize};

use super::{LayoutCalcInputs, LayoutSystem, MIN_PANE};
use crate::common::geometry::Rect;
use crate::layout_engine::utils::partition;
use crate::layout_engine::{Direction, Orientation};
use crate::model::window::WindowId;

fn default_ratio() -> f64 { 0.5 }

/// Master/stack split: the first window takes `ratio` of the width, the rest
/// stack vertically on the right.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TileLayout {
    #[serde(default = "default_ratio")]
    ratio: f64,
    #[serde(skip, default = "default_ratio")]
    default_ratio: f64,
}

impl Default for TileLayout {
    fn default() -> Self { Self::new(default_ratio()) }
}

impl TileLayout {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            default_ratio: ratio,
        }
    }
}

impl LayoutSystem for TileLayout {
    fn name(&self) -> &'static str { "tile" }

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)> {
        let area = inputs.area;
        match windows {
            [] => Vec::new(),
            [only] => vec![(*only, area.inset(inputs.margin))],
            [master, stack @ ..] => {
                let master_width = area.size.width * self.ratio;
                let mut out = vec![(
                    *master,
                    Rect::new(area.origin.x, area.origin.y, master_width, area.size.height)
                        .inset(inputs.margin),
                )];
                let spans = partition(
                    area.origin.y,
                    area.size.height,
                    stack.len(),
                    &vec![0.0; stack.len() - 1],
                );
                let stack_x = area.origin.x + master_width;
                let stack_width = area.size.width - master_width;
                for (&wid, &(y, height)) in stack.iter().zip(&spans) {
                    out.push((wid, Rect::new(stack_x, y, stack_width, height).inset(inputs.margin)));
                }
                out
            }
        }
    }

    fn grow(&mut self, _wid: WindowId, direction: Direction, amount: f64, area: Rect) -> bool {
        if direction.orientation() != Orientation::Horizontal || area.size.width <= 0.0 {
            return false;
        }
        let delta = amount / area.size.width;
        let proposed = if direction.is_forward() { self.ratio + delta } else { self.ratio - delta };
        let master = area.size.width * proposed;
        if master < MIN_PANE || area.size.width - master < MIN_PANE {
            return false;
        }
        self.ratio = proposed;
        true
    }

    fn normalize(&mut self) { self.ratio = self.default_ratio; }
}
