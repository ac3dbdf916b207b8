use serde::{Deserialize, Serialize};

use super::{LayoutCalcInputs, LayoutSystem};
use crate::common::geometry::Rect;
use crate::model::window::WindowId;

/// Passthrough: windows keep their stored frames. A window without a frame
/// yet gets a centered half-size default.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FloatingLayout {}

fn centered_default(area: Rect) -> Rect {
    let width = area.size.width / 2.0;
    let height = area.size.height / 2.0;
    Rect::new(
        area.origin.x + (area.size.width - width) / 2.0,
        area.origin.y + (area.size.height - height) / 2.0,
        width,
        height,
    )
}

impl LayoutSystem for FloatingLayout {
    fn name(&self) -> &'static str { "floating" }

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)> {
        windows
            .iter()
            .map(|&wid| {
                let rect = inputs
                    .frames
                    .get(&wid)
                    .copied()
                    .filter(|r| !r.is_degenerate())
                    .unwrap_or_else(|| centered_default(inputs.area));
                (wid, rect)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::collections::HashMap;

    #[test]
    fn keeps_stored_frames_and_centers_unknown_windows() {
        let area = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let placed = WindowId::new(1);
        let fresh = WindowId::new(2);
        let mut frames = HashMap::default();
        frames.insert(placed, Rect::new(30.0, 40.0, 300.0, 200.0));

        let rects: HashMap<WindowId, Rect> = FloatingLayout::default()
            .calculate(
                LayoutCalcInputs {
                    area,
                    margin: 4.0,
                    frames: &frames,
                },
                &[placed, fresh],
            )
            .into_iter()
            .collect();

        assert_eq!(rects[&placed], Rect::new(30.0, 40.0, 300.0, 200.0));
        assert_eq!(rects[&fresh], Rect::new(250.0, 200.0, 500.0, 400.0));
    }
}
