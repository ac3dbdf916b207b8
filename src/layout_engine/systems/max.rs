use serde::{Deserialize, Serialize};

use super::{LayoutCalcInputs, LayoutSystem};
use crate::common::geometry::Rect;
use crate::model::window::WindowId;

/// Every window gets the whole container; stacking order decides which one
/// is seen.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MaxLayout {}

impl LayoutSystem for MaxLayout {
    fn name(&self) -> &'static str { "max" }

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)> {
        let rect = inputs.area.inset(inputs.margin);
        windows.iter().map(|&wid| (wid, rect)).collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::collections::HashMap;

    #[test]
    fn all_windows_get_the_full_area() {
        let area = Rect::new(0.0, 0.0, 1280.0, 720.0);
        let frames = HashMap::default();
        let windows = [WindowId::new(1), WindowId::new(2)];
        let rects = MaxLayout::default().calculate(
            LayoutCalcInputs {
                area,
                margin: 0.0,
                frames: &frames,
            },
            &windows,
        );
        assert_eq!(rects, vec![(windows[0], area), (windows[1], area)]);
    }
}
