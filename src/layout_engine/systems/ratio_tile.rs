use serde::{Deserialize, Serialize};

use super::{LayoutCalcInputs, LayoutSystem};
use crate::common::geometry::Rect;
use crate::model::window::WindowId;

/// Dwindle split: each window takes half of the remaining rect, cut along
/// its longer axis; the last window keeps the remainder. Earlier windows get
/// the larger leaves.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RatioTileLayout {}

impl LayoutSystem for RatioTileLayout {
    fn name(&self) -> &'static str { "ratio_tile" }

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::with_capacity(windows.len());
        let mut remaining = inputs.area;
        for (i, &wid) in windows.iter().enumerate() {
            let rect = if i == windows.len() - 1 {
                remaining
            } else if remaining.size.width >= remaining.size.height {
                let half = remaining.size.width / 2.0;
                let taken = Rect::new(remaining.origin.x, remaining.origin.y, half, remaining.size.height);
                remaining = Rect::new(
                    remaining.origin.x + half,
                    remaining.origin.y,
                    remaining.size.width - half,
                    remaining.size.height,
                );
                taken
            } else {
                let half = remaining.size.height / 2.0;
                let taken = Rect::new(remaining.origin.x, remaining.origin.y, remaining.size.width, half);
                remaining = Rect::new(
                    remaining.origin.x,
                    remaining.origin.y + half,
                    remaining.size.width,
                    remaining.size.height - half,
                );
                taken
            };
            out.push((wid, rect.inset(inputs.margin)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::collections::HashMap;

    const AREA: Rect = Rect {
        origin: crate::common::geometry::Point { x: 0.0, y: 0.0 },
        size: crate::common::geometry::Size {
            width: 1600.0,
            height: 900.0,
        },
    };

    fn wid(raw: u64) -> WindowId { WindowId::new(raw) }

    #[test]
    fn single_window_fills_the_area() {
        let frames = HashMap::default();
        let rects = RatioTileLayout::default().calculate(
            LayoutCalcInputs {
                area: AREA,
                margin: 0.0,
                frames: &frames,
            },
            &[wid(1)],
        );
        assert_eq!(rects, vec![(wid(1), AREA)]);
    }

    #[test]
    fn splits_alternate_along_the_longer_axis() {
        let frames = HashMap::default();
        let rects = RatioTileLayout::default().calculate(
            LayoutCalcInputs {
                area: AREA,
                margin: 0.0,
                frames: &frames,
            },
            &[wid(1), wid(2), wid(3)],
        );
        // 1600x900 is wide -> first cut vertical; remainder 800x900 is tall
        // -> second cut horizontal.
        assert_eq!(rects[0].1, Rect::new(0.0, 0.0, 800.0, 900.0));
        assert_eq!(rects[1].1, Rect::new(800.0, 0.0, 800.0, 450.0));
        assert_eq!(rects[2].1, Rect::new(800.0, 450.0, 800.0, 450.0));
    }

    #[test]
    fn tiles_exactly_for_all_window_counts() {
        let frames = HashMap::default();
        for count in 1..=16 {
            let windows: Vec<WindowId> = (1..=count).map(wid).collect();
            let rects = RatioTileLayout::default().calculate(
                LayoutCalcInputs {
                    area: AREA,
                    margin: 0.0,
                    frames: &frames,
                },
                &windows,
            );
            let total: f64 = rects.iter().map(|(_, r)| r.area()).sum();
            assert!((total - AREA.area()).abs() < 1e-6);
            for (i, (_, ra)) in rects.iter().enumerate() {
                for (_, rb) in &rects[i + 1..] {
                    assert!(!ra.intersects(rb));
                }
            }
        }
    }
}
