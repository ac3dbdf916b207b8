use crate::common::geometry::Rect;

/// Screen rect minus the outer margin. Degenerate results are clamped to
/// zero-size; the caller reports those as invariant violations.
pub fn tiling_area(screen: Rect, outer_margin: f64) -> Rect {
    if outer_margin == 0.0 {
        screen
    } else {
        screen.inset(outer_margin)
    }
}

/// Splits `length` starting at `start` into `count` contiguous spans.
/// `offsets` shifts the interior boundaries (`offsets.len() == count - 1`);
/// the outer boundaries are fixed, so the spans always tile the input
/// exactly, with no rounding drift.
pub fn partition(start: f64, length: f64, count: usize, offsets: &[f64]) -> Vec<(f64, f64)> {
    debug_assert_eq!(offsets.len(), count.saturating_sub(1));
    let mut bounds = Vec::with_capacity(count + 1);
    bounds.push(start);
    for i in 1..count {
        bounds.push(start + length * (i as f64) / (count as f64) + offsets[i - 1]);
    }
    bounds.push(start + length);
    bounds.windows(2).map(|pair| (pair[0], pair[1] - pair[0])).collect()
}
