use serde::{Deserialize, Serialize};

use super::{LayoutCalcInputs, LayoutSystem, MIN_PANE, MoveOutcome};
use crate::common::collections::{HashMap, HashSet};
use crate::common::geometry::Rect;
use crate::layout_engine::utils::partition;
use crate::layout_engine::{Direction, Orientation};
use crate::model::window::WindowId;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Column {
    windows: Vec<WindowId>,
    /// Shift of this column's right boundary; ignored on the last column.
    right_offset: f64,
    /// Shift of the boundary below each window; ignored on a column's last
    /// window.
    bottom_offsets: HashMap<WindowId, f64>,
}

impl Column {
    fn with(wid: WindowId) -> Self {
        Self {
            windows: vec![wid],
            ..Self::default()
        }
    }
}

/// Vertical columns splitting the container width; each column splits its
/// height among its windows. New windows open fresh columns until
/// `num_columns` exist, then stack into the last column.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ColumnsLayout {
    num_columns: usize,
    columns: Vec<Column>,
}

impl ColumnsLayout {
    pub fn new(num_columns: usize) -> Self {
        Self {
            num_columns: num_columns.max(1),
            columns: Vec::new(),
        }
    }

    fn position(&self, wid: WindowId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, col)| {
            col.windows.iter().position(|&w| w == wid).map(|ri| (ci, ri))
        })
    }

    /// Boundary shifts only make sense against the column count they were
    /// made under.
    fn reset_width_offsets(&mut self) {
        for col in &mut self.columns {
            col.right_offset = 0.0;
        }
    }

    fn bottom_offset(&self, wid: WindowId) -> f64 {
        self.columns
            .iter()
            .find_map(|col| col.bottom_offsets.get(&wid))
            .copied()
            .unwrap_or(0.0)
    }

    /// The structure filtered down to the windows actually being laid out,
    /// with unknown windows appended to the last column.
    fn visible_columns(&self, windows: &[WindowId]) -> Vec<Vec<WindowId>> {
        let want: HashSet<WindowId> = windows.iter().copied().collect();
        let mut cols: Vec<Vec<WindowId>> = self
            .columns
            .iter()
            .map(|col| {
                col.windows.iter().copied().filter(|w| want.contains(w)).collect::<Vec<_>>()
            })
            .filter(|col| !col.is_empty())
            .collect();

        let known: HashSet<WindowId> =
            self.columns.iter().flat_map(|col| col.windows.iter().copied()).collect();
        let strays: Vec<WindowId> =
            windows.iter().copied().filter(|w| !known.contains(w)).collect();
        if !strays.is_empty() {
            match cols.last_mut() {
                Some(last) => last.extend(strays),
                None => cols.push(strays),
            }
        }
        cols
    }

    fn grow_horizontal(&mut self, ci: usize, direction: Direction, amount: f64, area: Rect) -> bool {
        let n = self.columns.len();
        if n < 2 {
            return false;
        }
        // Boundary b sits to the right of column b. Growing toward a
        // container edge shrinks the pane instead.
        let (boundary, delta) = match direction {
            Direction::Right if ci < n - 1 => (ci, amount),
            Direction::Right => (ci - 1, amount),
            Direction::Left if ci > 0 => (ci - 1, -amount),
            Direction::Left => (ci, -amount),
            _ => return false,
        };
        let mut offsets: Vec<f64> =
            self.columns[..n - 1].iter().map(|c| c.right_offset).collect();
        offsets[boundary] += delta;
        let spans = partition(area.origin.x, area.size.width, n, &offsets);
        if spans.iter().any(|&(_, width)| width < MIN_PANE) {
            return false;
        }
        self.columns[boundary].right_offset += delta;
        true
    }

    fn grow_vertical(&mut self, ci: usize, ri: usize, direction: Direction, amount: f64, area: Rect) -> bool {
        let rows = self.columns[ci].windows.len();
        if rows < 2 {
            return false;
        }
        // the boundary below row b is owned by the window in row b
        let (owner_row, delta) = match direction {
            Direction::Down if ri < rows - 1 => (ri, amount),
            Direction::Down => (ri - 1, amount),
            Direction::Up if ri > 0 => (ri - 1, -amount),
            Direction::Up => (ri, -amount),
            _ => return false,
        };
        let owner = self.columns[ci].windows[owner_row];
        let mut offsets: Vec<f64> = self.columns[ci].windows[..rows - 1]
            .iter()
            .map(|w| self.columns[ci].bottom_offsets.get(w).copied().unwrap_or(0.0))
            .collect();
        offsets[owner_row] += delta;
        let spans = partition(area.origin.y, area.size.height, rows, &offsets);
        if spans.iter().any(|&(_, height)| height < MIN_PANE) {
            return false;
        }
        *self.columns[ci].bottom_offsets.entry(owner).or_insert(0.0) += delta;
        true
    }
}

impl LayoutSystem for ColumnsLayout {
    fn name(&self) -> &'static str { "columns" }

    fn calculate(
        &self,
        inputs: LayoutCalcInputs<'_>,
        windows: &[WindowId],
    ) -> Vec<(WindowId, Rect)> {
        let cols = self.visible_columns(windows);
        if cols.is_empty() {
            return Vec::new();
        }

        let n = cols.len();
        let col_offsets: Vec<f64> = if n == self.columns.len() {
            self.columns[..n - 1].iter().map(|c| c.right_offset).collect()
        } else {
            vec![0.0; n - 1]
        };
        let col_spans = partition(inputs.area.origin.x, inputs.area.size.width, n, &col_offsets);

        let mut out = Vec::with_capacity(windows.len());
        for (col, &(x, width)) in cols.iter().zip(&col_spans) {
            let rows = col.len();
            let row_offsets: Vec<f64> =
                col[..rows - 1].iter().map(|&w| self.bottom_offset(w)).collect();
            let row_spans =
                partition(inputs.area.origin.y, inputs.area.size.height, rows, &row_offsets);
            for (&wid, &(y, height)) in col.iter().zip(&row_spans) {
                out.push((wid, Rect::new(x, y, width, height).inset(inputs.margin)));
            }
        }
        out
    }

    fn add_window(&mut self, wid: WindowId) {
        if self.position(wid).is_some() {
            return;
        }
        if self.columns.len() < self.num_columns {
            self.columns.push(Column::with(wid));
            self.reset_width_offsets();
        } else if let Some(last) = self.columns.last_mut() {
            last.windows.push(wid);
        } else {
            self.columns.push(Column::with(wid));
        }
    }

    fn remove_window(&mut self, wid: WindowId) {
        let Some((ci, _)) = self.position(wid) else {
            return;
        };
        let col = &mut self.columns[ci];
        col.windows.retain(|&w| w != wid);
        col.bottom_offsets.remove(&wid);
        if col.windows.is_empty() {
            self.columns.remove(ci);
            self.reset_width_offsets();
        }
    }

    fn move_window(&mut self, wid: WindowId, direction: Direction) -> MoveOutcome {
        let Some((ci, ri)) = self.position(wid) else {
            return MoveOutcome::Unhandled;
        };
        match direction.orientation() {
            Orientation::Horizontal => {
                let target = match direction {
                    Direction::Left if ci > 0 => ci - 1,
                    Direction::Right if ci + 1 < self.columns.len() => ci + 1,
                    _ => return MoveOutcome::NoOp,
                };
                let col = &mut self.columns[ci];
                col.windows.retain(|&w| w != wid);
                col.bottom_offsets.remove(&wid);
                let target = if col.windows.is_empty() {
                    self.columns.remove(ci);
                    self.reset_width_offsets();
                    if ci < target { target - 1 } else { target }
                } else {
                    target
                };
                self.columns[target].windows.push(wid);
                MoveOutcome::Moved
            }
            Orientation::Vertical => {
                let swap_with = match direction {
                    Direction::Up if ri > 0 => ri - 1,
                    Direction::Down if ri + 1 < self.columns[ci].windows.len() => ri + 1,
                    _ => return MoveOutcome::NoOp,
                };
                self.columns[ci].windows.swap(ri, swap_with);
                MoveOutcome::Moved
            }
        }
    }

    fn grow(&mut self, wid: WindowId, direction: Direction, amount: f64, area: Rect) -> bool {
        let Some((ci, ri)) = self.position(wid) else {
            return false;
        };
        match direction.orientation() {
            Orientation::Horizontal => self.grow_horizontal(ci, direction, amount, area),
            Orientation::Vertical => self.grow_vertical(ci, ri, direction, amount, area),
        }
    }

    fn normalize(&mut self) {
        for col in &mut self.columns {
            col.right_offset = 0.0;
            col.bottom_offsets.clear();
        }
    }
}
