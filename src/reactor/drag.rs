use tracing::debug;

use crate::common::geometry::Rect;
use crate::layout_engine::MIN_PANE;
use crate::model::window::WindowId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize,
}

#[derive(Clone, Debug, Default)]
enum DragState {
    #[default]
    Inactive,
    Active {
        window: WindowId,
        mode: DragMode,
        /// Frame captured at press time; restored verbatim on abort.
        start: Rect,
        dx: f64,
        dy: f64,
    },
}

/// Three-phase pointer drag: press captures the frame, motion accumulates
/// deltas, release commits. An abort mid-drag restores the captured frame.
#[derive(Clone, Debug, Default)]
pub struct DragManager {
    state: DragState,
}

impl DragManager {
    pub fn start(&mut self, window: WindowId, mode: DragMode, frame: Rect) {
        debug!(?window, ?mode, "drag start");
        self.state = DragState::Active {
            window,
            mode,
            start: frame,
            dx: 0.0,
            dy: 0.0,
        };
    }

    /// Feeds a motion delta; returns the frame the window should show now.
    pub fn update(&mut self, ddx: f64, ddy: f64) -> Option<(WindowId, Rect)> {
        let DragState::Active {
            window,
            mode,
            start,
            dx,
            dy,
        } = &mut self.state
        else {
            return None;
        };
        *dx += ddx;
        *dy += ddy;
        let frame = match mode {
            DragMode::Move => start.translated(*dx, *dy),
            DragMode::Resize => Rect::new(
                start.origin.x,
                start.origin.y,
                (start.size.width + *dx).max(MIN_PANE),
                (start.size.height + *dy).max(MIN_PANE),
            ),
        };
        Some((*window, frame))
    }

    /// Commits the drag. The last frame sent through `update` stands.
    pub fn end(&mut self) -> Option<WindowId> {
        match std::mem::take(&mut self.state) {
            DragState::Active { window, .. } => {
                debug!(?window, "drag end");
                Some(window)
            }
            DragState::Inactive => None,
        }
    }

    /// Cancels the drag, returning the frame to restore.
    pub fn abort(&mut self) -> Option<(WindowId, Rect)> {
        match std::mem::take(&mut self.state) {
            DragState::Active { window, start, .. } => {
                debug!(?window, "drag aborted");
                Some((window, start))
            }
            DragState::Inactive => None,
        }
    }

    pub fn is_active(&self) -> bool { matches!(self.state, DragState::Active { .. }) }

    pub fn window(&self) -> Option<WindowId> {
        match self.state {
            DragState::Active { window, .. } => Some(window),
            DragState::Inactive => None,
        }
    }
}
