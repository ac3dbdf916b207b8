use thiserror::Error;

use crate::common::geometry::Rect;
use crate::model::window::WindowId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WmError {
    #[error("unknown window {0:?}")]
    WindowNotFound(WindowId),

    #[error("unknown group '{0}'")]
    GroupNotFound(String),

    #[error("unknown output '{0}'")]
    ScreenNotFound(String),

    #[error("unknown layout '{0}'")]
    LayoutNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("layout produced degenerate rect {rect:?} for window {window:?}")]
    InvalidGeometry { window: WindowId, rect: Rect },
}

impl WmError {
    /// Stale-reference errors are logged and dropped; everything else rolls
    /// the dispatch back.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WmError::WindowNotFound(_)
                | WmError::GroupNotFound(_)
                | WmError::ScreenNotFound(_)
                | WmError::LayoutNotFound(_)
        )
    }
}
