pub mod group;
pub mod screen;
pub mod window;

pub use group::{Group, GroupId, GroupManager, SwitchOutcome};
pub use screen::{Screen, ScreenId, ScreenManager};
pub use window::{Window, WindowFlags, WindowId, WindowRegistry, WindowSummary};
