use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::common::geometry::Rect;
use crate::reactor::error::WmError;

/// Opaque handle assigned by the display backend when a window maps.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default,
)]
pub struct WindowId(u64);

impl WindowId {
    pub fn new(raw: u64) -> Self { Self(raw) }

    pub fn raw(self) -> u64 { self.0 }
}

bitflags! {
    #[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct WindowFlags: u8 {
        const FLOATING = 1 << 0;
        const FULLSCREEN = 1 << 1;
        const MINIMIZED = 1 << 2;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub title: String,
    pub class: String,
    pub frame: Rect,
    pub flags: WindowFlags,
}

impl Window {
    pub fn new(id: WindowId, title: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            class: class.into(),
            frame: Rect::default(),
            flags: WindowFlags::empty(),
        }
    }

    pub fn is_floating(&self) -> bool { self.flags.contains(WindowFlags::FLOATING) }

    pub fn is_fullscreen(&self) -> bool { self.flags.contains(WindowFlags::FULLSCREEN) }

    pub fn is_minimized(&self) -> bool { self.flags.contains(WindowFlags::MINIMIZED) }

    /// Participates in the tiled partition of its group's visible area.
    pub fn is_tiled(&self) -> bool {
        !self.is_floating() && !self.is_fullscreen() && !self.is_minimized()
    }
}

/// Read-only projection for the status/menu widget layer.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub id: u64,
    pub title: String,
    pub class: String,
    pub floating: bool,
    pub fullscreen: bool,
    pub minimized: bool,
    pub focused: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WindowRegistry {
    windows: HashMap<WindowId, Window>,
    focused: Option<WindowId>,
}

impl WindowRegistry {
    pub fn new() -> Self { Self::default() }

    /// Returns false if the id was already registered.
    pub fn register(&mut self, window: Window) -> bool {
        if self.windows.contains_key(&window.id) {
            return false;
        }
        self.windows.insert(window.id, window);
        true
    }

    pub fn unregister(&mut self, id: WindowId) -> Result<Window, WmError> {
        let window = self.windows.remove(&id).ok_or(WmError::WindowNotFound(id))?;
        if self.focused == Some(id) {
            self.focused = None;
        }
        Ok(window)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> { self.windows.get(&id) }

    pub fn window(&self, id: WindowId) -> Result<&Window, WmError> {
        self.windows.get(&id).ok_or(WmError::WindowNotFound(id))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Result<&mut Window, WmError> {
        self.windows.get_mut(&id).ok_or(WmError::WindowNotFound(id))
    }

    pub fn contains(&self, id: WindowId) -> bool { self.windows.contains_key(&id) }

    pub fn set_frame(&mut self, id: WindowId, frame: Rect) -> Result<(), WmError> {
        self.window_mut(id)?.frame = frame;
        Ok(())
    }

    /// Returns whether the flag value actually changed.
    pub fn set_flag(
        &mut self,
        id: WindowId,
        flag: WindowFlags,
        value: bool,
    ) -> Result<bool, WmError> {
        let window = self.window_mut(id)?;
        let before = window.flags;
        window.flags.set(flag, value);
        Ok(window.flags != before)
    }

    /// Returns the new state of the flag.
    pub fn toggle_flag(&mut self, id: WindowId, flag: WindowFlags) -> Result<bool, WmError> {
        let window = self.window_mut(id)?;
        window.flags.toggle(flag);
        Ok(window.flags.contains(flag))
    }

    pub fn focus(&mut self, id: Option<WindowId>) -> Result<(), WmError> {
        if let Some(id) = id {
            if !self.windows.contains_key(&id) {
                return Err(WmError::WindowNotFound(id));
            }
        }
        self.focused = id;
        Ok(())
    }

    pub fn focused(&self) -> Option<WindowId> { self.focused }

    pub fn focused_window(&self) -> Option<&Window> {
        self.focused.and_then(|id| self.windows.get(&id))
    }

    /// Frames of every known window, as input to a layout pass.
    pub fn frames(&self) -> HashMap<WindowId, Rect> {
        self.windows.iter().map(|(&id, w)| (id, w.frame)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> { self.windows.values() }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn summaries(&self) -> Vec<WindowSummary> {
        let mut out: Vec<_> = self
            .windows
            .values()
            .map(|w| WindowSummary {
                id: w.id.raw(),
                title: w.title.clone(),
                class: w.class.clone(),
                floating: w.is_floating(),
                fullscreen: w.is_fullscreen(),
                minimized: w.is_minimized(),
                focused: self.focused == Some(w.id),
            })
            .collect();
        out.sort_by_key(|s| s.id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(raw: u64) -> WindowId { WindowId::new(raw) }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = WindowRegistry::new();
        assert!(registry.register(Window::new(wid(1), "a", "term")));
        assert!(!registry.register(Window::new(wid(1), "b", "term")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_unknown_is_not_found() {
        let mut registry = WindowRegistry::new();
        assert!(matches!(
            registry.unregister(wid(7)),
            Err(WmError::WindowNotFound(_))
        ));
    }

    #[test]
    fn unregister_clears_focus() {
        let mut registry = WindowRegistry::new();
        registry.register(Window::new(wid(1), "a", "term"));
        registry.focus(Some(wid(1))).unwrap();
        registry.unregister(wid(1)).unwrap();
        assert_eq!(registry.focused(), None);
    }

    #[test]
    fn flag_toggles_report_changes() {
        let mut registry = WindowRegistry::new();
        registry.register(Window::new(wid(1), "a", "term"));

        assert!(registry.set_flag(wid(1), WindowFlags::FLOATING, true).unwrap());
        assert!(!registry.set_flag(wid(1), WindowFlags::FLOATING, true).unwrap());
        assert!(!registry.window(wid(1)).unwrap().is_tiled());

        assert!(!registry.toggle_flag(wid(1), WindowFlags::FLOATING).unwrap());
        assert!(registry.window(wid(1)).unwrap().is_tiled());
    }

    #[test]
    fn focus_unknown_window_fails() {
        let mut registry = WindowRegistry::new();
        assert!(registry.focus(Some(wid(3))).is_err());
        assert!(registry.focus(None).is_ok());
    }
}
