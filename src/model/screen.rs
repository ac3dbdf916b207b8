use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::common::geometry::{Point, Rect};
use crate::reactor::error::WmError;

new_key_type! {
    pub struct ScreenId;
}

/// One physical output. The frame is the full output rect in global
/// coordinates; bar reservations are the render collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    pub output: String,
    pub frame: Rect,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScreenManager {
    screens: SlotMap<ScreenId, Screen>,
    focused: Option<ScreenId>,
}

impl ScreenManager {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, output: impl Into<String>, frame: Rect) -> ScreenId {
        let output = output.into();
        if let Some((id, _)) = self.screens.iter().find(|(_, s)| s.output == output) {
            self.screens[id].frame = frame;
            return id;
        }
        let id = self.screens.insert(Screen { output, frame });
        if self.focused.is_none() {
            self.focused = Some(id);
        }
        id
    }

    /// Reconciles against the backend's output list. Returns the ids of
    /// screens that disappeared so the caller can rehome their groups.
    pub fn sync(&mut self, outputs: &[(String, Rect)]) -> Vec<ScreenId> {
        let removed: Vec<ScreenId> = self
            .screens
            .iter()
            .filter(|(_, s)| !outputs.iter().any(|(name, _)| name == &s.output))
            .map(|(id, _)| id)
            .collect();
        for id in &removed {
            self.screens.remove(*id);
        }
        for (name, frame) in outputs {
            self.add(name.clone(), *frame);
        }
        if self.focused.is_none_or(|id| !self.screens.contains_key(id)) {
            self.focused = self.screens.keys().next();
        }
        removed
    }

    pub fn get(&self, id: ScreenId) -> Option<&Screen> { self.screens.get(id) }

    pub fn by_output(&self, output: &str) -> Result<ScreenId, WmError> {
        self.screens
            .iter()
            .find(|(_, s)| s.output == output)
            .map(|(id, _)| id)
            .ok_or_else(|| WmError::ScreenNotFound(output.to_string()))
    }

    pub fn screen_containing(&self, point: Point) -> Option<ScreenId> {
        self.screens.iter().find(|(_, s)| s.frame.contains(point)).map(|(id, _)| id)
    }

    pub fn focused(&self) -> Option<ScreenId> { self.focused }

    pub fn set_focused(&mut self, id: ScreenId) -> bool {
        if self.screens.contains_key(id) {
            self.focused = Some(id);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScreenId, &Screen)> { self.screens.iter() }

    pub fn len(&self) -> usize { self.screens.len() }

    pub fn is_empty(&self) -> bool { self.screens.is_empty() }
}
