use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::trace;

use crate::common::collections::HashMap;
use crate::layout_engine::LayoutSelector;
use crate::model::screen::ScreenId;
use crate::model::window::WindowId;
use crate::reactor::error::WmError;

new_key_type! {
    pub struct GroupId;
}

/// A named workspace. `members` is insertion order and drives tiling;
/// `stacking` is bottom-to-top and drives raise order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    members: Vec<WindowId>,
    stacking: Vec<WindowId>,
    last_focused: Option<WindowId>,
    pub scratch: bool,
    pub scratch_visible: bool,
    /// The scratch command was spawned but its window has not mapped yet.
    #[serde(skip)]
    pub pending_spawn: bool,
    pub layouts: LayoutSelector,
}

impl Group {
    fn new(name: String, scratch: bool, layouts: LayoutSelector) -> Self {
        Self {
            name,
            members: Vec::new(),
            stacking: Vec::new(),
            last_focused: None,
            scratch,
            scratch_visible: false,
            pending_spawn: false,
            layouts,
        }
    }

    pub fn members(&self) -> &[WindowId] { &self.members }

    pub fn stacking(&self) -> &[WindowId] { &self.stacking }

    pub fn contains(&self, wid: WindowId) -> bool { self.members.contains(&wid) }

    pub fn window_count(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    pub fn last_focused(&self) -> Option<WindowId> { self.last_focused }

    pub fn set_last_focused(&mut self, wid: Option<WindowId>) { self.last_focused = wid; }

    fn push(&mut self, wid: WindowId) {
        self.members.push(wid);
        self.stacking.push(wid);
        self.layouts.add_window(wid);
    }

    fn remove(&mut self, wid: WindowId) -> bool {
        let Some(pos) = self.members.iter().position(|&w| w == wid) else {
            return false;
        };
        self.members.remove(pos);
        self.stacking.retain(|&w| w != wid);
        self.layouts.remove_window(wid);
        if self.last_focused == Some(wid) {
            self.last_focused = None;
        }
        true
    }

    /// Moves the window to the top of the stacking order.
    pub fn raise(&mut self, wid: WindowId) -> bool {
        let Some(pos) = self.stacking.iter().position(|&w| w == wid) else {
            return false;
        };
        let wid = self.stacking.remove(pos);
        self.stacking.push(wid);
        true
    }

    /// Swaps two members in tiling order.
    pub fn swap_members(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(ia), Some(ib)) = (
            self.members.iter().position(|&w| w == a),
            self.members.iter().position(|&w| w == b),
        ) else {
            return false;
        };
        self.members.swap(ia, ib);
        true
    }

    /// The member after `wid` in tiling order, wrapping.
    pub fn next_member(&self, wid: WindowId) -> Option<WindowId> {
        let pos = self.members.iter().position(|&w| w == wid)?;
        Some(self.members[(pos + 1) % self.members.len()])
    }

    pub fn neighbor_in_order(&self, wid: WindowId, forward: bool) -> Option<WindowId> {
        let pos = self.members.iter().position(|&w| w == wid)?;
        let target = if forward {
            pos.checked_add(1).filter(|&p| p < self.members.len())?
        } else {
            pos.checked_sub(1)?
        };
        Some(self.members[target])
    }
}

/// What a group switch did to satisfy the one-group-per-screen invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    AlreadyCurrent,
    Switched,
    /// The group was visible on another screen; the two screens exchanged
    /// groups so neither ends up duplicated or blank.
    Swapped(ScreenId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupManager {
    groups: SlotMap<GroupId, Group>,
    window_to_group: HashMap<WindowId, GroupId>,
    active: HashMap<ScreenId, GroupId>,
}

impl GroupManager {
    /// Builds the static group set. Duplicate names are a fatal config error.
    pub fn new(
        names: impl IntoIterator<Item = (String, bool)>,
        prototype: &LayoutSelector,
    ) -> Result<Self, WmError> {
        let mut groups = SlotMap::with_key();
        let mut seen = crate::common::collections::HashSet::default();
        for (name, scratch) in names {
            if !seen.insert(name.clone()) {
                return Err(WmError::Config(format!("duplicate group name '{name}'")));
            }
            groups.insert(Group::new(name, scratch, prototype.clone()));
        }
        if !groups.values().any(|g| !g.scratch) {
            return Err(WmError::Config("no non-scratch groups configured".to_string()));
        }
        Ok(Self {
            groups,
            window_to_group: HashMap::default(),
            active: HashMap::default(),
        })
    }

    pub fn group_id(&self, name: &str) -> Option<GroupId> {
        self.groups.iter().find(|(_, g)| g.name == name).map(|(id, _)| id)
    }

    pub fn require(&self, name: &str) -> Result<GroupId, WmError> {
        self.group_id(name).ok_or_else(|| WmError::GroupNotFound(name.to_string()))
    }

    pub fn group(&self, id: GroupId) -> &Group { &self.groups[id] }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group { &mut self.groups[id] }

    pub fn group_of(&self, wid: WindowId) -> Option<GroupId> {
        self.window_to_group.get(&wid).copied()
    }

    /// Reassigns a window, removing it from its previous group first so it
    /// never belongs to zero or two groups.
    pub fn attach(&mut self, wid: WindowId, target: GroupId) {
        if self.window_to_group.get(&wid) == Some(&target) {
            return;
        }
        if let Some(old) = self.window_to_group.remove(&wid) {
            if let Some(group) = self.groups.get_mut(old) {
                group.remove(wid);
            }
        }
        self.groups[target].push(wid);
        self.window_to_group.insert(wid, target);
        trace!(?wid, group = %self.groups[target].name, "window attached");
    }

    pub fn detach(&mut self, wid: WindowId) -> Option<GroupId> {
        let gid = self.window_to_group.remove(&wid)?;
        if let Some(group) = self.groups.get_mut(gid) {
            group.remove(wid);
        }
        Some(gid)
    }

    pub fn raise(&mut self, wid: WindowId) -> bool {
        let Some(gid) = self.group_of(wid) else {
            return false;
        };
        self.groups[gid].raise(wid)
    }

    pub fn active_group(&self, screen: ScreenId) -> Option<GroupId> {
        self.active.get(&screen).copied()
    }

    pub fn screen_showing(&self, gid: GroupId) -> Option<ScreenId> {
        self.active.iter().find(|&(_, &g)| g == gid).map(|(&s, _)| s)
    }

    /// Assigns the first non-scratch group not shown elsewhere; used when a
    /// screen appears.
    pub fn ensure_active(&mut self, screen: ScreenId) -> GroupId {
        if let Some(gid) = self.active.get(&screen) {
            return *gid;
        }
        let gid = self
            .sorted_visible_ids()
            .into_iter()
            .find(|gid| self.screen_showing(*gid).is_none())
            .unwrap_or_else(|| self.sorted_visible_ids()[0]);
        self.active.insert(screen, gid);
        gid
    }

    pub fn forget_screen(&mut self, screen: ScreenId) { self.active.remove(&screen); }

    /// Switches a screen to the named group. If the group is currently shown
    /// on another screen, the two screens swap groups.
    pub fn switch_to(&mut self, screen: ScreenId, name: &str) -> Result<SwitchOutcome, WmError> {
        let target = self.require(name)?;
        if self.groups[target].scratch {
            // scratch groups are toggled, never switched to
            return Err(WmError::GroupNotFound(name.to_string()));
        }
        if self.active.get(&screen) == Some(&target) {
            return Ok(SwitchOutcome::AlreadyCurrent);
        }
        if let Some(other) = self.screen_showing(target) {
            let displaced = self.active.insert(screen, target);
            match displaced {
                Some(gid) => {
                    self.active.insert(other, gid);
                }
                None => {
                    self.active.remove(&other);
                }
            }
            return Ok(SwitchOutcome::Swapped(other));
        }
        self.active.insert(screen, target);
        Ok(SwitchOutcome::Switched)
    }

    fn sorted_visible_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<_> = self
            .groups
            .iter()
            .filter(|(_, g)| !g.scratch)
            .map(|(id, g)| (id, g.name.as_str()))
            .collect();
        ids.sort_by(|a, b| a.1.cmp(b.1));
        ids.into_iter().map(|(id, _)| id).collect()
    }

    pub fn next_group(&self, current: GroupId) -> Option<GroupId> {
        let ids = self.sorted_visible_ids();
        let pos = ids.iter().position(|&id| id == current)?;
        Some(ids[(pos + 1) % ids.len()])
    }

    pub fn prev_group(&self, current: GroupId) -> Option<GroupId> {
        let ids = self.sorted_visible_ids();
        let pos = ids.iter().position(|&id| id == current)?;
        Some(ids[(pos + ids.len() - 1) % ids.len()])
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &Group)> { self.groups.iter() }

    pub fn scratch_group_by_name(&self, name: &str) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, g)| g.scratch && g.name == name)
            .map(|(id, _)| id)
    }
}
