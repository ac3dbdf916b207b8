use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::collections::HashSet;
use crate::common::config::{Config, ScratchpadConfig};
use crate::common::geometry::{Point, Rect};
use crate::layout_engine::utils::tiling_area;
use crate::layout_engine::{
    Direction, LayoutCalcInputs, LayoutSelector, LayoutSystem, MIN_PANE, MoveOutcome,
};
use crate::model::window::WindowSummary;
use crate::model::{
    GroupId, GroupManager, ScreenId, ScreenManager, Window, WindowFlags, WindowId, WindowRegistry,
};
use crate::reactor::bindings::{Backend, BindingTable, Modifiers, MouseButton};
use crate::reactor::commands::{MouseAction, WmCommand};
use crate::reactor::drag::{DragManager, DragMode};
use crate::reactor::error::WmError;

pub mod bindings;
pub mod commands;
pub mod drag;
pub mod error;

/// The render collaborator. The reactor computes placement and ordering;
/// everything that touches actual windows goes through this seam.
pub trait RenderSink {
    fn apply_geometry(&mut self, placements: &[(WindowId, Rect)]);

    /// Bottom-to-top order of the windows that should be visible.
    fn raise_order(&mut self, order: &[WindowId]);

    fn hide_windows(&mut self, windows: &[WindowId]);

    /// Asks the client to close; state changes when the unmap arrives.
    fn request_close(&mut self, wid: WindowId);
}

/// Process launcher seam, used for the terminal and scratch clients.
pub trait Launcher {
    fn spawn(&mut self, command: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Press,
    Drag,
    Release,
}

/// Everything the backend or an external client can feed the event loop.
#[derive(Debug, Clone)]
pub enum WmEvent {
    WindowMapped {
        id: WindowId,
        title: String,
        class: String,
    },
    WindowUnmapped(WindowId),
    WindowTitleChanged(WindowId, String),
    /// Client-requested iconify/restore, forwarded by the backend.
    WindowMinimizeChanged {
        id: WindowId,
        minimized: bool,
    },
    KeyChord {
        mods: Modifiers,
        key: String,
    },
    Button {
        mods: Modifiers,
        button: MouseButton,
        phase: ButtonPhase,
        position: Point,
        dx: f64,
        dy: f64,
    },
    /// Escape pressed mid-drag; the grabbed window snaps back.
    DragAbort,
    ScreensChanged(Vec<(String, Rect)>),
    Command(WmCommand),
    Shutdown,
}

/// Single-threaded core: owns all window-management state and reacts to one
/// event at a time. Commands that fail with a stale reference are dropped
/// with a warning; anything else rolls the state back to before the event.
pub struct Reactor {
    config: Config,
    backend: Backend,
    windows: WindowRegistry,
    groups: GroupManager,
    screens: ScreenManager,
    bindings: BindingTable,
    drag: DragManager,
    sink: Box<dyn RenderSink>,
    launcher: Box<dyn Launcher>,
}

impl Reactor {
    /// Fails fast on configuration the event loop cannot run with.
    pub fn new(
        config: Config,
        backend: Backend,
        sink: Box<dyn RenderSink>,
        launcher: Box<dyn Launcher>,
    ) -> Result<Self, WmError> {
        let prototype = LayoutSelector::from_specs(&config.layouts)?;
        let names = config
            .groups
            .iter()
            .map(|g| (g.name.clone(), false))
            .chain(config.scratchpads.iter().map(|p| (p.name.clone(), true)));
        let groups = GroupManager::new(names, &prototype)?;
        let bindings = BindingTable::from_config(&config)?;
        info!(
            groups = config.groups.len(),
            scratchpads = config.scratchpads.len(),
            bindings = bindings.len(),
            "reactor ready"
        );
        Ok(Self {
            config,
            backend,
            windows: WindowRegistry::new(),
            groups,
            screens: ScreenManager::new(),
            bindings,
            drag: DragManager::default(),
            sink,
            launcher,
        })
    }

    pub fn handle_event(&mut self, event: WmEvent) {
        match event {
            WmEvent::WindowMapped { id, title, class } => {
                self.mutate(|r| r.on_window_mapped(id, title, class));
            }
            WmEvent::WindowUnmapped(id) => {
                self.mutate(|r| r.on_window_unmapped(id));
            }
            WmEvent::WindowMinimizeChanged { id, minimized } => {
                self.mutate(|r| r.on_minimize_changed(id, minimized));
            }
            WmEvent::WindowTitleChanged(id, title) => {
                if let Ok(window) = self.windows.window_mut(id) {
                    window.title = title;
                } else {
                    warn!(?id, "title change for unknown window");
                }
            }
            WmEvent::KeyChord { mods, key } => {
                let Some(binding) = self.bindings.lookup_key(mods, &key) else {
                    return;
                };
                if binding.when.is_some_and(|backend| backend != self.backend) {
                    debug!(%key, "binding guarded for another backend");
                    return;
                }
                let command = binding.command.clone();
                self.mutate(|r| r.run_command(command));
            }
            WmEvent::Button {
                mods,
                button,
                phase,
                position,
                dx,
                dy,
            } => {
                self.mutate(|r| r.on_button(mods, button, phase, position, dx, dy));
            }
            WmEvent::DragAbort => {
                self.mutate(|r| r.on_drag_abort());
            }
            WmEvent::ScreensChanged(outputs) => {
                self.mutate(|r| r.on_screens_changed(&outputs));
            }
            WmEvent::Command(command) => {
                self.mutate(|r| r.run_command(command));
            }
            WmEvent::Shutdown => info!("shutting down"),
        }
    }

    /// Applies a state change with rollback. Stale references are warnings;
    /// everything else restores the pre-event state.
    fn mutate(&mut self, f: impl FnOnce(&mut Self) -> Result<(), WmError>) {
        let windows = self.windows.clone();
        let groups = self.groups.clone();
        match f(self) {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                warn!(%error, "dropping event with stale reference");
            }
            Err(error) => {
                warn!(%error, "event failed, rolling back");
                self.windows = windows;
                self.groups = groups;
            }
        }
    }

    fn run_command(&mut self, command: WmCommand) -> Result<(), WmError> {
        debug!(?command, "dispatch");
        match command {
            WmCommand::MoveFocus(direction) => self.move_focus(direction),
            WmCommand::FocusNext => self.focus_next(),
            WmCommand::Shuffle(direction) => self.shuffle(direction),
            WmCommand::Grow(direction) => self.grow(direction),
            WmCommand::Normalize => {
                if let Some(gid) = self.focused_group() {
                    self.groups.group_mut(gid).layouts.current_mut().normalize();
                    self.update_layout()?;
                }
                Ok(())
            }
            WmCommand::NextLayout => {
                if let Some(gid) = self.focused_group() {
                    self.groups.group_mut(gid).layouts.next();
                    self.update_layout()?;
                }
                Ok(())
            }
            WmCommand::SetLayout(name) => {
                if let Some(gid) = self.focused_group() {
                    if !self.groups.group_mut(gid).layouts.set_by_name(&name) {
                        return Err(WmError::LayoutNotFound(name));
                    }
                    self.update_layout()?;
                }
                Ok(())
            }
            WmCommand::ToggleFullscreen => {
                let Some(wid) = self.windows.focused() else {
                    return Ok(());
                };
                self.windows.toggle_flag(wid, WindowFlags::FULLSCREEN)?;
                self.groups.raise(wid);
                self.update_layout()
            }
            WmCommand::ToggleFloating => {
                let Some(wid) = self.windows.focused() else {
                    return Ok(());
                };
                self.windows.toggle_flag(wid, WindowFlags::FLOATING)?;
                self.update_layout()
            }
            WmCommand::CloseFocused => {
                if let Some(wid) = self.windows.focused() {
                    self.sink.request_close(wid);
                }
                Ok(())
            }
            WmCommand::SwitchToGroup(name) => self.switch_group(&name),
            WmCommand::MoveWindowToGroup { group, follow } => {
                self.move_window_to_group(&group, follow)
            }
            WmCommand::NextGroup => self.cycle_group(true),
            WmCommand::PrevGroup => self.cycle_group(false),
            WmCommand::ToggleScratchpad(name) => self.toggle_scratchpad(&name),
            WmCommand::Spawn(command) => {
                self.launcher.spawn(&command);
                Ok(())
            }
            WmCommand::SpawnTerminal => {
                let terminal = self.config.settings.terminal.clone();
                self.launcher.spawn(&terminal);
                Ok(())
            }
            WmCommand::RaiseFocused => {
                if let Some(wid) = self.windows.focused() {
                    self.groups.raise(wid);
                    self.update_layout()?;
                }
                Ok(())
            }
        }
    }

    // ---- window lifecycle ----

    fn on_window_mapped(&mut self, id: WindowId, title: String, class: String) -> Result<(), WmError> {
        if !self.windows.register(Window::new(id, title, class)) {
            warn!(?id, "window mapped twice");
            return Ok(());
        }
        info!(?id, "window mapped");

        if let Some(gid) = self.scratch_capture_target(id) {
            let pad = self.scratchpad_for_group(gid)?.clone();
            let frame = self
                .focused_screen_frame()
                .map(|screen| dropdown_frame(&pad, screen))
                .unwrap_or_default();
            self.windows.set_flag(id, WindowFlags::FLOATING, true)?;
            self.windows.set_frame(id, frame)?;
            self.groups.attach(id, gid);
            let group = self.groups.group_mut(gid);
            group.pending_spawn = false;
            group.scratch_visible = true;
            self.windows.focus(Some(id))?;
            return self.update_layout();
        }

        let window = self.windows.window(id)?;
        let rule = self
            .config
            .rules
            .iter()
            .find(|rule| rule.matcher.matches(&window.class, &window.title))
            .cloned();
        // a rule naming a group the config never declared must not strand
        // the window; it lands in the active group instead
        let target = match rule.as_ref().and_then(|r| r.group.as_deref()) {
            Some(name) => match self.groups.group_id(name) {
                Some(gid) => gid,
                None => {
                    warn!(group = name, ?id, "rule targets unknown group, using the active one");
                    self.map_fallback_target()?
                }
            },
            None => self.map_fallback_target()?,
        };
        if rule.is_some_and(|r| r.floating) {
            self.windows.set_flag(id, WindowFlags::FLOATING, true)?;
            if let Some(screen) = self.focused_screen_frame() {
                self.windows.set_frame(id, centered_frame(screen))?;
            }
        }
        self.groups.attach(id, target);
        if self.groups.screen_showing(target).is_some() {
            self.windows.focus(Some(id))?;
            self.groups.group_mut(target).set_last_focused(Some(id));
        }
        self.update_layout()
    }

    /// Where a freshly mapped window goes when no rule names a group.
    fn map_fallback_target(&mut self) -> Result<GroupId, WmError> {
        match self.screens.focused() {
            Some(sid) => Ok(self.groups.ensure_active(sid)),
            // headless: park the window in the first regular group
            None => self
                .groups
                .iter()
                .find(|(_, g)| !g.scratch)
                .map(|(gid, _)| gid)
                .ok_or_else(|| WmError::Config("no groups".to_string())),
        }
    }

    fn on_minimize_changed(&mut self, id: WindowId, minimized: bool) -> Result<(), WmError> {
        if !self.windows.set_flag(id, WindowFlags::MINIMIZED, minimized)? {
            return Ok(());
        }
        info!(?id, minimized, "minimize state changed");
        if minimized && self.windows.focused() == Some(id) {
            let fallback = self.groups.group_of(id).and_then(|gid| {
                self.groups
                    .group(gid)
                    .members()
                    .iter()
                    .rev()
                    .copied()
                    .find(|&w| {
                        w != id && self.windows.get(w).is_some_and(|win| !win.is_minimized())
                    })
            });
            match fallback {
                Some(wid) => self.focus_window(wid)?,
                None => self.windows.focus(None)?,
            }
        }
        self.update_layout()
    }

    fn on_window_unmapped(&mut self, id: WindowId) -> Result<(), WmError> {
        if self.drag.window() == Some(id) {
            self.drag.end();
        }
        let had_focus = self.windows.focused() == Some(id);
        self.windows.unregister(id)?;
        let gid = self.groups.detach(id);
        info!(?id, "window unmapped");
        if had_focus {
            let fallback = gid.and_then(|gid| {
                let group = self.groups.group(gid);
                group.last_focused().or_else(|| group.members().last().copied())
            });
            self.windows.focus(fallback)?;
        }
        self.update_layout()
    }

    // ---- focus ----

    fn focus_window(&mut self, wid: WindowId) -> Result<(), WmError> {
        self.windows.focus(Some(wid))?;
        if let Some(gid) = self.groups.group_of(wid) {
            self.groups.group_mut(gid).set_last_focused(Some(wid));
            // focusing a window shown on another output moves screen focus
            // there, so group and scratchpad commands act where the user is
            if let Some(sid) = self.groups.screen_showing(gid) {
                self.screens.set_focused(sid);
            }
        }
        Ok(())
    }

    /// Picks the nearest window in the given direction by frame midpoint.
    fn move_focus(&mut self, direction: Direction) -> Result<(), WmError> {
        let Some(current) = self.windows.focused() else {
            return Ok(());
        };
        let Some(gid) = self.groups.group_of(current) else {
            return Err(WmError::WindowNotFound(current));
        };
        let from = self.windows.window(current)?.frame.mid();
        let mut best: Option<(f64, WindowId)> = None;
        for &wid in self.groups.group(gid).members() {
            if wid == current {
                continue;
            }
            let window = self.windows.window(wid)?;
            if window.is_minimized() {
                continue;
            }
            let mid = window.frame.mid();
            let (forward, lateral) = match direction {
                Direction::Left => (from.x - mid.x, (from.y - mid.y).abs()),
                Direction::Right => (mid.x - from.x, (from.y - mid.y).abs()),
                Direction::Up => (from.y - mid.y, (from.x - mid.x).abs()),
                Direction::Down => (mid.y - from.y, (from.x - mid.x).abs()),
            };
            if forward <= 0.0 {
                continue;
            }
            // lateral drift is penalized so straight-line neighbors win
            let score = forward + lateral * 2.0;
            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, wid));
            }
        }
        if let Some((_, wid)) = best {
            self.focus_window(wid)?;
        }
        Ok(())
    }

    fn focus_next(&mut self) -> Result<(), WmError> {
        let Some(current) = self.windows.focused() else {
            return Ok(());
        };
        let Some(gid) = self.groups.group_of(current) else {
            return Err(WmError::WindowNotFound(current));
        };
        if let Some(next) = self.groups.group(gid).next_member(current) {
            self.focus_window(next)?;
        }
        Ok(())
    }

    // ---- arrangement ----

    fn shuffle(&mut self, direction: Direction) -> Result<(), WmError> {
        let Some(wid) = self.windows.focused() else {
            return Ok(());
        };
        if !self.windows.window(wid)?.is_tiled() {
            return Ok(());
        }
        let Some(gid) = self.groups.group_of(wid) else {
            return Err(WmError::WindowNotFound(wid));
        };
        let outcome = self
            .groups
            .group_mut(gid)
            .layouts
            .current_mut()
            .move_window(wid, direction);
        match outcome {
            MoveOutcome::Moved => self.update_layout(),
            MoveOutcome::NoOp => Ok(()),
            MoveOutcome::Unhandled => {
                // layouts without directional structure fall back to the
                // group's tiling order
                let neighbor = self
                    .groups
                    .group(gid)
                    .neighbor_in_order(wid, direction.is_forward());
                if let Some(other) = neighbor {
                    self.groups.group_mut(gid).swap_members(wid, other);
                    self.update_layout()?;
                }
                Ok(())
            }
        }
    }

    fn grow(&mut self, direction: Direction) -> Result<(), WmError> {
        let Some(wid) = self.windows.focused() else {
            return Ok(());
        };
        let amount = self.config.settings.layout.grow_amount;
        if self.windows.window(wid)?.is_floating() {
            let mut frame = self.windows.window(wid)?.frame;
            match direction {
                Direction::Right => frame.size.width += amount,
                Direction::Left => frame.size.width = (frame.size.width - amount).max(MIN_PANE),
                Direction::Down => frame.size.height += amount,
                Direction::Up => frame.size.height = (frame.size.height - amount).max(MIN_PANE),
            }
            self.windows.set_frame(wid, frame)?;
            return self.update_layout();
        }
        let Some(gid) = self.groups.group_of(wid) else {
            return Err(WmError::WindowNotFound(wid));
        };
        let sid = self.groups.screen_showing(gid).or_else(|| self.screens.focused());
        let Some(screen) = sid.and_then(|s| self.screens.get(s)) else {
            return Ok(());
        };
        let area = tiling_area(screen.frame, self.config.settings.layout.margin);
        let changed = self
            .groups
            .group_mut(gid)
            .layouts
            .current_mut()
            .grow(wid, direction, amount, area);
        if changed { self.update_layout() } else { Ok(()) }
    }

    // ---- groups ----

    fn switch_group(&mut self, name: &str) -> Result<(), WmError> {
        let sid = self
            .screens
            .focused()
            .ok_or_else(|| WmError::ScreenNotFound("none connected".to_string()))?;
        self.groups.switch_to(sid, name)?;
        let gid = self.groups.require(name)?;
        let group = self.groups.group(gid);
        let focus = group.last_focused().or_else(|| group.members().last().copied());
        self.windows.focus(focus)?;
        self.update_layout()
    }

    fn cycle_group(&mut self, forward: bool) -> Result<(), WmError> {
        let sid = self
            .screens
            .focused()
            .ok_or_else(|| WmError::ScreenNotFound("none connected".to_string()))?;
        let current = self.groups.ensure_active(sid);
        let next = if forward {
            self.groups.next_group(current)
        } else {
            self.groups.prev_group(current)
        };
        match next {
            Some(gid) if gid != current => {
                let name = self.groups.group(gid).name.clone();
                self.switch_group(&name)
            }
            _ => Ok(()),
        }
    }

    fn move_window_to_group(&mut self, name: &str, follow: bool) -> Result<(), WmError> {
        let Some(wid) = self.windows.focused() else {
            return Ok(());
        };
        let target = self.groups.require(name)?;
        if self.groups.group(target).scratch {
            return Err(WmError::GroupNotFound(name.to_string()));
        }
        let source = self.groups.group_of(wid);
        self.groups.attach(wid, target);
        self.groups.group_mut(target).set_last_focused(Some(wid));
        if follow {
            return self.switch_group(name);
        }
        // focus falls back to whatever remains visible
        let fallback = source.and_then(|gid| {
            let group = self.groups.group(gid);
            group.last_focused().or_else(|| group.members().last().copied())
        });
        self.windows.focus(fallback)?;
        self.update_layout()
    }

    // ---- scratchpads ----

    fn toggle_scratchpad(&mut self, name: &str) -> Result<(), WmError> {
        let gid = self
            .groups
            .scratch_group_by_name(name)
            .ok_or_else(|| WmError::GroupNotFound(name.to_string()))?;

        if self.groups.group(gid).is_empty() {
            // spawned once; the window is captured by class when it maps
            if !self.groups.group(gid).pending_spawn {
                let command = self.scratchpad_for_group(gid)?.command.clone();
                info!(scratchpad = name, %command, "spawning scratch client");
                self.launcher.spawn(&command);
                self.groups.group_mut(gid).pending_spawn = true;
            }
            return Ok(());
        }

        let show = !self.groups.group(gid).scratch_visible;
        self.groups.group_mut(gid).scratch_visible = show;
        debug!(scratchpad = name, visible = show, "scratchpad toggled");
        if show {
            if let Some(&wid) = self.groups.group(gid).members().first() {
                self.windows.focus(Some(wid))?;
            }
        } else if let Some(sid) = self.screens.focused() {
            let active = self.groups.ensure_active(sid);
            let group = self.groups.group(active);
            let fallback = group.last_focused().or_else(|| group.members().last().copied());
            self.windows.focus(fallback)?;
        }
        self.update_layout()
    }

    fn scratch_capture_target(&self, wid: WindowId) -> Option<GroupId> {
        let window = self.windows.get(wid)?;
        let pad = self.config.scratchpads.iter().find(|p| p.class == window.class)?;
        let gid = self.groups.scratch_group_by_name(&pad.name)?;
        let group = self.groups.group(gid);
        (group.pending_spawn && group.is_empty()).then_some(gid)
    }

    fn scratchpad_for_group(&self, gid: GroupId) -> Result<&ScratchpadConfig, WmError> {
        let name = &self.groups.group(gid).name;
        self.config
            .scratchpads
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| WmError::GroupNotFound(name.clone()))
    }

    // ---- pointer ----

    fn on_button(
        &mut self,
        mods: Modifiers,
        button: MouseButton,
        phase: ButtonPhase,
        position: Point,
        dx: f64,
        dy: f64,
    ) -> Result<(), WmError> {
        match phase {
            ButtonPhase::Press => {
                let Some(action) = self.bindings.lookup_mouse(mods, button) else {
                    return Ok(());
                };
                let Some(wid) = self.window_at(position) else {
                    return Ok(());
                };
                self.focus_window(wid)?;
                self.groups.raise(wid);
                match action {
                    MouseAction::Raise => self.update_layout(),
                    MouseAction::Move | MouseAction::Resize => {
                        // grabbing a tiled window promotes it to floating
                        self.windows.set_flag(wid, WindowFlags::FLOATING, true)?;
                        let frame = self.windows.window(wid)?.frame;
                        let mode = if action == MouseAction::Move {
                            DragMode::Move
                        } else {
                            DragMode::Resize
                        };
                        self.drag.start(wid, mode, frame);
                        self.update_layout()
                    }
                }
            }
            ButtonPhase::Drag => {
                if let Some((wid, frame)) = self.drag.update(dx, dy) {
                    self.windows.set_frame(wid, frame)?;
                    self.sink.apply_geometry(&[(wid, frame)]);
                }
                Ok(())
            }
            ButtonPhase::Release => {
                self.drag.end();
                Ok(())
            }
        }
    }

    fn on_drag_abort(&mut self) -> Result<(), WmError> {
        if let Some((wid, frame)) = self.drag.abort() {
            self.windows.set_frame(wid, frame)?;
            self.sink.apply_geometry(&[(wid, frame)]);
        }
        Ok(())
    }

    /// Topmost window under the pointer, scratch overlays first.
    fn window_at(&self, position: Point) -> Option<WindowId> {
        let over_scratch = self
            .groups
            .iter()
            .filter(|(_, g)| g.scratch && g.scratch_visible)
            .flat_map(|(_, g)| g.stacking().iter().rev().copied())
            .find(|&wid| self.frame_contains(wid, position));
        if over_scratch.is_some() {
            return over_scratch;
        }
        let sid = self.screens.screen_containing(position)?;
        let gid = self.groups.active_group(sid)?;
        self.groups
            .group(gid)
            .stacking()
            .iter()
            .rev()
            .copied()
            .find(|&wid| self.frame_contains(wid, position))
    }

    fn frame_contains(&self, wid: WindowId, position: Point) -> bool {
        self.windows
            .get(wid)
            .is_some_and(|w| !w.is_minimized() && w.frame.contains(position))
    }

    // ---- screens ----

    fn on_screens_changed(&mut self, outputs: &[(String, Rect)]) -> Result<(), WmError> {
        let removed = self.screens.sync(outputs);
        for sid in removed {
            self.groups.forget_screen(sid);
        }
        let present: Vec<ScreenId> = self.screens.iter().map(|(id, _)| id).collect();
        for sid in present {
            self.groups.ensure_active(sid);
        }
        info!(screens = self.screens.len(), "outputs changed");
        self.update_layout()
    }

    fn focused_group(&mut self) -> Option<GroupId> {
        let sid = self.screens.focused()?;
        Some(self.groups.ensure_active(sid))
    }

    fn focused_screen_frame(&self) -> Option<Rect> {
        self.screens.focused().and_then(|sid| self.screens.get(sid)).map(|s| s.frame)
    }

    // ---- layout ----

    /// Recomputes placement for every screen's active group plus visible
    /// scratch overlays, then hands the batch to the render sink. Any
    /// degenerate rect fails the whole pass so the caller rolls back.
    fn update_layout(&mut self) -> Result<(), WmError> {
        let margin = self.config.settings.layout.margin;
        let frames = self.windows.frames();
        let mut placements: Vec<(WindowId, Rect)> = Vec::new();
        let mut raise: Vec<WindowId> = Vec::new();

        let screens: Vec<(ScreenId, Rect)> =
            self.screens.iter().map(|(id, s)| (id, s.frame)).collect();
        for (sid, screen) in screens {
            let gid = self.groups.ensure_active(sid);
            let group = self.groups.group(gid);
            let area = tiling_area(screen, margin);

            let mut tiled = Vec::new();
            for &wid in group.members() {
                let window = self.windows.window(wid)?;
                if window.is_minimized() {
                    continue;
                } else if window.is_fullscreen() {
                    placements.push((wid, screen));
                } else if window.is_floating() {
                    // a frame the sink cannot place (e.g. from a headless
                    // map) is replaced, not forwarded
                    let frame = if window.frame.is_degenerate() {
                        centered_frame(screen)
                    } else {
                        window.frame
                    };
                    placements.push((wid, frame));
                } else {
                    tiled.push(wid);
                }
            }
            let inputs = LayoutCalcInputs {
                area,
                margin,
                frames: &frames,
            };
            for (wid, rect) in group.layouts.current().calculate(inputs, &tiled) {
                if rect.is_degenerate() {
                    return Err(WmError::InvalidGeometry { window: wid, rect });
                }
                placements.push((wid, rect));
            }
            raise.extend(
                group
                    .stacking()
                    .iter()
                    .copied()
                    .filter(|&wid| self.windows.get(wid).is_some_and(|w| !w.is_minimized())),
            );
        }

        // scratch overlays sit above everything on the focused screen
        if let Some(screen) = self.focused_screen_frame() {
            let visible: Vec<GroupId> = self
                .groups
                .iter()
                .filter(|(_, g)| g.scratch && g.scratch_visible)
                .map(|(gid, _)| gid)
                .collect();
            for gid in visible {
                let pad = self.scratchpad_for_group(gid)?;
                let frame = dropdown_frame(pad, screen);
                for &wid in self.groups.group(gid).members() {
                    placements.push((wid, frame));
                    raise.push(wid);
                }
            }
        }

        let placed: HashSet<WindowId> = placements.iter().map(|&(wid, _)| wid).collect();
        let hidden: Vec<WindowId> = self
            .windows
            .iter()
            .map(|w| w.id)
            .filter(|wid| !placed.contains(wid))
            .collect();

        for &(wid, rect) in &placements {
            self.windows.set_frame(wid, rect)?;
        }
        self.sink.apply_geometry(&placements);
        self.sink.raise_order(&raise);
        self.sink.hide_windows(&hidden);
        Ok(())
    }

    // ---- widget queries ----

    pub fn state(&self) -> StateSummary {
        let groups = self
            .groups
            .iter()
            .map(|(gid, g)| GroupSummary {
                name: g.name.clone(),
                windows: g.window_count(),
                layout: g.layouts.current_name().to_string(),
                visible: self.groups.screen_showing(gid).is_some()
                    || (g.scratch && g.scratch_visible),
                scratch: g.scratch,
            })
            .collect();
        let screens = self
            .screens
            .iter()
            .map(|(sid, s)| ScreenSummary {
                output: s.output.clone(),
                frame: s.frame,
                group: self
                    .groups
                    .active_group(sid)
                    .map(|gid| self.groups.group(gid).name.clone()),
                focused: self.screens.focused() == Some(sid),
            })
            .collect();
        StateSummary {
            groups,
            screens,
            windows: self.windows.summaries(),
            focused: self.windows.focused().map(WindowId::raw),
            palette: self.config.palette.clone(),
        }
    }

    pub fn state_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.state())
    }
}

/// Default placement for a window that floats before it was ever tiled.
fn centered_frame(screen: Rect) -> Rect {
    Rect::new(
        screen.origin.x + screen.size.width / 4.0,
        screen.origin.y + screen.size.height / 4.0,
        screen.size.width / 2.0,
        screen.size.height / 2.0,
    )
}

fn dropdown_frame(pad: &ScratchpadConfig, screen: Rect) -> Rect {
    Rect::new(
        screen.origin.x + screen.size.width * pad.x,
        screen.origin.y + screen.size.height * pad.y,
        screen.size.width * pad.width,
        screen.size.height * pad.height,
    )
}

/// Read-only snapshot for status bars and menus.
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub groups: Vec<GroupSummary>,
    pub screens: Vec<ScreenSummary>,
    pub windows: Vec<WindowSummary>,
    pub focused: Option<u64>,
    /// Theme colors for the widget layer; the core never interprets them.
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub windows: usize,
    pub layout: String,
    pub visible: bool,
    pub scratch: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreenSummary {
    pub output: String,
    pub frame: Rect,
    pub group: Option<String>,
    pub focused: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::common::collections::HashMap;

    #[derive(Default)]
    struct SinkLog {
        geometry: Vec<Vec<(WindowId, Rect)>>,
        raises: Vec<Vec<WindowId>>,
        hidden: Vec<Vec<WindowId>>,
        closed: Vec<WindowId>,
    }

    struct RecordingSink(Arc<Mutex<SinkLog>>);

    impl RenderSink for RecordingSink {
        fn apply_geometry(&mut self, placements: &[(WindowId, Rect)]) {
            self.0.lock().unwrap().geometry.push(placements.to_vec());
        }

        fn raise_order(&mut self, order: &[WindowId]) {
            self.0.lock().unwrap().raises.push(order.to_vec());
        }

        fn hide_windows(&mut self, windows: &[WindowId]) {
            self.0.lock().unwrap().hidden.push(windows.to_vec());
        }

        fn request_close(&mut self, wid: WindowId) {
            self.0.lock().unwrap().closed.push(wid);
        }
    }

    struct RecordingLauncher(Arc<Mutex<Vec<String>>>);

    impl Launcher for RecordingLauncher {
        fn spawn(&mut self, command: &str) {
            self.0.lock().unwrap().push(command.to_string());
        }
    }

    const SCREEN: Rect = Rect {
        origin: Point { x: 0.0, y: 0.0 },
        size: crate::common::geometry::Size {
            width: 1200.0,
            height: 800.0,
        },
    };

    fn fixture_with(config: Config) -> (Reactor, Arc<Mutex<SinkLog>>, Arc<Mutex<Vec<String>>>) {
        let sink = Arc::new(Mutex::new(SinkLog::default()));
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let mut reactor = Reactor::new(
            config,
            Backend::X11,
            Box::new(RecordingSink(sink.clone())),
            Box::new(RecordingLauncher(spawned.clone())),
        )
        .unwrap();
        reactor.handle_event(WmEvent::ScreensChanged(vec![("eDP-1".to_string(), SCREEN)]));
        (reactor, sink, spawned)
    }

    fn fixture() -> (Reactor, Arc<Mutex<SinkLog>>, Arc<Mutex<Vec<String>>>) {
        let mut config = Config::default();
        config.settings.layout.margin = 0.0;
        fixture_with(config)
    }

    fn map(reactor: &mut Reactor, raw: u64, class: &str) -> WindowId {
        let id = WindowId::new(raw);
        reactor.handle_event(WmEvent::WindowMapped {
            id,
            title: format!("window {raw}"),
            class: class.to_string(),
        });
        id
    }

    fn run(reactor: &mut Reactor, command: WmCommand) {
        reactor.handle_event(WmEvent::Command(command));
    }

    fn last_frames(sink: &Arc<Mutex<SinkLog>>) -> HashMap<WindowId, Rect> {
        sink.lock().unwrap().geometry.last().unwrap().iter().copied().collect()
    }

    fn window_frame(reactor: &Reactor, wid: WindowId) -> Rect {
        reactor.windows.window(wid).unwrap().frame
    }

    #[test]
    fn mapped_windows_tile_the_screen_exactly() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        let c = map(&mut reactor, 3, "term");

        let frames = last_frames(&sink);
        let total: f64 = [a, b, c].iter().map(|w| frames[w].area()).sum();
        assert!((total - SCREEN.area()).abs() < 1e-6);
        assert!(!frames[&a].intersects(&frames[&b]));
        assert!(!frames[&a].intersects(&frames[&c]));
        assert!(!frames[&b].intersects(&frames[&c]));
    }

    #[test]
    fn focus_follows_geometry() {
        let (mut reactor, _, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        assert_eq!(reactor.windows.focused(), Some(b));

        // ratio_tile puts the first window on the left
        run(&mut reactor, WmCommand::MoveFocus(Direction::Left));
        assert_eq!(reactor.windows.focused(), Some(a));
        run(&mut reactor, WmCommand::MoveFocus(Direction::Left));
        assert_eq!(reactor.windows.focused(), Some(a));
        run(&mut reactor, WmCommand::MoveFocus(Direction::Right));
        assert_eq!(reactor.windows.focused(), Some(b));
    }

    #[test]
    fn fullscreen_takes_the_whole_screen_and_back() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");

        run(&mut reactor, WmCommand::ToggleFullscreen);
        assert_eq!(last_frames(&sink)[&b], SCREEN);

        run(&mut reactor, WmCommand::ToggleFullscreen);
        let frames = last_frames(&sink);
        assert!((frames[&a].area() + frames[&b].area() - SCREEN.area()).abs() < 1e-6);
    }

    #[test]
    fn scratchpad_spawns_once_and_reuses_the_window() {
        let (mut reactor, sink, spawned) = fixture();
        map(&mut reactor, 1, "term");

        // first toggle only spawns; nothing has mapped yet
        run(&mut reactor, WmCommand::ToggleScratchpad("scratchpad".to_string()));
        assert_eq!(spawned.lock().unwrap().as_slice(), ["/usr/bin/thunar"]);

        // second toggle while pending must not spawn again
        run(&mut reactor, WmCommand::ToggleScratchpad("scratchpad".to_string()));
        assert_eq!(spawned.lock().unwrap().len(), 1);

        // the scratch client maps and is captured as a floating dropdown
        let pad = map(&mut reactor, 9, "thunar");
        let expected = Rect::new(120.0, 160.0, 960.0, 400.0);
        assert_eq!(last_frames(&sink)[&pad], expected);
        assert_eq!(reactor.windows.focused(), Some(pad));
        // the overlay stacks above the tiled group
        assert_eq!(sink.lock().unwrap().raises.last().unwrap().last(), Some(&pad));

        // hide, then show again: same handle, no new spawn
        run(&mut reactor, WmCommand::ToggleScratchpad("scratchpad".to_string()));
        assert!(sink.lock().unwrap().hidden.last().unwrap().contains(&pad));
        run(&mut reactor, WmCommand::ToggleScratchpad("scratchpad".to_string()));
        assert_eq!(last_frames(&sink)[&pad], expected);
        assert_eq!(spawned.lock().unwrap().len(), 1);
    }

    #[test]
    fn switching_to_unknown_group_is_dropped() {
        let (mut reactor, _, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        run(&mut reactor, WmCommand::SwitchToGroup("nope".to_string()));
        // state is untouched
        assert_eq!(reactor.windows.focused(), Some(a));
        assert_eq!(reactor.state().groups.iter().filter(|g| g.visible).count(), 1);
    }

    #[test]
    fn move_to_group_and_back_restores_the_arrangement() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        let before = last_frames(&sink);

        run(
            &mut reactor,
            WmCommand::MoveWindowToGroup {
                group: "2".to_string(),
                follow: true,
            },
        );
        assert!(sink.lock().unwrap().hidden.last().unwrap().contains(&a));
        assert_eq!(last_frames(&sink)[&b], SCREEN);

        run(
            &mut reactor,
            WmCommand::MoveWindowToGroup {
                group: "1".to_string(),
                follow: true,
            },
        );
        assert_eq!(last_frames(&sink), before);
    }

    #[test]
    fn move_without_follow_keeps_the_current_group_visible() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");

        run(
            &mut reactor,
            WmCommand::MoveWindowToGroup {
                group: "2".to_string(),
                follow: false,
            },
        );
        assert!(sink.lock().unwrap().hidden.last().unwrap().contains(&b));
        assert_eq!(reactor.windows.focused(), Some(a));
        assert_eq!(last_frames(&sink)[&a], SCREEN);
    }

    #[test]
    fn drag_promotes_to_floating_and_commits_the_frame() {
        let (mut reactor, _, _) = fixture();
        map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        let start = window_frame(&reactor, b);

        let press = Point::new(start.mid().x, start.mid().y);
        reactor.handle_event(WmEvent::Button {
            mods: Modifiers::SUPER,
            button: MouseButton::Left,
            phase: ButtonPhase::Press,
            position: press,
            dx: 0.0,
            dy: 0.0,
        });
        assert!(reactor.windows.window(b).unwrap().is_floating());

        for _ in 0..2 {
            reactor.handle_event(WmEvent::Button {
                mods: Modifiers::SUPER,
                button: MouseButton::Left,
                phase: ButtonPhase::Drag,
                position: press,
                dx: 50.0,
                dy: 30.0,
            });
        }
        reactor.handle_event(WmEvent::Button {
            mods: Modifiers::SUPER,
            button: MouseButton::Left,
            phase: ButtonPhase::Release,
            position: press,
            dx: 0.0,
            dy: 0.0,
        });
        assert_eq!(window_frame(&reactor, b), start.translated(100.0, 60.0));
    }

    #[test]
    fn drag_abort_restores_the_press_frame() {
        let (mut reactor, _, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let start = window_frame(&reactor, a);

        reactor.handle_event(WmEvent::Button {
            mods: Modifiers::SUPER,
            button: MouseButton::Right,
            phase: ButtonPhase::Press,
            position: start.mid(),
            dx: 0.0,
            dy: 0.0,
        });
        reactor.handle_event(WmEvent::Button {
            mods: Modifiers::SUPER,
            button: MouseButton::Right,
            phase: ButtonPhase::Drag,
            position: start.mid(),
            dx: 200.0,
            dy: 120.0,
        });
        assert_ne!(window_frame(&reactor, a), start);

        reactor.handle_event(WmEvent::DragAbort);
        assert_eq!(window_frame(&reactor, a), start);
    }

    #[test]
    fn key_chords_dispatch_bound_commands() {
        let (mut reactor, _, _) = fixture();
        map(&mut reactor, 1, "term");
        assert_eq!(reactor.state().groups[0].layout, "ratio_tile");

        reactor.handle_event(WmEvent::KeyChord {
            mods: Modifiers::SUPER,
            key: "Tab".to_string(),
        });
        let layouts: Vec<String> = reactor
            .state()
            .groups
            .iter()
            .filter(|g| g.visible)
            .map(|g| g.layout.clone())
            .collect();
        assert_eq!(layouts, vec!["columns".to_string()]);

        // unbound chords are ignored
        reactor.handle_event(WmEvent::KeyChord {
            mods: Modifiers::ALT,
            key: "Tab".to_string(),
        });
    }

    #[test]
    fn guarded_bindings_only_fire_on_their_backend() {
        let mut config = Config::default();
        config.settings.layout.margin = 0.0;
        config.keys.insert(
            "mod+v".to_string(),
            crate::common::config::KeyBinding::Guarded {
                command: WmCommand::SpawnTerminal,
                when: Backend::Wayland,
            },
        );
        let (mut reactor, _, spawned) = fixture_with(config);

        reactor.handle_event(WmEvent::KeyChord {
            mods: Modifiers::SUPER,
            key: "v".to_string(),
        });
        assert!(spawned.lock().unwrap().is_empty());
    }

    #[test]
    fn float_rules_apply_on_map() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let ask = map(&mut reactor, 2, "ssh-askpass");

        assert!(reactor.windows.window(ask).unwrap().is_floating());
        // the tiled window still has the whole screen
        assert_eq!(last_frames(&sink)[&a], SCREEN);
    }

    #[test]
    fn rule_with_unknown_group_lands_in_the_active_group() {
        let mut config = Config::default();
        config.settings.layout.margin = 0.0;
        config.rules.push(crate::common::config::WindowRule {
            matcher: crate::common::config::RuleMatch {
                class: Some("editor".to_string()),
                title: None,
            },
            floating: false,
            group: Some("ghost".to_string()),
        });
        let (mut reactor, sink, _) = fixture_with(config);

        let w = map(&mut reactor, 5, "editor");
        let gid = reactor.groups.group_of(w).unwrap();
        assert_eq!(reactor.groups.group(gid).name, "1");
        assert_eq!(reactor.windows.focused(), Some(w));
        assert_eq!(last_frames(&sink)[&w], SCREEN);
    }

    #[test]
    fn minimized_windows_leave_tiling_and_focus() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        assert_eq!(reactor.windows.focused(), Some(b));

        reactor.handle_event(WmEvent::WindowMinimizeChanged {
            id: b,
            minimized: true,
        });
        assert_eq!(reactor.windows.focused(), Some(a));
        assert_eq!(last_frames(&sink)[&a], SCREEN);
        assert!(sink.lock().unwrap().hidden.last().unwrap().contains(&b));

        // directional focus never reaches a minimized window
        run(&mut reactor, WmCommand::MoveFocus(Direction::Right));
        assert_eq!(reactor.windows.focused(), Some(a));

        reactor.handle_event(WmEvent::WindowMinimizeChanged {
            id: b,
            minimized: false,
        });
        let frames = last_frames(&sink);
        assert!((frames[&a].area() + frames[&b].area() - SCREEN.area()).abs() < 1e-6);
    }

    #[test]
    fn clicking_a_window_on_another_screen_moves_screen_focus() {
        let (mut reactor, _, _) = fixture();
        let hdmi = Rect::new(1200.0, 0.0, 1200.0, 800.0);
        reactor.handle_event(WmEvent::ScreensChanged(vec![
            ("eDP-1".to_string(), SCREEN),
            ("HDMI-1".to_string(), hdmi),
        ]));
        map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        run(
            &mut reactor,
            WmCommand::MoveWindowToGroup {
                group: "2".to_string(),
                follow: false,
            },
        );

        reactor.handle_event(WmEvent::Button {
            mods: Modifiers::SUPER,
            button: MouseButton::Middle,
            phase: ButtonPhase::Press,
            position: Point::new(1800.0, 400.0),
            dx: 0.0,
            dy: 0.0,
        });
        assert_eq!(reactor.windows.focused(), Some(b));
        let state = reactor.state();
        let focused_output = state.screens.iter().find(|s| s.focused).unwrap();
        assert_eq!(focused_output.output, "HDMI-1");

        // group commands now act on that screen
        run(&mut reactor, WmCommand::SwitchToGroup("3".to_string()));
        let state = reactor.state();
        let hdmi_screen = state.screens.iter().find(|s| s.output == "HDMI-1").unwrap();
        assert_eq!(hdmi_screen.group.as_deref(), Some("3"));
    }

    #[test]
    fn headless_floating_window_gets_a_frame_once_a_screen_appears() {
        let mut config = Config::default();
        config.settings.layout.margin = 0.0;
        let sink = Arc::new(Mutex::new(SinkLog::default()));
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let mut reactor = Reactor::new(
            config,
            Backend::X11,
            Box::new(RecordingSink(sink.clone())),
            Box::new(RecordingLauncher(spawned.clone())),
        )
        .unwrap();

        // mapped before any output exists: parked, frame still zero-size
        let w = map(&mut reactor, 1, "ssh-askpass");
        assert!(reactor.windows.window(w).unwrap().is_floating());

        reactor.handle_event(WmEvent::ScreensChanged(vec![(
            "eDP-1".to_string(),
            SCREEN,
        )]));
        assert_eq!(last_frames(&sink)[&w], Rect::new(300.0, 200.0, 600.0, 400.0));
    }

    #[test]
    fn degenerate_layout_rolls_the_event_back() {
        let mut config = Config::default();
        // pane inset larger than any pane can be
        config.settings.layout.margin = 300.0;
        let (mut reactor, _, _) = fixture_with(config);

        map(&mut reactor, 1, "term");
        assert!(reactor.windows.is_empty());
    }

    #[test]
    fn unmap_refocuses_a_remaining_window() {
        let (mut reactor, _, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        let b = map(&mut reactor, 2, "term");
        assert_eq!(reactor.windows.focused(), Some(b));

        reactor.handle_event(WmEvent::WindowUnmapped(b));
        assert_eq!(reactor.windows.focused(), Some(a));

        // unmapping an unknown window is dropped, not a panic
        reactor.handle_event(WmEvent::WindowUnmapped(WindowId::new(99)));
        assert_eq!(reactor.windows.len(), 1);
    }

    #[test]
    fn close_focused_asks_the_sink_without_touching_state() {
        let (mut reactor, sink, _) = fixture();
        let a = map(&mut reactor, 1, "term");
        run(&mut reactor, WmCommand::CloseFocused);
        assert_eq!(sink.lock().unwrap().closed, vec![a]);
        assert_eq!(reactor.windows.len(), 1);
    }

    #[test]
    fn state_json_serializes_the_snapshot() {
        let (mut reactor, _, _) = fixture();
        map(&mut reactor, 1, "term");
        let raw = reactor.state_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["screens"][0]["output"], "eDP-1");
        assert_eq!(value["focused"], 1);
        assert_eq!(value["windows"][0]["class"], "term");
    }

    #[test]
    fn set_layout_rejects_unknown_names_and_keeps_state() {
        let (mut reactor, _, _) = fixture();
        map(&mut reactor, 1, "term");
        run(&mut reactor, WmCommand::SetLayout("spiral".to_string()));
        assert_eq!(reactor.state().groups[0].layout, "ratio_tile");

        run(&mut reactor, WmCommand::SetLayout("max".to_string()));
        let layouts: Vec<String> = reactor
            .state()
            .groups
            .iter()
            .filter(|g| g.visible)
            .map(|g| g.layout.clone())
            .collect();
        assert_eq!(layouts, vec!["max".to_string()]);
    }
}
