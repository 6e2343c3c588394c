//! The reactor is the single authority over manager state. Every input —
//! driver events, key presses, config reloads, signals — arrives on its
//! channel and is handled to completion before the next one, so no command
//! ever observes a half-applied state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::actor::bar;
use crate::actor::bindings::BindingTable;
use crate::actor::drag::{DragAction, DragManager};
use crate::actor::{self, Receiver};
use crate::common::collections::HashSet;
use crate::common::config::Config;
use crate::common::error::ConfigError;
use crate::layout_engine::{Direction, LayoutCommand, LayoutEngine};
use crate::model::{GroupId, GroupManager, WindowRegistry};
use crate::sys::driver::{Driver, DriverEvent, DriverWindow, WindowId};
use crate::sys::geometry::{Point, Rect, Round};
use crate::sys::hotkey::KeyCode;
use crate::sys::process;
use crate::sys::screen::{Screen, ScreenId};
use crate::ui::widgets::{GroupStatus, WmSnapshot};

pub type Sender = actor::Sender<Event>;

#[derive(Debug)]
pub enum Event {
    Driver(DriverEvent),
    Command(WmCommand),
    ConfigUpdated(Box<Config>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExecCmd {
    String(String),
    Array(Vec<String>),
}

impl ExecCmd {
    fn spawn(&self) -> Result<(), crate::common::error::SpawnError> {
        match self {
            ExecCmd::String(command) => process::spawn(command),
            ExecCmd::Array(parts) => process::spawn_parts(parts),
        }
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WmCommand {
    FocusLeft,
    FocusRight,
    FocusUp,
    FocusDown,
    FocusNext,
    ShuffleLeft,
    ShuffleRight,
    ShuffleUp,
    ShuffleDown,
    GrowLeft,
    GrowRight,
    GrowUp,
    GrowDown,
    Normalize,
    ToggleSplit,
    NextLayout,
    ToggleFloating,
    KillWindow,
    Spawn(ExecCmd),
    SwitchToGroup(String),
    MoveWindowToGroup {
        group: String,
        #[serde(default = "yes")]
        switch: bool,
    },
    Restart,
    Shutdown,
}

/// Session lifecycle. `Restarting` is a reattach: state is rebuilt from the
/// live window list without tearing the driver connection down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Restarting,
    ShuttingDown,
}

pub struct Reactor {
    driver: Box<dyn Driver + Send>,
    config: Config,
    bindings: BindingTable,
    registry: WindowRegistry,
    groups: GroupManager,
    layout: LayoutEngine,
    drags: DragManager,
    bar_tx: Option<bar::Sender>,
    screens: Vec<Screen>,
    hidden: HashSet<WindowId>,
    state: SessionState,
    restore_path: PathBuf,
    config_path: Option<PathBuf>,
    receiver: Receiver<Event>,
}

impl Reactor {
    pub fn new(
        config: Config,
        driver: Box<dyn Driver + Send>,
        bar_tx: Option<bar::Sender>,
        restore_path: PathBuf,
        config_path: Option<PathBuf>,
    ) -> Result<(Self, Sender), ConfigError> {
        let (sender, receiver) = actor::channel();
        let bindings = BindingTable::from_config(&config)?;
        let registry = WindowRegistry::new(&config.float_rules);
        let groups = GroupManager::new(&config.groups);
        let layout = LayoutEngine::restore(&restore_path, &config.layouts);
        let this = Reactor {
            driver,
            config,
            bindings,
            registry,
            groups,
            layout,
            drags: DragManager::default(),
            bar_tx,
            screens: Vec::new(),
            hidden: HashSet::default(),
            state: SessionState::Starting,
            restore_path,
            config_path,
            receiver,
        };
        Ok((this, sender))
    }

    pub async fn run(mut self) {
        while let Some((span, event)) = self.receiver.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
            if self.state == SessionState::ShuttingDown {
                break;
            }
        }
        info!("reactor loop ended");
    }

    pub fn session_state(&self) -> SessionState {
        self.state
    }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Driver(event) => self.handle_driver_event(event),
            Event::Command(command) => self.handle_command(command),
            Event::ConfigUpdated(config) => self.apply_config(*config),
            Event::Shutdown => self.shutdown(),
        }
    }

    fn handle_driver_event(&mut self, event: DriverEvent) {
        use DriverEvent::*;
        match event {
            Connected { screens, windows } => self.on_connected(screens, windows),
            WindowMapped(window) => self.manage_window(window, true),
            WindowUnmapped(id) => self.on_unmapped(id),
            WindowTitleChanged(window, title) => {
                self.registry.set_title(window, title);
                self.publish_state();
            }
            KeyPressed { modifiers, key } => {
                // Escape aborts a drag in flight and restores the frame the
                // drag started from.
                if self.drags.is_active() && key == KeyCode::Escape && modifiers.is_empty() {
                    if let Some((window, frame)) = self.drags.cancel() {
                        self.place_floating(window, frame);
                    }
                    return;
                }
                let Some(command) = self.bindings.dispatch(modifiers, key).cloned() else {
                    return;
                };
                self.handle_command(command);
            }
            ButtonPressed {
                modifiers,
                button,
                window,
                position,
            } => {
                let Some(action) = self.bindings.drag_action(modifiers, button) else {
                    return;
                };
                self.on_drag_binding(action, window, position);
            }
            ButtonReleased { position, .. } => {
                if let Some((window, frame)) = self.drags.end(position) {
                    self.place_floating(window, frame);
                }
            }
            PointerMotion { position } => {
                if let Some((window, frame)) = self.drags.update(position) {
                    self.place_floating(window, frame);
                }
            }
            FocusChanged(window) => self.on_focus_changed(window),
            ScreensChanged(screens) => {
                self.screens = screens;
                self.refresh_visible_groups();
            }
            ConnectionLost => {
                error!("display driver connection lost; shutting down");
                self.end_session(false);
            }
        }
    }

    fn on_connected(&mut self, screens: Vec<Screen>, windows: Vec<DriverWindow>) {
        let first_connect = self.state == SessionState::Starting;
        self.screens = screens;
        for window in windows {
            self.manage_window(window, false);
        }
        self.state = SessionState::Running;
        info!(
            screens = self.screens.len(),
            windows = self.registry.len(),
            "session running"
        );
        if first_connect {
            process::execute_startup_commands(&self.config.settings.autostart);
        }
        self.refresh_visible_groups();
        if let Some(window) = self.selected_on_focused_screen() {
            self.focus_window(window);
        }
        self.publish_state();
    }

    /// Screen that last had input focus, falling back to the first screen.
    fn focused_screen(&self) -> Option<&Screen> {
        if let Some(focused) = self.registry.focused()
            && let Some(state) = self.registry.get(focused)
        {
            let center = state.frame.center();
            if let Some(screen) = self.screens.iter().find(|s| s.frame.contains(center)) {
                return Some(screen);
            }
        }
        self.screens.first()
    }

    fn screen_showing(&self, group: GroupId) -> Option<&Screen> {
        self.screens.iter().find(|s| self.groups.active_group(s.id) == group)
    }

    fn active_group(&self) -> GroupId {
        let screen = self.focused_screen().map(|s| s.id).unwrap_or(ScreenId(0));
        self.groups.active_group(screen)
    }

    fn selected_on_focused_screen(&mut self) -> Option<WindowId> {
        let group = self.active_group();
        self.layout.selected_window(group)
    }

    fn manage_window(&mut self, window: DriverWindow, focus: bool) {
        let id = window.id;
        let new = self.registry.register(&window);
        let group = self.active_group();
        if new && let Err(e) = self.groups.add_window(group, id) {
            warn!(window = %id, "could not group window: {e}");
            return;
        }
        debug!(window = %id, %group, "managing window");
        self.refresh_group(group);
        if focus {
            if self.registry.is_floating(id) {
                _ = self.driver.raise(id);
            } else {
                self.layout.select_window(group, id);
            }
            self.focus_window(id);
        }
        self.publish_state();
    }

    fn on_unmapped(&mut self, id: WindowId) {
        self.drags.abort_for_window(id);
        if !self.registry.unregister(id) {
            return;
        }
        self.hidden.remove(&id);
        let Some(group) = self.groups.remove_window(id) else {
            return;
        };
        self.refresh_group(group);
        if self.registry.focused().is_none()
            && let Some(next) = self.layout.selected_window(group)
        {
            self.focus_window(next);
        }
        self.publish_state();
    }

    /// Starts or executes a pointer binding. Move and resize drags force the
    /// window floating first, like the original middle-click raise they act
    /// on whatever window is under the pointer.
    fn on_drag_binding(&mut self, action: DragAction, window: Option<WindowId>, position: Point) {
        let Some(window) = window else { return };
        if !self.registry.contains(window) {
            return;
        }
        if action == DragAction::RaiseWindow {
            _ = self.driver.raise(window);
            return;
        }
        if !self.registry.is_floating(window) {
            self.set_floating(window, true);
        }
        let Some(baseline) = self.registry.get(window).map(|w| w.frame) else {
            return;
        };
        self.drags.start(window, action, position, baseline);
    }

    /// Adopts a server-side focus change. The focus already moved, so only
    /// internal state follows; no `set_focus` or raise goes back out.
    fn on_focus_changed(&mut self, window: WindowId) {
        if !self.config.settings.follow_mouse_focus || self.drags.is_active() {
            return;
        }
        if !self.registry.contains(window) || self.registry.focused() == Some(window) {
            return;
        }
        self.registry.set_focused(Some(window));
        self.groups.set_last_focused(window);
        if let Some(group) = self.groups.group_of(window) {
            self.layout.select_window(group, window);
        }
        self.publish_state();
    }

    fn place_floating(&mut self, window: WindowId, frame: Rect) {
        let frame = frame.round();
        self.registry.set_frame(window, frame);
        if let Err(e) = self.driver.move_resize(window, frame) {
            warn!(%window, "could not place window: {e}");
        }
    }

    fn set_floating(&mut self, window: WindowId, floating: bool) {
        let Some(state) = self.registry.get(window) else {
            return;
        };
        if state.floating != floating {
            _ = self.registry.toggle_floating(window);
        }
        if let Some(group) = self.groups.group_of(window) {
            self.refresh_group(group);
        }
        if floating {
            _ = self.driver.raise(window);
        }
    }

    #[instrument(name = "reactor::handle_command", skip(self))]
    pub fn handle_command(&mut self, command: WmCommand) {
        use WmCommand::*;
        let layout_command = match command {
            FocusLeft => Some(LayoutCommand::MoveFocus(Direction::Left)),
            FocusRight => Some(LayoutCommand::MoveFocus(Direction::Right)),
            FocusUp => Some(LayoutCommand::MoveFocus(Direction::Up)),
            FocusDown => Some(LayoutCommand::MoveFocus(Direction::Down)),
            FocusNext => Some(LayoutCommand::NextWindow),
            ShuffleLeft => Some(LayoutCommand::MoveWindow(Direction::Left)),
            ShuffleRight => Some(LayoutCommand::MoveWindow(Direction::Right)),
            ShuffleUp => Some(LayoutCommand::MoveWindow(Direction::Up)),
            ShuffleDown => Some(LayoutCommand::MoveWindow(Direction::Down)),
            GrowLeft => Some(LayoutCommand::Grow(Direction::Left)),
            GrowRight => Some(LayoutCommand::Grow(Direction::Right)),
            GrowUp => Some(LayoutCommand::Grow(Direction::Up)),
            GrowDown => Some(LayoutCommand::Grow(Direction::Down)),
            Normalize => Some(LayoutCommand::Normalize),
            ToggleSplit => Some(LayoutCommand::ToggleSplit),
            NextLayout => Some(LayoutCommand::NextLayout),
            ToggleFloating => {
                if let Some(window) = self.registry.focused() {
                    let floating = !self.registry.is_floating(window);
                    self.set_floating(window, floating);
                    self.publish_state();
                }
                None
            }
            KillWindow => {
                if let Some(window) = self.registry.focused()
                    && let Err(e) = self.driver.kill(window)
                {
                    warn!(%window, "kill failed: {e}");
                }
                None
            }
            Spawn(ref exec) => {
                if let Err(e) = exec.spawn() {
                    error!("spawn failed: {e}");
                }
                None
            }
            SwitchToGroup(ref name) => {
                self.switch_to_group_by_name(name);
                None
            }
            MoveWindowToGroup { ref group, switch } => {
                self.move_focused_to_group(group, switch);
                None
            }
            Restart => {
                self.restart();
                None
            }
            Shutdown => {
                self.shutdown();
                None
            }
        };

        if let Some(layout_command) = layout_command {
            let group = self.active_group();
            let outcome = self.layout.handle_command(group, &layout_command);
            if let Some(order) = outcome.order {
                self.groups.set_order(group, &order);
            }
            if outcome.changed {
                self.refresh_group(group);
            }
            if let Some(window) = outcome.focus_window {
                self.focus_window(window);
            }
            self.publish_state();
        }
    }

    fn switch_to_group_by_name(&mut self, name: &str) {
        let target = match self.groups.resolve(name) {
            Ok(target) => target,
            Err(e) => {
                warn!("switch failed: {e}");
                return;
            }
        };
        let screen = match self.focused_screen() {
            Some(screen) => screen.id,
            None => return,
        };
        self.switch_to_group(screen, target);
    }

    fn switch_to_group(&mut self, screen: ScreenId, target: GroupId) {
        let switch = match self.groups.switch_to(screen, target) {
            Ok(Some(switch)) => switch,
            Ok(None) => return,
            Err(e) => {
                warn!("switch failed: {e}");
                return;
            }
        };
        debug!(%target, "switching group");
        for window in switch.hidden {
            self.hide_window(window);
        }
        for window in switch.shown {
            self.show_window(window);
        }
        self.refresh_group(target);
        let focus = self
            .groups
            .group(target)
            .and_then(|g| g.last_focused())
            .or_else(|| self.layout.selected_window(target));
        match focus {
            Some(window) => self.focus_window(window),
            None => self.registry.set_focused(None),
        }
        self.publish_state();
    }

    fn move_focused_to_group(&mut self, name: &str, switch: bool) {
        let target = match self.groups.resolve(name) {
            Ok(target) => target,
            Err(e) => {
                warn!("move failed: {e}");
                return;
            }
        };
        let Some(window) = self.registry.focused() else {
            return;
        };
        let source = self.groups.group_of(window);
        match self.groups.move_window(window, target) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!("move failed: {e}");
                return;
            }
        }
        if let Some(source) = source {
            self.refresh_group(source);
        }
        let screen = self.focused_screen().map(|s| s.id);
        let target_visible = self.screen_showing(target).is_some();
        if target_visible {
            self.refresh_group(target);
        } else if switch {
            if let Some(screen) = screen {
                self.switch_to_group(screen, target);
            }
        } else {
            self.hide_window(window);
            self.sync_group_layouts(target);
            if let Some(source) = source
                && let Some(next) = self.layout.selected_window(source)
            {
                self.focus_window(next);
            }
        }
        self.publish_state();
    }

    /// Tiled members of a group, in group order.
    fn tiled_windows(&self, group: GroupId) -> Vec<WindowId> {
        self.groups
            .windows_in(group)
            .iter()
            .copied()
            .filter(|w| self.registry.contains(*w) && !self.registry.is_floating(*w))
            .collect()
    }

    fn sync_group_layouts(&mut self, group: GroupId) {
        let tiled = self.tiled_windows(group);
        self.layout.sync_group(group, &tiled);
        let order = self.layout.window_order(group);
        self.groups.set_order(group, &order);
    }

    /// Re-tiles a group if a screen currently shows it.
    fn refresh_group(&mut self, group: GroupId) {
        self.sync_group_layouts(group);
        let Some(screen) = self.screen_showing(group) else {
            return;
        };
        let bounds = screen.tiling_bounds(self.config.settings.gap);
        let arranged = self.layout.arrange(group, bounds);
        let visible: HashSet<WindowId> = arranged.iter().map(|(w, _)| *w).collect();
        for (window, frame) in arranged {
            let frame = frame.round();
            self.registry.set_frame(window, frame);
            if let Err(e) = self.driver.move_resize(window, frame) {
                warn!(%window, "could not place window: {e}");
            }
        }
        for window in self.groups.windows_in(group).to_vec() {
            if visible.contains(&window) || self.registry.is_floating(window) {
                self.show_window(window);
            } else {
                self.hide_window(window);
            }
        }
    }

    fn refresh_visible_groups(&mut self) {
        let visible: Vec<GroupId> =
            self.screens.iter().map(|s| self.groups.active_group(s.id)).collect();
        for group in visible {
            self.refresh_group(group);
        }
    }

    fn hide_window(&mut self, window: WindowId) {
        if self.hidden.insert(window) {
            if let Err(e) = self.driver.hide(window) {
                warn!(%window, "hide failed: {e}");
            }
        }
    }

    fn show_window(&mut self, window: WindowId) {
        if self.hidden.remove(&window) {
            if let Err(e) = self.driver.show(window) {
                warn!(%window, "show failed: {e}");
            }
        }
    }

    fn focus_window(&mut self, window: WindowId) {
        if !self.registry.contains(window) {
            return;
        }
        self.registry.set_focused(Some(window));
        self.groups.set_last_focused(window);
        if let Some(group) = self.groups.group_of(window) {
            self.layout.select_window(group, window);
        }
        if let Err(e) = self.driver.set_focus(window) {
            warn!(%window, "focus failed: {e}");
        }
        _ = self.driver.raise(window);
    }

    /// Reattach: rebuild window state from the live driver list while the
    /// layout state stays in place.
    fn restart(&mut self) {
        info!("restarting session");
        self.state = SessionState::Restarting;
        if let Err(e) = self.layout.save(self.restore_path.clone()) {
            warn!("could not save layout state: {e}");
        }
        if let Some(path) = self.config_path.clone() {
            match Config::read(&path) {
                Ok(config) => self.apply_config(config),
                Err(e) => warn!("restart kept the previous config: {e}"),
            }
        }
        let live = match self.driver.list_windows() {
            Ok(live) => live,
            Err(e) => {
                error!("restart failed, driver gone: {e}");
                self.state = SessionState::ShuttingDown;
                return;
            }
        };
        let live_ids: HashSet<WindowId> = live.iter().map(|w| w.id).collect();
        for id in self.registry.ids().collect::<Vec<_>>() {
            if !live_ids.contains(&id) {
                self.registry.unregister(id);
                self.groups.remove_window(id);
                self.hidden.remove(&id);
            }
        }
        for window in live {
            if !self.registry.contains(window.id) {
                self.manage_window(window, false);
            }
        }
        self.state = SessionState::Running;
        self.refresh_visible_groups();
        self.publish_state();
        info!("session restarted");
    }

    fn shutdown(&mut self) {
        self.end_session(true);
    }

    /// Common teardown. A lost driver connection skips `release`; everything
    /// else still runs so layout state lands on disk and the bar stops.
    fn end_session(&mut self, release_driver: bool) {
        if self.state == SessionState::ShuttingDown {
            return;
        }
        info!("shutting down");
        self.state = SessionState::ShuttingDown;
        if let Err(e) = self.layout.save(self.restore_path.clone()) {
            warn!("could not save layout state: {e}");
        }
        if release_driver && let Err(e) = self.driver.release() {
            warn!("driver release failed: {e}");
        }
        if let Some(bar_tx) = &self.bar_tx {
            bar_tx.send(bar::Event::Shutdown);
        }
    }

    fn apply_config(&mut self, config: Config) {
        match BindingTable::from_config(&config) {
            Ok(bindings) => self.bindings = bindings,
            Err(e) => {
                error!("config reload rejected: {e}");
                return;
            }
        }
        self.groups.apply_names(&config.groups);
        self.layout.set_templates(&config.layouts);
        self.layout.retain_groups(config.groups.len());
        self.registry.set_float_rules(&config.float_rules);
        self.config = config;
        info!("configuration reloaded");
        self.refresh_visible_groups();
        self.publish_state();
    }

    /// Pushes a state snapshot to the bar. Identical snapshots are dropped
    /// on the bar side.
    fn publish_state(&mut self) {
        let Some(bar_tx) = &self.bar_tx else { return };
        let active = self.active_group();
        let groups = self
            .groups
            .group_names()
            .enumerate()
            .map(|(index, name)| GroupStatus {
                name: name.to_string(),
                active: GroupId(index) == active,
                populated: !self.groups.windows_in(GroupId(index)).is_empty(),
            })
            .collect();
        let snapshot = WmSnapshot {
            groups,
            focused_title: self.registry.focused_title().map(String::from),
            layout_name: self.layout.active_layout_name(active).to_string(),
        };
        bar_tx.send(bar::Event::State(snapshot));
    }
}

#[cfg(test)]
mod tests;
