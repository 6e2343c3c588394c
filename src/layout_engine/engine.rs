use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::collections::HashMap;
use crate::common::config::LayoutConfig;
use crate::layout_engine::systems::{Direction, GROW_STEP, LayoutSystem, LayoutSystemKind};
use crate::model::GroupId;
use crate::sys::driver::WindowId;
use crate::sys::geometry::Rect;

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MoveFocus(Direction),
    NextWindow,
    MoveWindow(Direction),
    Grow(Direction),
    Normalize,
    ToggleSplit,
    NextLayout,
}

/// What the caller must do after a command: refocus, and re-arrange if the
/// visible geometry may have changed.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOutcome {
    pub focus_window: Option<WindowId>,
    pub changed: bool,
    /// Present when the command reordered the group's windows; the group's
    /// list must be updated to match so layouts stay in agreement.
    pub order: Option<Vec<WindowId>>,
}

/// Every group carries one instance of each configured layout; `active`
/// picks which one arranges the group right now.
#[derive(Serialize, Deserialize)]
struct GroupLayouts {
    systems: Vec<LayoutSystemKind>,
    active: usize,
}

impl GroupLayouts {
    fn from_templates(templates: &[LayoutConfig]) -> Self {
        GroupLayouts {
            systems: templates.iter().map(LayoutSystemKind::from_config).collect(),
            active: 0,
        }
    }

    fn active_system(&self) -> &LayoutSystemKind {
        &self.systems[self.active]
    }

    fn active_system_mut(&mut self) -> &mut LayoutSystemKind {
        &mut self.systems[self.active]
    }
}

#[derive(Serialize, Deserialize)]
pub struct LayoutEngine {
    groups: HashMap<GroupId, GroupLayouts>,
    #[serde(skip)]
    templates: Vec<LayoutConfig>,
}

impl LayoutEngine {
    pub fn new(templates: &[LayoutConfig]) -> Self {
        LayoutEngine {
            groups: HashMap::default(),
            templates: templates.to_vec(),
        }
    }

    /// Loads saved layout state, falling back to a fresh engine when the
    /// file is missing, unreadable, or was saved under a different layout
    /// configuration.
    pub fn restore(path: &Path, templates: &[LayoutConfig]) -> Self {
        match Self::load(path.to_path_buf()) {
            Ok(mut engine) => {
                engine.templates = templates.to_vec();
                if engine.matches_templates() {
                    return engine;
                }
                warn!("saved layout state does not match configured layouts; starting fresh");
                LayoutEngine::new(templates)
            }
            Err(e) => {
                if path.exists() {
                    warn!("could not restore layout state: {e}");
                }
                LayoutEngine::new(templates)
            }
        }
    }

    pub fn load(path: PathBuf) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)?.write_all(self.serialize_to_string().as_bytes())?;
        Ok(())
    }

    pub fn serialize_to_string(&self) -> String {
        ron::ser::to_string(&self).unwrap()
    }

    fn matches_templates(&self) -> bool {
        let kinds: Vec<&str> = self
            .templates
            .iter()
            .map(|t| t.kind_name())
            .collect();
        self.groups.values().all(|g| {
            g.active < g.systems.len()
                && g.systems.len() == kinds.len()
                && g.systems.iter().zip(&kinds).all(|(s, k)| s.kind_name() == *k)
        })
    }

    /// Rebuilds templates after a config reload. Groups whose saved systems
    /// no longer match are reset.
    pub fn set_templates(&mut self, templates: &[LayoutConfig]) {
        self.templates = templates.to_vec();
        let kinds: Vec<&str> = templates.iter().map(|t| t.kind_name()).collect();
        for layouts in self.groups.values_mut() {
            let matches = layouts.systems.len() == kinds.len()
                && layouts.systems.iter().zip(&kinds).all(|(s, k)| s.kind_name() == *k);
            if !matches {
                let order = layouts.active_system().window_order();
                *layouts = GroupLayouts::from_templates(templates);
                for system in &mut layouts.systems {
                    system.sync_windows(&order);
                }
            }
        }
    }

    fn group_mut(&mut self, group: GroupId) -> &mut GroupLayouts {
        self.groups
            .entry(group)
            .or_insert_with(|| GroupLayouts::from_templates(&self.templates))
    }

    /// Reconciles every layout of the group against its window list, so a
    /// later layout switch sees the same membership.
    pub fn sync_group(&mut self, group: GroupId, windows: &[WindowId]) {
        let layouts = self.group_mut(group);
        for system in &mut layouts.systems {
            system.sync_windows(windows);
        }
    }

    pub fn arrange(&mut self, group: GroupId, bounds: Rect) -> Vec<(WindowId, Rect)> {
        self.group_mut(group).active_system().arrange(bounds)
    }

    pub fn window_order(&mut self, group: GroupId) -> Vec<WindowId> {
        self.group_mut(group).active_system().window_order()
    }

    pub fn selected_window(&mut self, group: GroupId) -> Option<WindowId> {
        self.group_mut(group).active_system().selected_window()
    }

    pub fn select_window(&mut self, group: GroupId, window: WindowId) -> bool {
        self.group_mut(group).active_system_mut().select_window(window)
    }

    pub fn active_layout_name(&mut self, group: GroupId) -> &'static str {
        self.group_mut(group).active_system().kind_name()
    }

    pub fn handle_command(&mut self, group: GroupId, command: &LayoutCommand) -> LayoutOutcome {
        let layouts = self.group_mut(group);
        match command {
            LayoutCommand::MoveFocus(direction) => {
                let focus = layouts.active_system_mut().focus_toward(*direction);
                LayoutOutcome {
                    changed: focus.is_some(),
                    focus_window: focus,
                    order: None,
                }
            }
            LayoutCommand::NextWindow => {
                let focus = layouts.active_system_mut().focus_next();
                LayoutOutcome {
                    changed: focus.is_some(),
                    focus_window: focus,
                    order: None,
                }
            }
            LayoutCommand::MoveWindow(direction) => {
                let system = layouts.active_system_mut();
                if system.shuffle(*direction) {
                    let order = system.window_order();
                    let focus = system.selected_window();
                    // Keep the inactive layouts in the new order too.
                    for other in &mut layouts.systems {
                        other.sync_windows(&order);
                    }
                    LayoutOutcome {
                        focus_window: focus,
                        changed: true,
                        order: Some(order),
                    }
                } else {
                    LayoutOutcome::default()
                }
            }
            LayoutCommand::Grow(direction) => LayoutOutcome {
                focus_window: None,
                changed: layouts.active_system_mut().grow(*direction, GROW_STEP),
                order: None,
            },
            LayoutCommand::Normalize => {
                layouts.active_system_mut().normalize();
                LayoutOutcome {
                    changed: true,
                    ..Default::default()
                }
            }
            LayoutCommand::ToggleSplit => {
                layouts.active_system_mut().toggle_split();
                LayoutOutcome {
                    focus_window: layouts.active_system().selected_window(),
                    changed: true,
                    order: None,
                }
            }
            LayoutCommand::NextLayout => {
                let selected = layouts.active_system().selected_window();
                layouts.active = (layouts.active + 1) % layouts.systems.len();
                if let Some(window) = selected {
                    layouts.active_system_mut().select_window(window);
                }
                LayoutOutcome {
                    focus_window: layouts.active_system().selected_window(),
                    changed: true,
                    order: None,
                }
            }
        }
    }

    /// Drops state for groups that no longer exist after a config reload.
    pub fn retain_groups(&mut self, count: usize) {
        self.groups.retain(|id, _| id.0 < count);
    }
}
