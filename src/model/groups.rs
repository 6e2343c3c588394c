//! Named groups of windows, one visible per screen. The manager upholds a
//! single invariant here: every managed window belongs to exactly one group.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::collections::HashMap;
use crate::sys::driver::WindowId;
use crate::sys::screen::ScreenId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GroupId(pub usize);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    UnknownGroup(String),
    InvalidGroupId(GroupId),
}

impl std::fmt::Display for GroupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupError::UnknownGroup(name) => write!(f, "unknown group: {}", name),
            GroupError::InvalidGroupId(id) => write!(f, "invalid group id: {}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Window order here is the layout order for the group.
    windows: Vec<WindowId>,
    last_focused: Option<WindowId>,
}

impl Group {
    fn new(name: String) -> Self {
        Self {
            name,
            windows: Vec::new(),
            last_focused: None,
        }
    }

    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains(&id)
    }

    pub fn last_focused(&self) -> Option<WindowId> {
        self.last_focused
    }

    pub fn set_last_focused(&mut self, id: Option<WindowId>) {
        self.last_focused = id;
    }

    fn remove(&mut self, id: WindowId) -> bool {
        if self.last_focused == Some(id) {
            self.last_focused = None;
        }
        let before = self.windows.len();
        self.windows.retain(|w| *w != id);
        self.windows.len() != before
    }
}

/// Outcome of a group switch, telling the reactor what to hide and show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSwitch {
    pub screen: ScreenId,
    pub hidden: Vec<WindowId>,
    pub shown: Vec<WindowId>,
}

#[derive(Serialize, Deserialize)]
pub struct GroupManager {
    groups: Vec<Group>,
    /// Which group is visible on each screen.
    active: HashMap<ScreenId, GroupId>,
    /// Reverse index upholding the one-group-per-window invariant.
    membership: HashMap<WindowId, GroupId>,
}

impl GroupManager {
    pub fn new(names: &[String]) -> Self {
        GroupManager {
            groups: names.iter().cloned().map(Group::new).collect(),
            active: HashMap::default(),
            membership: HashMap::default(),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    pub fn resolve(&self, name: &str) -> Result<GroupId, GroupError> {
        self.groups
            .iter()
            .position(|g| g.name == name)
            .map(GroupId)
            .ok_or_else(|| GroupError::UnknownGroup(name.to_string()))
    }

    pub fn active_group(&self, screen: ScreenId) -> GroupId {
        self.active.get(&screen).copied().unwrap_or(GroupId(0))
    }

    pub fn group_of(&self, id: WindowId) -> Option<GroupId> {
        self.membership.get(&id).copied()
    }

    pub fn windows_in(&self, id: GroupId) -> &[WindowId] {
        self.groups.get(id.0).map(|g| g.windows()).unwrap_or(&[])
    }

    /// Adds a window to a group. If it already belongs to another group it
    /// is moved, keeping the invariant intact.
    pub fn add_window(&mut self, group: GroupId, window: WindowId) -> Result<(), GroupError> {
        if group.0 >= self.groups.len() {
            return Err(GroupError::InvalidGroupId(group));
        }
        if let Some(current) = self.membership.get(&window).copied() {
            if current == group {
                return Ok(());
            }
            warn!(window = %window, from = %current, to = %group, "window already grouped; moving");
            self.groups[current.0].remove(window);
        }
        self.groups[group.0].windows.push(window);
        self.membership.insert(window, group);
        Ok(())
    }

    /// Removes a window from whichever group holds it.
    pub fn remove_window(&mut self, window: WindowId) -> Option<GroupId> {
        let group = self.membership.remove(&window)?;
        self.groups[group.0].remove(window);
        Some(group)
    }

    /// Makes `target` the visible group on `screen`. Switching to the group
    /// that is already active is a no-op and returns `None`.
    pub fn switch_to(
        &mut self,
        screen: ScreenId,
        target: GroupId,
    ) -> Result<Option<GroupSwitch>, GroupError> {
        if target.0 >= self.groups.len() {
            return Err(GroupError::InvalidGroupId(target));
        }
        let current = self.active_group(screen);
        if current == target {
            return Ok(None);
        }
        self.active.insert(screen, target);
        Ok(Some(GroupSwitch {
            screen,
            hidden: self.groups[current.0].windows.clone(),
            shown: self.groups[target.0].windows.clone(),
        }))
    }

    /// Moves a window into `target`. Returns whether anything changed.
    pub fn move_window(&mut self, window: WindowId, target: GroupId) -> Result<bool, GroupError> {
        if target.0 >= self.groups.len() {
            return Err(GroupError::InvalidGroupId(target));
        }
        match self.membership.get(&window).copied() {
            Some(current) if current == target => Ok(false),
            Some(current) => {
                self.groups[current.0].remove(window);
                self.groups[target.0].windows.push(window);
                self.membership.insert(window, target);
                Ok(true)
            }
            None => {
                self.groups[target.0].windows.push(window);
                self.membership.insert(window, target);
                Ok(true)
            }
        }
    }

    /// Rewrites a group's window order. Only current members are kept;
    /// members missing from `order` stay at the end in their old order.
    pub fn set_order(&mut self, group: GroupId, order: &[WindowId]) {
        let Some(entry) = self.groups.get_mut(group.0) else {
            return;
        };
        let mut next: Vec<WindowId> =
            order.iter().copied().filter(|w| entry.windows.contains(w)).collect();
        for window in &entry.windows {
            if !next.contains(window) {
                next.push(*window);
            }
        }
        entry.windows = next;
    }

    pub fn set_last_focused(&mut self, window: WindowId) {
        if let Some(group) = self.membership.get(&window).copied() {
            self.groups[group.0].set_last_focused(Some(window));
        }
    }

    /// Reconciles group names after a config reload. Windows in groups that
    /// disappeared fall back to the first group.
    pub fn apply_names(&mut self, names: &[String]) {
        let mut next: Vec<Group> = names.iter().cloned().map(Group::new).collect();
        let mut orphans: Vec<WindowId> = Vec::new();
        for old in self.groups.drain(..) {
            match next.iter_mut().find(|g| g.name == old.name) {
                Some(target) => {
                    target.windows = old.windows;
                    target.last_focused = old.last_focused;
                }
                None => orphans.extend(old.windows),
            }
        }
        if !orphans.is_empty() {
            if let Some(first) = next.first_mut() {
                warn!(count = orphans.len(), "groups removed; windows moved to first group");
                first.windows.extend(orphans.iter().copied());
            }
        }
        self.groups = next;
        self.membership.clear();
        for (index, group) in self.groups.iter().enumerate() {
            for window in &group.windows {
                self.membership.insert(*window, GroupId(index));
            }
        }
        let max = GroupId(self.groups.len().saturating_sub(1));
        for active in self.active.values_mut() {
            if *active > max {
                *active = GroupId(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn manager() -> GroupManager {
        GroupManager::new(&["web".into(), "code".into(), "chat".into()])
    }

    #[test]
    fn resolve_maps_names_to_ordered_ids() {
        let groups = manager();
        assert_eq!(groups.resolve("web").unwrap(), GroupId(0));
        assert_eq!(groups.resolve("chat").unwrap(), GroupId(2));
        assert!(matches!(groups.resolve("mail"), Err(GroupError::UnknownGroup(_))));
    }

    #[test]
    fn a_window_belongs_to_exactly_one_group() {
        let mut groups = manager();
        groups.add_window(GroupId(0), WindowId(1)).unwrap();
        groups.add_window(GroupId(1), WindowId(1)).unwrap();
        assert_eq!(groups.group_of(WindowId(1)), Some(GroupId(1)));
        assert!(!groups.group(GroupId(0)).unwrap().contains(WindowId(1)));
    }

    #[test]
    fn switch_to_same_group_is_noop() {
        let mut groups = manager();
        let screen = ScreenId(0);
        assert_eq!(groups.switch_to(screen, GroupId(0)).unwrap(), None);
        let switch = groups.switch_to(screen, GroupId(1)).unwrap().unwrap();
        assert_eq!(switch.screen, screen);
        assert_eq!(groups.active_group(screen), GroupId(1));
        assert_eq!(groups.switch_to(screen, GroupId(1)).unwrap(), None);
    }

    #[test]
    fn switch_reports_hidden_and_shown_windows() {
        let mut groups = manager();
        groups.add_window(GroupId(0), WindowId(1)).unwrap();
        groups.add_window(GroupId(0), WindowId(2)).unwrap();
        groups.add_window(GroupId(1), WindowId(3)).unwrap();
        let switch = groups.switch_to(ScreenId(0), GroupId(1)).unwrap().unwrap();
        assert_eq!(switch.hidden, vec![WindowId(1), WindowId(2)]);
        assert_eq!(switch.shown, vec![WindowId(3)]);
    }

    #[test]
    fn move_window_returns_whether_anything_changed() {
        let mut groups = manager();
        groups.add_window(GroupId(0), WindowId(1)).unwrap();
        assert!(groups.move_window(WindowId(1), GroupId(2)).unwrap());
        assert!(!groups.move_window(WindowId(1), GroupId(2)).unwrap());
        assert_eq!(groups.group_of(WindowId(1)), Some(GroupId(2)));
    }

    #[test]
    fn invalid_group_id_is_an_error() {
        let mut groups = manager();
        assert!(matches!(
            groups.move_window(WindowId(1), GroupId(9)),
            Err(GroupError::InvalidGroupId(_))
        ));
        assert!(matches!(
            groups.switch_to(ScreenId(0), GroupId(9)),
            Err(GroupError::InvalidGroupId(_))
        ));
    }

    #[test]
    fn apply_names_rehomes_windows_from_removed_groups() {
        let mut groups = manager();
        groups.add_window(GroupId(2), WindowId(5)).unwrap();
        groups.apply_names(&["web".into(), "code".into()]);
        assert_eq!(groups.group_of(WindowId(5)), Some(GroupId(0)));
        assert!(groups.group(GroupId(0)).unwrap().contains(WindowId(5)));
    }
}
