//! Bookkeeping for every window the manager has been told about. The
//! registry is the single source of truth for per-window metadata; group
//! membership and layout order live elsewhere.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::collections::HashMap;
use crate::common::config::FloatRule;
use crate::sys::driver::{DriverWindow, WindowId};
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowState {
    pub frame: Rect,
    pub title: String,
    pub wm_class: String,
    pub floating: bool,
}

struct CompiledFloatRule {
    wm_class: Option<String>,
    title_regex: Option<Regex>,
}

impl CompiledFloatRule {
    fn matches(&self, window: &DriverWindow) -> bool {
        if let Some(ref class) = self.wm_class
            && class != &window.wm_class
        {
            return false;
        }
        if let Some(ref re) = self.title_regex
            && !re.is_match(&window.title)
        {
            return false;
        }
        self.wm_class.is_some() || self.title_regex.is_some()
    }
}

#[derive(Default)]
pub struct WindowRegistry {
    windows: HashMap<WindowId, WindowState>,
    float_rules: Vec<CompiledFloatRule>,
    focused: Option<WindowId>,
}

impl WindowRegistry {
    pub fn new(float_rules: &[FloatRule]) -> Self {
        let mut registry = WindowRegistry::default();
        registry.set_float_rules(float_rules);
        registry
    }

    /// Replaces the float rules, e.g. after a config reload. Rules that fail
    /// to compile were already rejected by config validation, so a failure
    /// here only warns.
    pub fn set_float_rules(&mut self, rules: &[FloatRule]) {
        self.float_rules = rules
            .iter()
            .filter_map(|rule| {
                let title_regex = match rule.title_regex.as_deref().map(Regex::new) {
                    Some(Ok(re)) => Some(re),
                    Some(Err(e)) => {
                        warn!("skipping float rule with bad regex: {e}");
                        return None;
                    }
                    None => None,
                };
                Some(CompiledFloatRule {
                    wm_class: rule.wm_class.clone(),
                    title_regex,
                })
            })
            .collect();
    }

    /// Registers a newly mapped window. Registering an id twice refreshes
    /// the stored metadata instead of duplicating it.
    pub fn register(&mut self, window: &DriverWindow) -> bool {
        let floating = self.float_rules.iter().any(|rule| rule.matches(window));
        let state = WindowState {
            frame: window.frame,
            title: window.title.clone(),
            wm_class: window.wm_class.clone(),
            floating,
        };
        if let Some(existing) = self.windows.get_mut(&window.id) {
            warn!(window = %window.id, "window registered twice; refreshing state");
            *existing = state;
            false
        } else {
            self.windows.insert(window.id, state);
            true
        }
    }

    /// Forgets a window. Unregistering an unknown id is a no-op.
    pub fn unregister(&mut self, id: WindowId) -> bool {
        if self.focused == Some(id) {
            self.focused = None;
        }
        if self.windows.remove(&id).is_none() {
            warn!(window = %id, "unregister for unknown window");
            false
        } else {
            true
        }
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowState> {
        self.windows.get(&id)
    }

    pub fn set_title(&mut self, id: WindowId, title: String) {
        if let Some(state) = self.windows.get_mut(&id) {
            state.title = title;
        }
    }

    pub fn set_frame(&mut self, id: WindowId, frame: Rect) {
        if let Some(state) = self.windows.get_mut(&id) {
            state.frame = frame;
        }
    }

    pub fn is_floating(&self, id: WindowId) -> bool {
        self.windows.get(&id).map(|w| w.floating).unwrap_or(false)
    }

    pub fn toggle_floating(&mut self, id: WindowId) -> Option<bool> {
        let state = self.windows.get_mut(&id)?;
        state.floating = !state.floating;
        Some(state.floating)
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn set_focused(&mut self, id: Option<WindowId>) {
        self.focused = id;
    }

    pub fn focused_title(&self) -> Option<&str> {
        self.focused.and_then(|id| self.windows.get(&id)).map(|w| w.title.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: u32, title: &str, class: &str) -> DriverWindow {
        DriverWindow {
            id: WindowId(id),
            frame: Rect::new(0.0, 0.0, 100.0, 100.0),
            title: title.to_string(),
            wm_class: class.to_string(),
        }
    }

    #[test]
    fn register_twice_refreshes_without_duplicating() {
        let mut registry = WindowRegistry::default();
        assert!(registry.register(&window(1, "a", "term")));
        assert!(!registry.register(&window(1, "b", "term")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(WindowId(1)).unwrap().title, "b");
    }

    #[test]
    fn unregister_unknown_is_a_noop() {
        let mut registry = WindowRegistry::default();
        assert!(!registry.unregister(WindowId(7)));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_clears_focus() {
        let mut registry = WindowRegistry::default();
        registry.register(&window(1, "a", "term"));
        registry.set_focused(Some(WindowId(1)));
        registry.unregister(WindowId(1));
        assert_eq!(registry.focused(), None);
    }

    #[test]
    fn float_rules_apply_on_register() {
        let rules = vec![
            FloatRule {
                wm_class: Some("pinentry".to_string()),
                title_regex: None,
            },
            FloatRule {
                wm_class: None,
                title_regex: Some("^Confirm".to_string()),
            },
        ];
        let mut registry = WindowRegistry::new(&rules);
        registry.register(&window(1, "gpg", "pinentry"));
        registry.register(&window(2, "Confirm quit", "firefox"));
        registry.register(&window(3, "editor", "emacs"));
        assert!(registry.is_floating(WindowId(1)));
        assert!(registry.is_floating(WindowId(2)));
        assert!(!registry.is_floating(WindowId(3)));
    }

    #[test]
    fn toggle_floating_flips_and_reports() {
        let mut registry = WindowRegistry::default();
        registry.register(&window(1, "a", "term"));
        assert_eq!(registry.toggle_floating(WindowId(1)), Some(true));
        assert_eq!(registry.toggle_floating(WindowId(1)), Some(false));
        assert_eq!(registry.toggle_floating(WindowId(9)), None);
    }
}
