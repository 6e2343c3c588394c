//! Keybinding table. Lookups are exact: the modifier set reported with a
//! key press must equal the bound set. Unbound chords are ignored upstream.

use tracing::debug;

use crate::actor::drag::DragAction;
use crate::actor::reactor::WmCommand;
use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::common::error::ConfigError;
use crate::sys::hotkey::{Button, DragChord, Hotkey, KeyCode, Modifiers};

#[derive(Default)]
pub struct BindingTable {
    keys: HashMap<Hotkey, WmCommand>,
    drags: HashMap<DragChord, DragAction>,
}

impl BindingTable {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut table = BindingTable::default();
        for (hotkey, command) in &config.keys {
            table.register(*hotkey, command.clone())?;
        }
        for (chord, action) in &config.mouse {
            table.register_drag(*chord, *action)?;
        }
        Ok(table)
    }

    pub fn register(&mut self, hotkey: Hotkey, command: WmCommand) -> Result<(), ConfigError> {
        if self.keys.contains_key(&hotkey) {
            return Err(ConfigError::DuplicateBinding(hotkey));
        }
        self.keys.insert(hotkey, command);
        Ok(())
    }

    pub fn register_drag(
        &mut self,
        chord: DragChord,
        action: DragAction,
    ) -> Result<(), ConfigError> {
        if self.drags.contains_key(&chord) {
            return Err(ConfigError::Invalid(vec![format!(
                "duplicate drag binding: {} + {:?}",
                chord.modifiers, chord.button
            )]));
        }
        self.drags.insert(chord, action);
        Ok(())
    }

    /// Exact-match lookup. `None` means the press is not ours and should be
    /// ignored without an error.
    pub fn dispatch(&self, modifiers: Modifiers, key: KeyCode) -> Option<&WmCommand> {
        let hotkey = Hotkey::new(modifiers, key);
        let command = self.keys.get(&hotkey);
        if command.is_none() {
            debug!(%hotkey, "unbound key press");
        }
        command
    }

    pub fn drag_action(&self, modifiers: Modifiers, button: Button) -> Option<DragAction> {
        self.drags.get(&DragChord { modifiers, button }).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn register_rejects_duplicates() {
        let mut table = BindingTable::default();
        let hotkey = Hotkey::from_str("Super + H").unwrap();
        table.register(hotkey, WmCommand::FocusLeft).unwrap();
        let err = table.register(hotkey, WmCommand::FocusRight).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBinding(h) if h == hotkey));
    }

    #[test]
    fn dispatch_requires_an_exact_modifier_match() {
        let mut table = BindingTable::default();
        table
            .register(Hotkey::from_str("Super + H").unwrap(), WmCommand::FocusLeft)
            .unwrap();
        assert_eq!(
            table.dispatch(Modifiers::SUPER, KeyCode::KeyH),
            Some(&WmCommand::FocusLeft)
        );
        assert_eq!(
            table.dispatch(Modifiers::SUPER | Modifiers::SHIFT, KeyCode::KeyH),
            None
        );
        assert_eq!(table.dispatch(Modifiers::empty(), KeyCode::KeyH), None);
    }

    #[test]
    fn drag_chords_resolve_independently_of_keys() {
        let mut table = BindingTable::default();
        table
            .register_drag(
                DragChord::from_str("Super + Button1").unwrap(),
                DragAction::MoveWindow,
            )
            .unwrap();
        assert_eq!(
            table.drag_action(Modifiers::SUPER, Button::Left),
            Some(DragAction::MoveWindow)
        );
        assert_eq!(table.drag_action(Modifiers::SUPER, Button::Right), None);
    }

    #[test]
    fn the_default_config_produces_a_full_table() {
        let table = BindingTable::from_config(&Config::default()).unwrap();
        assert!(table.len() > 20);
        assert_eq!(
            table.drag_action(Modifiers::SUPER, Button::Middle),
            Some(DragAction::RaiseWindow)
        );
    }
}
