use pretty_assertions::assert_eq;
use tempfile::TempDir;
use test_log::test;

use super::*;
use crate::common::config::{FloatRule, LayoutConfig};
use crate::sys::driver::{DriverCall, SimDriver};
use crate::sys::hotkey::{Button, Modifiers};

fn test_config() -> Config {
    let mut config = Config::default();
    config.settings.gap = 0.0;
    config.settings.autostart.clear();
    config.layouts = vec![
        LayoutConfig::Columns { num_columns: 2, margin: 0.0 },
        LayoutConfig::Max {},
    ];
    config
}

struct Harness {
    reactor: Reactor,
    sim: SimDriver,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sim = SimDriver::new();
        let (reactor, _tx) = Reactor::new(
            config,
            Box::new(sim.clone()),
            None,
            dir.path().join("layout.ron"),
            None,
        )
        .unwrap();
        Harness { reactor, sim, _dir: dir }
    }

    fn connect(&mut self, windows: Vec<DriverWindow>) {
        for window in &windows {
            self.sim.add_window(window.clone());
        }
        self.reactor.handle_event(Event::Driver(DriverEvent::Connected {
            screens: vec![Screen::new(ScreenId(0), Rect::new(0.0, 0.0, 1000.0, 1000.0), 0.0)],
            windows,
        }));
        self.sim.take_calls();
    }

    fn driver_event(&mut self, event: DriverEvent) {
        self.reactor.handle_event(Event::Driver(event));
    }

    fn command(&mut self, command: WmCommand) {
        self.reactor.handle_event(Event::Command(command));
    }
}

fn window(id: u32) -> DriverWindow {
    DriverWindow {
        id: WindowId(id),
        frame: Rect::new(0.0, 0.0, 100.0, 100.0),
        title: format!("window {id}"),
        wm_class: "term".to_string(),
    }
}

fn two_windows() -> Vec<DriverWindow> {
    vec![window(1), window(2)]
}

#[test]
fn connecting_tiles_the_existing_windows() {
    let mut h = Harness::new();
    for w in two_windows() {
        h.sim.add_window(w);
    }
    h.reactor.handle_event(Event::Driver(DriverEvent::Connected {
        screens: vec![Screen::new(ScreenId(0), Rect::new(0.0, 0.0, 1000.0, 1000.0), 0.0)],
        windows: two_windows(),
    }));
    assert_eq!(h.reactor.session_state(), SessionState::Running);
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 500.0, 1000.0)));
    assert_eq!(h.sim.applied_frame(WindowId(2)), Some(Rect::new(500.0, 0.0, 500.0, 1000.0)));
}

#[test]
fn mapping_a_window_retiles_and_focuses_it() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::WindowMapped(window(3)));
    assert!(h.sim.applied_frame(WindowId(3)).is_some());
    assert!(h.sim.calls().contains(&DriverCall::SetFocus(WindowId(3))));
}

#[test]
fn unmapping_the_focused_window_refocuses_a_survivor() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::FocusNext);
    h.sim.take_calls();
    h.driver_event(DriverEvent::WindowUnmapped(WindowId(2)));
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
    assert!(h.sim.calls().contains(&DriverCall::SetFocus(WindowId(1))));
}

#[test]
fn unmapping_an_unknown_window_is_harmless() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::WindowUnmapped(WindowId(99)));
    assert_eq!(h.sim.calls(), vec![]);
}

#[test]
fn bound_keys_dispatch_and_unbound_keys_do_nothing() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::KeyPressed {
        modifiers: Modifiers::SUPER,
        key: KeyCode::KeyL,
    });
    assert!(h.sim.calls().contains(&DriverCall::SetFocus(WindowId(2))));

    h.sim.take_calls();
    h.driver_event(DriverEvent::KeyPressed {
        modifiers: Modifiers::ALT,
        key: KeyCode::KeyZ,
    });
    assert_eq!(h.sim.calls(), vec![]);
}

#[test]
fn switching_groups_hides_and_restores_windows() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::SwitchToGroup("2".to_string()));
    let calls = h.sim.take_calls();
    assert!(calls.contains(&DriverCall::Hide(WindowId(1))));
    assert!(calls.contains(&DriverCall::Hide(WindowId(2))));

    // Switching to the group already shown is a no-op.
    h.command(WmCommand::SwitchToGroup("2".to_string()));
    assert_eq!(h.sim.take_calls(), vec![]);

    h.command(WmCommand::SwitchToGroup("1".to_string()));
    let calls = h.sim.take_calls();
    assert!(calls.contains(&DriverCall::Show(WindowId(1))));
    assert!(calls.contains(&DriverCall::Show(WindowId(2))));
}

#[test]
fn switching_to_an_unknown_group_is_an_ignored_error() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::SwitchToGroup("mail".to_string()));
    assert_eq!(h.sim.calls(), vec![]);
    assert_eq!(h.reactor.session_state(), SessionState::Running);
}

#[test]
fn moving_a_window_out_hides_it_and_retiles_the_rest() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::FocusNext);
    h.command(WmCommand::FocusNext);
    // Focused is window 1 again.
    h.sim.take_calls();
    h.command(WmCommand::MoveWindowToGroup {
        group: "3".to_string(),
        switch: false,
    });
    let calls = h.sim.calls();
    assert!(calls.contains(&DriverCall::Hide(WindowId(1))));
    assert_eq!(h.sim.applied_frame(WindowId(2)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
}

#[test]
fn moving_with_switch_follows_the_window() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::MoveWindowToGroup {
        group: "2".to_string(),
        switch: true,
    });
    // Window 1 is visible in group 2, window 2 hidden with group 1.
    let calls = h.sim.calls();
    assert!(calls.contains(&DriverCall::Hide(WindowId(2))));
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
}

#[test]
fn float_rule_windows_are_not_tiled() {
    let mut config = test_config();
    config.float_rules = vec![FloatRule {
        wm_class: Some("pinentry".to_string()),
        title_regex: None,
    }];
    let mut h = Harness::with_config(config);
    h.connect(vec![window(1)]);

    let mut dialog = window(2);
    dialog.wm_class = "pinentry".to_string();
    h.driver_event(DriverEvent::WindowMapped(dialog));

    assert_eq!(h.sim.applied_frame(WindowId(2)), None);
    assert!(h.sim.calls().contains(&DriverCall::Raise(WindowId(2))));
    // The remaining tiled window keeps the whole screen.
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
}

#[test]
fn toggle_floating_removes_the_window_from_tiling() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.sim.take_calls();
    h.command(WmCommand::ToggleFloating);
    assert_eq!(h.sim.applied_frame(WindowId(2)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
}

#[test]
fn a_drag_moves_the_window_and_commits_on_release() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::ButtonPressed {
        modifiers: Modifiers::SUPER,
        button: Button::Left,
        window: Some(WindowId(1)),
        position: Point::new(100.0, 100.0),
    });
    h.driver_event(DriverEvent::PointerMotion {
        position: Point::new(150.0, 130.0),
    });
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(50.0, 30.0, 500.0, 1000.0)));
    h.driver_event(DriverEvent::ButtonReleased {
        button: Button::Left,
        position: Point::new(160.0, 140.0),
    });
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(60.0, 40.0, 500.0, 1000.0)));
    // Motion after release does nothing.
    h.sim.take_calls();
    h.driver_event(DriverEvent::PointerMotion {
        position: Point::new(500.0, 500.0),
    });
    assert_eq!(h.sim.calls(), vec![]);
}

#[test]
fn escape_cancels_a_drag_and_restores_the_frame() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::ButtonPressed {
        modifiers: Modifiers::SUPER,
        button: Button::Left,
        window: Some(WindowId(1)),
        position: Point::new(100.0, 100.0),
    });
    h.driver_event(DriverEvent::PointerMotion {
        position: Point::new(400.0, 400.0),
    });
    h.driver_event(DriverEvent::KeyPressed {
        modifiers: Modifiers::empty(),
        key: KeyCode::Escape,
    });
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 500.0, 1000.0)));
}

#[test]
fn a_vanished_window_aborts_its_drag() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.driver_event(DriverEvent::ButtonPressed {
        modifiers: Modifiers::SUPER,
        button: Button::Left,
        window: Some(WindowId(1)),
        position: Point::new(100.0, 100.0),
    });
    h.driver_event(DriverEvent::WindowUnmapped(WindowId(1)));
    h.sim.take_calls();
    h.driver_event(DriverEvent::PointerMotion {
        position: Point::new(500.0, 500.0),
    });
    assert_eq!(h.sim.calls(), vec![]);
}

#[test]
fn middle_click_binding_raises_without_dragging() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.sim.take_calls();
    h.driver_event(DriverEvent::ButtonPressed {
        modifiers: Modifiers::SUPER,
        button: Button::Middle,
        window: Some(WindowId(2)),
        position: Point::new(700.0, 100.0),
    });
    assert_eq!(h.sim.calls(), vec![DriverCall::Raise(WindowId(2))]);
}

#[test]
fn restart_reattaches_untracked_windows() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.sim.add_window(window(3));
    h.command(WmCommand::Restart);
    assert_eq!(h.reactor.session_state(), SessionState::Running);
    assert!(h.sim.applied_frame(WindowId(3)).is_some());
}

#[test]
fn shutdown_saves_state_and_releases_the_driver() {
    let mut h = Harness::new();
    h.connect(two_windows());
    let restore = h.reactor.restore_path.clone();
    h.reactor.handle_event(Event::Shutdown);
    assert_eq!(h.reactor.session_state(), SessionState::ShuttingDown);
    assert!(h.sim.calls().contains(&DriverCall::Release));
    assert!(restore.exists());
}

#[test]
fn losing_the_driver_connection_shuts_down() {
    let mut h = Harness::new();
    h.connect(two_windows());
    let restore = h.reactor.restore_path.clone();
    h.driver_event(DriverEvent::ConnectionLost);
    assert_eq!(h.reactor.session_state(), SessionState::ShuttingDown);
    // Layout state still lands on disk, but no release goes to a dead
    // driver.
    assert!(restore.exists());
    assert!(!h.sim.calls().contains(&DriverCall::Release));
}

#[test]
fn server_focus_changes_are_adopted_without_an_echo() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.sim.take_calls();
    h.driver_event(DriverEvent::FocusChanged(WindowId(2)));
    assert_eq!(h.reactor.registry.focused(), Some(WindowId(2)));
    assert!(!h.sim.calls().contains(&DriverCall::SetFocus(WindowId(2))));
}

#[test]
fn focus_follows_mouse_off_ignores_server_focus_changes() {
    let mut config = test_config();
    config.settings.follow_mouse_focus = false;
    let mut h = Harness::with_config(config);
    h.connect(two_windows());
    h.driver_event(DriverEvent::FocusChanged(WindowId(2)));
    assert_eq!(h.reactor.registry.focused(), Some(WindowId(1)));
}

#[test]
fn config_reload_applies_new_groups_and_bindings() {
    let mut h = Harness::new();
    h.connect(two_windows());
    let mut config = test_config();
    config.groups = vec!["a".to_string(), "b".to_string()];
    h.reactor.handle_event(Event::ConfigUpdated(Box::new(config)));
    h.sim.take_calls();
    // Old group names are gone.
    h.command(WmCommand::SwitchToGroup("2".to_string()));
    assert_eq!(h.sim.calls(), vec![]);
    h.command(WmCommand::SwitchToGroup("b".to_string()));
    assert!(h.sim.calls().contains(&DriverCall::Hide(WindowId(1))));
}

#[test]
fn next_layout_switches_to_max_and_back() {
    let mut h = Harness::new();
    h.connect(two_windows());
    h.command(WmCommand::NextLayout);
    // Max shows only the selected window; the other is hidden.
    assert_eq!(h.sim.applied_frame(WindowId(1)), Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
    let calls = h.sim.take_calls();
    assert!(calls.contains(&DriverCall::Hide(WindowId(2))));
    h.command(WmCommand::NextLayout);
    assert!(h.sim.take_calls().contains(&DriverCall::Show(WindowId(2))));
}
