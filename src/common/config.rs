use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::drag::DragAction;
use crate::actor::reactor::{ExecCmd, WmCommand};
use crate::common::collections::{HashMap, HashSet};
use crate::common::error::ConfigError;
use crate::sys::hotkey::{DragChord, Hotkey};

pub fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap().join(".strata")
}

pub fn restore_file() -> PathBuf {
    data_dir().join("layout.ron")
}

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap().join(".config").join("strata").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ConfigCommand {
    /// Generic setter for arbitrary config paths using dot-separated keys.
    /// Example: key = "settings.gap", value = 8.0
    Set { key: String, value: Value },
    GetConfig,
    SaveConfig,
    ReloadConfig,
}

/// The on-disk schema. Keys and mouse chords are string maps here and get
/// parsed into typed tables when building [`Config`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default = "default_groups")]
    groups: Vec<String>,
    #[serde(default = "default_layouts")]
    layouts: Vec<LayoutConfig>,
    #[serde(default)]
    keys: HashMap<String, WmCommand>,
    #[serde(default)]
    mouse: HashMap<String, DragAction>,
    #[serde(default)]
    bar: BarSettings,
    #[serde(default)]
    float_rules: Vec<FloatRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub settings: Settings,
    pub groups: Vec<String>,
    pub layouts: Vec<LayoutConfig>,
    pub keys: Vec<(Hotkey, WmCommand)>,
    pub mouse: Vec<(DragChord, DragAction)>,
    pub bar: BarSettings,
    pub float_rules: Vec<FloatRule>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Gap between windows and around the tiling area, in pixels.
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_border_width")]
    pub border_width: f64,
    #[serde(default = "yes")]
    pub follow_mouse_focus: bool,
    /// Commands to run once after the driver connection is up.
    #[serde(default)]
    pub autostart: Vec<String>,
    /// Reload the config file automatically when it changes on disk.
    #[serde(default = "yes")]
    pub hot_reload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            border_width: default_border_width(),
            follow_mouse_focus: true,
            autostart: Vec::new(),
            hot_reload: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LayoutConfig {
    Columns {
        #[serde(default = "default_num_columns")]
        num_columns: usize,
        #[serde(default = "default_margin")]
        margin: f64,
    },
    Max {},
}

impl LayoutConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LayoutConfig::Columns { .. } => "columns",
            LayoutConfig::Max {} => "max",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BarSettings {
    #[serde(default = "yes")]
    pub enabled: bool,
    #[serde(default = "default_bar_height")]
    pub height: f64,
    #[serde(default = "default_widgets")]
    pub widgets: Vec<WidgetConfig>,
}

impl Default for BarSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            height: default_bar_height(),
            widgets: default_widgets(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum WidgetConfig {
    GroupBox {},
    WindowName {},
    Clock {
        #[serde(default = "default_clock_format")]
        format: String,
        #[serde(default = "default_clock_interval")]
        interval_secs: u64,
    },
    Battery {
        #[serde(default = "default_battery_interval")]
        interval_secs: u64,
    },
    Text {
        text: String,
    },
}

/// Windows matching a rule are excluded from tiling and positioned by the
/// user (the original pinentry/ssh-askpass style exceptions).
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FloatRule {
    /// Exact window class to match.
    pub wm_class: Option<String>,
    /// Regular expression matched against the window title.
    pub title_regex: Option<String>,
}

fn yes() -> bool {
    true
}

fn default_gap() -> f64 {
    4.0
}

fn default_border_width() -> f64 {
    4.0
}

fn default_num_columns() -> usize {
    2
}

fn default_margin() -> f64 {
    4.0
}

fn default_bar_height() -> f64 {
    30.0
}

fn default_clock_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

fn default_clock_interval() -> u64 {
    30
}

fn default_battery_interval() -> u64 {
    60
}

fn default_groups() -> Vec<String> {
    vec!["1".to_string(), "2".to_string(), "3".to_string()]
}

fn default_layouts() -> Vec<LayoutConfig> {
    vec![
        LayoutConfig::Columns {
            num_columns: default_num_columns(),
            margin: default_margin(),
        },
        LayoutConfig::Max {},
    ]
}

fn default_widgets() -> Vec<WidgetConfig> {
    vec![
        WidgetConfig::GroupBox {},
        WidgetConfig::WindowName {},
        WidgetConfig::Clock {
            format: default_clock_format(),
            interval_secs: default_clock_interval(),
        },
        WidgetConfig::Battery {
            interval_secs: default_battery_interval(),
        },
    ]
}

fn default_keys() -> Vec<(Hotkey, WmCommand)> {
    use WmCommand::*;
    let bindings: Vec<(&str, WmCommand)> = vec![
        ("Super + H", FocusLeft),
        ("Super + L", FocusRight),
        ("Super + J", FocusDown),
        ("Super + K", FocusUp),
        ("Super + Space", FocusNext),
        ("Super + Shift + H", ShuffleLeft),
        ("Super + Shift + L", ShuffleRight),
        ("Super + Shift + J", ShuffleDown),
        ("Super + Shift + K", ShuffleUp),
        ("Super + Ctrl + H", GrowLeft),
        ("Super + Ctrl + L", GrowRight),
        ("Super + Ctrl + J", GrowDown),
        ("Super + Ctrl + K", GrowUp),
        ("Super + N", Normalize),
        ("Super + Shift + Return", ToggleSplit),
        ("Super + Return", Spawn(ExecCmd::String("alacritty".into()))),
        ("Super + Tab", NextLayout),
        ("Super + W", KillWindow),
        ("Super + T", ToggleFloating),
        ("Super + Ctrl + R", Restart),
        ("Super + Ctrl + Q", Shutdown),
    ];
    let mut keys: Vec<(Hotkey, WmCommand)> = bindings
        .into_iter()
        .map(|(chord, cmd)| (Hotkey::from_str(chord).unwrap(), cmd))
        .collect();
    for (i, group) in default_groups().into_iter().enumerate() {
        let digit = i + 1;
        keys.push((
            Hotkey::from_str(&format!("Super + {digit}")).unwrap(),
            SwitchToGroup(group.clone()),
        ));
        keys.push((
            Hotkey::from_str(&format!("Super + Shift + {digit}")).unwrap(),
            MoveWindowToGroup { group, switch: true },
        ));
    }
    keys
}

fn default_mouse() -> Vec<(DragChord, DragAction)> {
    vec![
        (DragChord::from_str("Super + Button1").unwrap(), DragAction::MoveWindow),
        (DragChord::from_str("Super + Button3").unwrap(), DragAction::ResizeWindow),
        (DragChord::from_str("Super + Button2").unwrap(), DragAction::RaiseWindow),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings: Settings::default(),
            groups: default_groups(),
            layouts: default_layouts(),
            keys: default_keys(),
            mouse: default_mouse(),
            bar: BarSettings::default(),
            float_rules: Vec::new(),
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        let buf = std::fs::read_to_string(path)?;
        Config::parse(&buf)
    }

    pub fn parse(buf: &str) -> Result<Config, ConfigError> {
        let file: ConfigFile = toml::from_str(buf)?;
        let mut keys = Vec::with_capacity(file.keys.len());
        let mut seen: HashSet<Hotkey> = HashSet::default();
        for (chord, cmd) in file.keys {
            let hotkey = Hotkey::from_str(&chord)
                .map_err(|e| ConfigError::Invalid(vec![format!("key '{}': {}", chord, e)]))?;
            // Two string spellings can normalize to one chord.
            if !seen.insert(hotkey) {
                return Err(ConfigError::DuplicateBinding(hotkey));
            }
            keys.push((hotkey, cmd));
        }
        keys.sort_by_key(|(hotkey, _)| format!("{}", hotkey));

        let mut mouse = Vec::with_capacity(file.mouse.len());
        let mut seen_chords: HashSet<DragChord> = HashSet::default();
        for (chord, action) in file.mouse {
            let parsed = DragChord::from_str(&chord)
                .map_err(|e| ConfigError::Invalid(vec![format!("mouse '{}': {}", chord, e)]))?;
            // Same normalization rule as keys: two spellings, one chord.
            if !seen_chords.insert(parsed) {
                return Err(ConfigError::Invalid(vec![format!(
                    "duplicate mouse binding '{}'",
                    chord
                )]));
            }
            mouse.push((parsed, action));
        }

        let config = Config {
            settings: file.settings,
            groups: file.groups,
            layouts: file.layouts,
            keys: if keys.is_empty() { default_keys() } else { keys },
            mouse: if mouse.is_empty() { default_mouse() } else { mouse },
            bar: file.bar,
            float_rules: file.float_rules,
        };

        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ConfigFile {
            settings: self.settings.clone(),
            groups: self.groups.clone(),
            layouts: self.layouts.clone(),
            keys: self
                .keys
                .iter()
                .map(|(hotkey, cmd)| (hotkey.to_string(), cmd.clone()))
                .collect(),
            mouse: self
                .mouse
                .iter()
                .map(|(chord, action)| {
                    let mut s = chord.modifiers.to_string();
                    if !s.is_empty() {
                        s.push_str(" + ");
                    }
                    s.push_str(match chord.button {
                        crate::sys::hotkey::Button::Left => "Button1",
                        crate::sys::hotkey::Button::Middle => "Button2",
                        crate::sys::hotkey::Button::Right => "Button3",
                    });
                    (s, *action)
                })
                .collect(),
            bar: self.bar.clone(),
            float_rules: self.float_rules.clone(),
        };
        let serialized = toml::to_string_pretty(&file)
            .map_err(|e| ConfigError::Invalid(vec![format!("serialize: {}", e)]))?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Structural checks beyond what serde enforces. Returns a list of
    /// human-readable issues; an empty list means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.groups.is_empty() {
            issues.push("at least one group must be configured".to_string());
        }
        let mut seen_groups: HashSet<&str> = HashSet::default();
        for name in &self.groups {
            if name.is_empty() {
                issues.push("group names must be non-empty".to_string());
            } else if !seen_groups.insert(name) {
                issues.push(format!("duplicate group name '{}'", name));
            }
        }

        if self.layouts.is_empty() {
            issues.push("at least one layout must be configured".to_string());
        }
        for layout in &self.layouts {
            if let LayoutConfig::Columns { num_columns, margin } = layout {
                if *num_columns == 0 {
                    issues.push("columns layout needs num_columns >= 1".to_string());
                }
                if *margin < 0.0 {
                    issues.push("columns margin must be >= 0".to_string());
                }
            }
        }

        for (hotkey, cmd) in &self.keys {
            let group = match cmd {
                WmCommand::SwitchToGroup(group) => Some(group),
                WmCommand::MoveWindowToGroup { group, .. } => Some(group),
                _ => None,
            };
            if let Some(group) = group
                && !self.groups.iter().any(|g| g == group)
            {
                issues.push(format!(
                    "binding '{}' references unknown group '{}'",
                    hotkey, group
                ));
            }
        }

        for widget in &self.bar.widgets {
            match widget {
                WidgetConfig::Clock { interval_secs, .. }
                | WidgetConfig::Battery { interval_secs } => {
                    if *interval_secs == 0 {
                        issues.push("widget intervals must be at least 1 second".to_string());
                    }
                }
                _ => {}
            }
        }

        for (index, rule) in self.float_rules.iter().enumerate() {
            if rule.wm_class.is_none() && rule.title_regex.is_none() {
                issues.push(format!("float rule {} matches nothing", index));
            }
            if let Some(ref pattern) = rule.title_regex
                && let Err(e) = regex::Regex::new(pattern)
            {
                issues.push(format!("float rule {} has a bad title_regex: {}", index, e));
            }
        }

        if self.settings.gap < 0.0 {
            issues.push("settings.gap must be >= 0".to_string());
        }
        if self.bar.height < 0.0 {
            issues.push("bar.height must be >= 0".to_string());
        }

        issues
    }
}
