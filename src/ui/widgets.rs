//! Bar widgets. A widget is a read-only observer: it renders a cell of text
//! from the manager snapshot or from system sources, and declares how it
//! wants to be refreshed. Widgets never touch windows.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Local;

use crate::common::config::WidgetConfig;

/// Shown in place of a widget whose render failed.
pub const PLACEHOLDER: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Re-render on a fixed timer.
    Interval(Duration),
    /// Re-render whenever the manager state changes.
    OnStateChange,
}

/// 24-bit RGB, printed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xff_ffff)
    }
}

pub const FG_ACTIVE: Color = Color(0x1d2021);
pub const BG_ACTIVE: Color = Color(0x83a598);
pub const FG_POPULATED: Color = Color(0xebdbb2);
pub const FG_DIM: Color = Color(0x7c6f64);
pub const FG_ALERT: Color = Color(0xfb4934);

/// One unit of bar output. The rendering backend gets these as-is; `None`
/// colors mean the bar's own defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub text: String,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    /// Reserved width in pixels; the text is padded up to it.
    pub min_width: f64,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Cell { text: text.into(), ..Cell::default() }
    }

    fn colored(text: impl Into<String>, fg: Color) -> Self {
        Cell { fg: Some(fg), ..Cell::new(text) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub name: String,
    pub active: bool,
    pub populated: bool,
}

/// Read-only view of manager state handed to widgets on re-render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WmSnapshot {
    pub groups: Vec<GroupStatus>,
    pub focused_title: Option<String>,
    pub layout_name: String,
}

pub trait Widget: Send {
    fn name(&self) -> &'static str;
    fn policy(&self) -> RefreshPolicy;
    fn render(&mut self, state: &WmSnapshot) -> anyhow::Result<Vec<Cell>>;
}

impl fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Widget({})", self.name())
    }
}

pub fn build(config: &WidgetConfig) -> Box<dyn Widget> {
    match config {
        WidgetConfig::GroupBox {} => Box::new(GroupBox),
        WidgetConfig::WindowName {} => Box::new(WindowName),
        WidgetConfig::Clock { format, interval_secs } => Box::new(Clock {
            format: format.clone(),
            interval: Duration::from_secs(*interval_secs),
        }),
        WidgetConfig::Battery { interval_secs } => Box::new(Battery {
            interval: Duration::from_secs(*interval_secs),
            supply: None,
        }),
        WidgetConfig::Text { text } => Box::new(Text { text: text.clone() }),
    }
}

/// One cell per group: the active group highlighted, populated groups in the
/// normal foreground, empty groups dimmed.
pub struct GroupBox;

/// Width reserved per group marker so the boxes stay put as groups fill.
const GROUP_CELL_WIDTH: f64 = 24.0;

impl Widget for GroupBox {
    fn name(&self) -> &'static str {
        "group_box"
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::OnStateChange
    }

    fn render(&mut self, state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
        Ok(state
            .groups
            .iter()
            .map(|g| {
                let mut cell = Cell::new(g.name.clone());
                cell.min_width = GROUP_CELL_WIDTH;
                if g.active {
                    cell.fg = Some(FG_ACTIVE);
                    cell.bg = Some(BG_ACTIVE);
                } else if g.populated {
                    cell.fg = Some(FG_POPULATED);
                } else {
                    cell.fg = Some(FG_DIM);
                }
                cell
            })
            .collect())
    }
}

pub struct WindowName;

impl Widget for WindowName {
    fn name(&self) -> &'static str {
        "window_name"
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::OnStateChange
    }

    fn render(&mut self, state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
        Ok(vec![Cell::new(state.focused_title.clone().unwrap_or_default())])
    }
}

pub struct Clock {
    format: String,
    interval: Duration,
}

impl Widget for Clock {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::Interval(self.interval)
    }

    fn render(&mut self, _state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
        Ok(vec![Cell::new(Local::now().format(&self.format).to_string())])
    }
}

pub struct Battery {
    interval: Duration,
    /// Resolved on first render and cached.
    supply: Option<PathBuf>,
}

impl Battery {
    fn find_supply() -> anyhow::Result<PathBuf> {
        let base = PathBuf::from("/sys/class/power_supply");
        for entry in std::fs::read_dir(&base).context("no power supply class")? {
            let path = entry?.path();
            if path.join("capacity").exists() {
                return Ok(path);
            }
        }
        bail!("no battery found under {}", base.display());
    }
}

impl Widget for Battery {
    fn name(&self) -> &'static str {
        "battery"
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::Interval(self.interval)
    }

    fn render(&mut self, _state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
        let supply = match self.supply.clone() {
            Some(supply) => supply,
            None => {
                let found = Self::find_supply()?;
                self.supply = Some(found.clone());
                found
            }
        };
        let capacity = std::fs::read_to_string(supply.join("capacity"))
            .context("reading battery capacity")?;
        let status = std::fs::read_to_string(supply.join("status")).unwrap_or_default();
        let sign = match status.trim() {
            "Charging" => "+",
            "Discharging" => "-",
            _ => "",
        };
        let text = format!("{}%{}", capacity.trim(), sign);
        let cell = match capacity.trim().parse::<u32>() {
            Ok(pct) if pct <= 15 => Cell::colored(text, FG_ALERT),
            _ => Cell::new(text),
        };
        Ok(vec![cell])
    }
}

pub struct Text {
    text: String,
}

impl Widget for Text {
    fn name(&self) -> &'static str {
        "text"
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::OnStateChange
    }

    fn render(&mut self, _state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
        Ok(vec![Cell::new(self.text.clone())])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn snapshot() -> WmSnapshot {
        WmSnapshot {
            groups: vec![
                GroupStatus {
                    name: "1".into(),
                    active: true,
                    populated: true,
                },
                GroupStatus {
                    name: "2".into(),
                    active: false,
                    populated: true,
                },
                GroupStatus {
                    name: "3".into(),
                    active: false,
                    populated: false,
                },
            ],
            focused_title: Some("editor".into()),
            layout_name: "columns".into(),
        }
    }

    #[test]
    fn group_box_marks_active_and_populated_groups() {
        let cells = GroupBox.render(&snapshot()).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].text, "1");
        assert_eq!(cells[0].bg, Some(BG_ACTIVE));
        assert_eq!(cells[1].fg, Some(FG_POPULATED));
        assert_eq!(cells[1].bg, None);
        assert_eq!(cells[2].fg, Some(FG_DIM));
        assert!(cells.iter().all(|c| c.min_width == GROUP_CELL_WIDTH));
    }

    #[test]
    fn window_name_renders_the_focused_title() {
        let cells = WindowName.render(&snapshot()).unwrap();
        assert_eq!(cells[0].text, "editor");
        let cells = WindowName.render(&WmSnapshot::default()).unwrap();
        assert_eq!(cells[0].text, "");
    }

    #[test]
    fn rendering_twice_with_the_same_state_is_idempotent() {
        let state = snapshot();
        assert_eq!(GroupBox.render(&state).unwrap(), GroupBox.render(&state).unwrap());
        let mut text = Text { text: "λ".into() };
        assert_eq!(text.render(&state).unwrap(), text.render(&state).unwrap());
    }

    #[test]
    fn clock_honors_the_configured_format() {
        let mut clock = Clock {
            format: "static".into(),
            interval: Duration::from_secs(30),
        };
        assert_eq!(clock.render(&snapshot()).unwrap()[0].text, "static");
        assert_eq!(clock.policy(), RefreshPolicy::Interval(Duration::from_secs(30)));
    }

    #[test]
    fn colors_print_as_hex() {
        assert_eq!(BG_ACTIVE.to_string(), "#83a598");
        assert_eq!(Color(0x00_0001).to_string(), "#000001");
    }
}
