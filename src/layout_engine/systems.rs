use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::common::config::LayoutConfig;
use crate::sys::driver::WindowId;
use crate::sys::geometry::Rect;

pub mod columns;
pub mod max;

pub use columns::Columns;
pub use max::Max;

/// No pane's share of an axis may drop below this fraction of the bounds.
pub const MIN_SHARE: f64 = 0.05;

/// Resize step for a single grow command, as a fraction of the bounds.
pub const GROW_STEP: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// A tiling algorithm holding the windows of one group. The system owns the
/// structural order of its windows; membership is reconciled from the group
/// via [`sync_windows`](LayoutSystem::sync_windows).
#[enum_dispatch]
pub trait LayoutSystem {
    fn kind_name(&self) -> &'static str;

    /// Reconciles this system against the group's window list: windows no
    /// longer present are dropped, new ones are inserted. The relative
    /// placement of surviving windows is preserved.
    fn sync_windows(&mut self, desired: &[WindowId]);

    /// Computes frames for the currently visible windows. Windows the
    /// system holds but omits from the result are to be hidden. Empty input
    /// yields an empty mapping.
    fn arrange(&self, bounds: Rect) -> Vec<(WindowId, Rect)>;

    fn selected_window(&self) -> Option<WindowId>;
    fn select_window(&mut self, window: WindowId) -> bool;
    fn contains_window(&self, window: WindowId) -> bool;

    /// All windows in structural order.
    fn window_order(&self) -> Vec<WindowId>;

    /// Moves selection toward a direction. Returns the newly selected
    /// window, or `None` when selection did not change.
    fn focus_toward(&mut self, direction: Direction) -> Option<WindowId>;

    /// Cycles selection through the structural order.
    fn focus_next(&mut self) -> Option<WindowId>;

    /// Moves the selected window toward a direction, reordering the
    /// structure. Returns whether anything moved.
    fn shuffle(&mut self, direction: Direction) -> bool;

    /// Resizes the selected pane by `amount` (fraction of the bounds) at
    /// the expense of the neighbor in that direction. Returns whether any
    /// share changed.
    fn grow(&mut self, direction: Direction, amount: f64) -> bool;

    /// Resets all shares to equal.
    fn normalize(&mut self);

    /// Toggles between showing all panes and the selected region alone.
    fn toggle_split(&mut self);
}

#[enum_dispatch(LayoutSystem)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutSystemKind {
    Columns(Columns),
    Max(Max),
}

impl LayoutSystemKind {
    pub fn from_config(config: &LayoutConfig) -> Self {
        match config {
            LayoutConfig::Columns { num_columns, margin } => {
                LayoutSystemKind::Columns(Columns::new(*num_columns, *margin))
            }
            LayoutConfig::Max {} => LayoutSystemKind::Max(Max::default()),
        }
    }
}
