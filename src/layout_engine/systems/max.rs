//! Max tiling: the selected window fills the bounds, everything else in the
//! group stays hidden until focus reaches it.

use serde::{Deserialize, Serialize};

use crate::layout_engine::systems::{Direction, LayoutSystem};
use crate::sys::driver::WindowId;
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Max {
    windows: Vec<WindowId>,
    selected: usize,
}

impl Max {
    fn clamp_selection(&mut self) {
        if self.windows.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.windows.len() - 1);
        }
    }

    fn step(&mut self, forward: bool) -> Option<WindowId> {
        if self.windows.len() < 2 {
            return None;
        }
        self.selected = if forward {
            (self.selected + 1) % self.windows.len()
        } else {
            (self.selected + self.windows.len() - 1) % self.windows.len()
        };
        self.selected_window()
    }
}

impl LayoutSystem for Max {
    fn kind_name(&self) -> &'static str {
        "max"
    }

    fn sync_windows(&mut self, desired: &[WindowId]) {
        let selected = self.selected_window();
        self.windows = desired.to_vec();
        if let Some(window) = selected
            && self.select_window(window)
        {
            return;
        }
        self.clamp_selection();
    }

    fn arrange(&self, bounds: Rect) -> Vec<(WindowId, Rect)> {
        match self.selected_window() {
            Some(window) => vec![(window, bounds)],
            None => Vec::new(),
        }
    }

    fn selected_window(&self) -> Option<WindowId> {
        self.windows.get(self.selected).copied()
    }

    fn select_window(&mut self, window: WindowId) -> bool {
        match self.windows.iter().position(|w| *w == window) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    fn contains_window(&self, window: WindowId) -> bool {
        self.windows.contains(&window)
    }

    fn window_order(&self) -> Vec<WindowId> {
        self.windows.clone()
    }

    fn focus_toward(&mut self, direction: Direction) -> Option<WindowId> {
        match direction {
            Direction::Right | Direction::Down => self.step(true),
            Direction::Left | Direction::Up => self.step(false),
        }
    }

    fn focus_next(&mut self) -> Option<WindowId> {
        self.step(true)
    }

    fn shuffle(&mut self, direction: Direction) -> bool {
        let forward = matches!(direction, Direction::Right | Direction::Down);
        let n = self.windows.len();
        if n < 2 {
            return false;
        }
        let i = self.selected;
        let j = if forward {
            if i + 1 >= n {
                return false;
            }
            i + 1
        } else {
            if i == 0 {
                return false;
            }
            i - 1
        };
        self.windows.swap(i, j);
        self.selected = j;
        true
    }

    fn grow(&mut self, _direction: Direction, _amount: f64) -> bool {
        false
    }

    fn normalize(&mut self) {}

    fn toggle_split(&mut self) {}
}
