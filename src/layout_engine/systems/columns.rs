//! Column tiling: windows are partitioned into vertical columns, and each
//! column stacks its windows. Column widths and pane heights are weighted
//! shares, adjusted by grow commands and reset by normalize.

use serde::{Deserialize, Serialize};

use crate::layout_engine::systems::{Direction, GROW_STEP, LayoutSystem, MIN_SHARE};
use crate::sys::driver::WindowId;
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Pane {
    window: WindowId,
    weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Column {
    panes: Vec<Pane>,
    weight: f64,
    selected: usize,
}

impl Column {
    fn single(window: WindowId) -> Self {
        Column {
            panes: vec![Pane { window, weight: 1.0 }],
            weight: 1.0,
            selected: 0,
        }
    }

    fn selected_window(&self) -> WindowId {
        self.panes[self.selected].window
    }

    fn total_pane_weight(&self) -> f64 {
        self.panes.iter().map(|p| p.weight).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Columns {
    num_columns: usize,
    margin: f64,
    columns: Vec<Column>,
    selected: usize,
    /// When false, only the selected column is shown, full width.
    split: bool,
}

impl Columns {
    pub fn new(num_columns: usize, margin: f64) -> Self {
        Columns {
            num_columns: num_columns.max(1),
            margin,
            columns: Vec::new(),
            selected: 0,
            split: true,
        }
    }

    fn clamp_selection(&mut self) {
        if self.columns.is_empty() {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.min(self.columns.len() - 1);
        let column = &mut self.columns[self.selected];
        column.selected = column.selected.min(column.panes.len() - 1);
    }

    fn position_of(&self, window: WindowId) -> Option<(usize, usize)> {
        for (ci, column) in self.columns.iter().enumerate() {
            if let Some(pi) = column.panes.iter().position(|p| p.window == window) {
                return Some((ci, pi));
            }
        }
        None
    }

    fn insert_window(&mut self, window: WindowId) {
        if self.columns.len() < self.num_columns {
            self.columns.push(Column::single(window));
            return;
        }
        // Appending keeps the flat order equal to the group's append order,
        // so the existing partition and its weights survive a new window.
        if let Some(column) = self.columns.last_mut() {
            column.panes.push(Pane { window, weight: 1.0 });
        }
    }

    fn remove_window(&mut self, window: WindowId) {
        let Some((ci, pi)) = self.position_of(window) else {
            return;
        };
        self.columns[ci].panes.remove(pi);
        if self.columns[ci].panes.is_empty() {
            self.columns.remove(ci);
            if self.selected > ci {
                self.selected -= 1;
            }
        } else if self.columns[ci].selected >= self.columns[ci].panes.len() {
            self.columns[ci].selected = self.columns[ci].panes.len() - 1;
        }
        self.clamp_selection();
    }

    /// Transfers `amount` of weight from `donor` to `receiver`, clamped so
    /// the donor keeps at least `min` of the total. Returns whether any
    /// weight moved.
    fn transfer(weights: &mut [f64], donor: usize, receiver: usize, amount: f64) -> bool {
        let total: f64 = weights.iter().sum();
        let min = total * MIN_SHARE;
        let available = weights[donor] - min;
        let moved = amount.min(available).max(0.0);
        if moved <= 0.0 {
            return false;
        }
        weights[donor] -= moved;
        weights[receiver] += moved;
        true
    }

    fn grow_horizontal(&mut self, direction: Direction, amount: f64) -> bool {
        let n = self.columns.len();
        if n < 2 {
            return false;
        }
        let i = self.selected;
        // On the boundary toward the screen edge the pane gives up width
        // instead of taking it, so the command is never silently dead.
        let (donor, receiver) = match direction {
            Direction::Left => {
                if i > 0 {
                    (i - 1, i)
                } else {
                    (0, 1)
                }
            }
            Direction::Right => {
                if i + 1 < n {
                    (i + 1, i)
                } else {
                    (i, i - 1)
                }
            }
            _ => unreachable!(),
        };
        let mut weights: Vec<f64> = self.columns.iter().map(|c| c.weight).collect();
        let total: f64 = weights.iter().sum();
        if !Self::transfer(&mut weights, donor, receiver, amount * total) {
            return false;
        }
        for (column, weight) in self.columns.iter_mut().zip(weights) {
            column.weight = weight;
        }
        true
    }

    fn grow_vertical(&mut self, direction: Direction, amount: f64) -> bool {
        let column = &mut self.columns[self.selected];
        let n = column.panes.len();
        if n < 2 {
            return false;
        }
        let i = column.selected;
        let (donor, receiver) = match direction {
            Direction::Up => {
                if i > 0 {
                    (i - 1, i)
                } else {
                    (0, 1)
                }
            }
            Direction::Down => {
                if i + 1 < n {
                    (i + 1, i)
                } else {
                    (i, i - 1)
                }
            }
            _ => unreachable!(),
        };
        let mut weights: Vec<f64> = column.panes.iter().map(|p| p.weight).collect();
        let total: f64 = weights.iter().sum();
        if !Self::transfer(&mut weights, donor, receiver, amount * total) {
            return false;
        }
        for (pane, weight) in column.panes.iter_mut().zip(weights) {
            pane.weight = weight;
        }
        true
    }

    /// Repartitions `order` into balanced contiguous columns so the flat
    /// order of the structure equals `order` exactly.
    fn rebuild(&mut self, order: &[WindowId]) {
        self.columns.clear();
        self.selected = 0;
        if order.is_empty() {
            return;
        }
        let cols = order.len().min(self.num_columns);
        let base = order.len() / cols;
        let extra = order.len() % cols;
        let mut it = order.iter().copied();
        for i in 0..cols {
            let take = base + usize::from(i < extra);
            let panes = it
                .by_ref()
                .take(take)
                .map(|window| Pane { window, weight: 1.0 })
                .collect();
            self.columns.push(Column { panes, weight: 1.0, selected: 0 });
        }
    }

    fn arrange_column(&self, column: &Column, bounds: Rect, out: &mut Vec<(WindowId, Rect)>) {
        let n = column.panes.len();
        let total = column.total_pane_weight();
        let inner = bounds.size.height - self.margin * (n.saturating_sub(1)) as f64;
        let mut y = bounds.origin.y;
        for pane in &column.panes {
            let height = (inner * pane.weight / total).max(0.0);
            out.push((
                pane.window,
                Rect::new(bounds.origin.x, y, bounds.size.width, height),
            ));
            y += height + self.margin;
        }
    }
}

impl LayoutSystem for Columns {
    fn kind_name(&self) -> &'static str {
        "columns"
    }

    fn sync_windows(&mut self, desired: &[WindowId]) {
        let current = self.window_order();
        for window in current {
            if !desired.contains(&window) {
                self.remove_window(window);
            }
        }
        for window in desired {
            if self.position_of(*window).is_none() {
                self.insert_window(*window);
            }
        }
        // An externally imposed reorder rebuilds the partition; weights do
        // not survive that.
        if self.window_order() != desired {
            let selected = self.selected_window();
            self.rebuild(desired);
            if let Some(window) = selected {
                self.select_window(window);
            }
        }
        self.clamp_selection();
    }

    fn arrange(&self, bounds: Rect) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::new();
        if self.columns.is_empty() {
            return out;
        }
        if !self.split {
            self.arrange_column(&self.columns[self.selected], bounds, &mut out);
            return out;
        }
        let n = self.columns.len();
        let total: f64 = self.columns.iter().map(|c| c.weight).sum();
        let inner = bounds.size.width - self.margin * (n - 1) as f64;
        let mut x = bounds.origin.x;
        for column in &self.columns {
            let width = (inner * column.weight / total).max(0.0);
            let column_bounds =
                Rect::new(x, bounds.origin.y, width, bounds.size.height);
            self.arrange_column(column, column_bounds, &mut out);
            x += width + self.margin;
        }
        out
    }

    fn selected_window(&self) -> Option<WindowId> {
        self.columns.get(self.selected).map(|c| c.selected_window())
    }

    fn select_window(&mut self, window: WindowId) -> bool {
        match self.position_of(window) {
            Some((ci, pi)) => {
                self.selected = ci;
                self.columns[ci].selected = pi;
                true
            }
            None => false,
        }
    }

    fn contains_window(&self, window: WindowId) -> bool {
        self.position_of(window).is_some()
    }

    fn window_order(&self) -> Vec<WindowId> {
        self.columns
            .iter()
            .flat_map(|c| c.panes.iter().map(|p| p.window))
            .collect()
    }

    fn focus_toward(&mut self, direction: Direction) -> Option<WindowId> {
        if self.columns.is_empty() {
            return None;
        }
        match direction {
            Direction::Left if self.selected > 0 => {
                self.selected -= 1;
            }
            Direction::Right if self.selected + 1 < self.columns.len() => {
                self.selected += 1;
            }
            Direction::Up if self.columns[self.selected].selected > 0 => {
                self.columns[self.selected].selected -= 1;
            }
            Direction::Down
                if self.columns[self.selected].selected + 1
                    < self.columns[self.selected].panes.len() =>
            {
                self.columns[self.selected].selected += 1;
            }
            _ => return None,
        }
        self.selected_window()
    }

    fn focus_next(&mut self) -> Option<WindowId> {
        let order = self.window_order();
        if order.len() < 2 {
            return None;
        }
        let current = self.selected_window()?;
        let index = order.iter().position(|w| *w == current)?;
        let next = order[(index + 1) % order.len()];
        self.select_window(next);
        Some(next)
    }

    fn shuffle(&mut self, direction: Direction) -> bool {
        if self.columns.is_empty() {
            return false;
        }
        let ci = self.selected;
        match direction {
            Direction::Left | Direction::Right => {
                let at_edge = if direction == Direction::Left {
                    ci == 0
                } else {
                    ci + 1 >= self.columns.len()
                };
                // Shuffling past the edge splits the window out into a new
                // column there, unless it already sits alone in one.
                if at_edge {
                    if self.columns[ci].panes.len() < 2 {
                        return false;
                    }
                    let pi = self.columns[ci].selected;
                    let pane = self.columns[ci].panes.remove(pi);
                    let column = &mut self.columns[ci];
                    column.selected = column.selected.min(column.panes.len() - 1);
                    if direction == Direction::Left {
                        self.columns.insert(0, Column::single(pane.window));
                        self.selected = 0;
                    } else {
                        self.columns.push(Column::single(pane.window));
                        self.selected = self.columns.len() - 1;
                    }
                    return true;
                }
                let target = if direction == Direction::Left { ci - 1 } else { ci + 1 };
                let pi = self.columns[ci].selected;
                let pane = self.columns[ci].panes.remove(pi);
                let emptied = self.columns[ci].panes.is_empty();
                let target = if emptied && target > ci { target - 1 } else { target };
                if emptied {
                    self.columns.remove(ci);
                } else {
                    let column = &mut self.columns[ci];
                    column.selected = column.selected.min(column.panes.len() - 1);
                }
                let column = &mut self.columns[target];
                column.panes.push(pane);
                column.selected = column.panes.len() - 1;
                self.selected = target;
                true
            }
            Direction::Up => {
                let column = &mut self.columns[ci];
                if column.selected == 0 {
                    return false;
                }
                column.panes.swap(column.selected, column.selected - 1);
                column.selected -= 1;
                true
            }
            Direction::Down => {
                let column = &mut self.columns[ci];
                if column.selected + 1 >= column.panes.len() {
                    return false;
                }
                column.panes.swap(column.selected, column.selected + 1);
                column.selected += 1;
                true
            }
        }
    }

    fn grow(&mut self, direction: Direction, amount: f64) -> bool {
        if self.columns.is_empty() {
            return false;
        }
        let amount = if amount > 0.0 { amount } else { GROW_STEP };
        if direction.is_horizontal() {
            self.grow_horizontal(direction, amount)
        } else {
            self.grow_vertical(direction, amount)
        }
    }

    fn normalize(&mut self) {
        for column in &mut self.columns {
            column.weight = 1.0;
            for pane in &mut column.panes {
                pane.weight = 1.0;
            }
        }
    }

    fn toggle_split(&mut self) {
        self.split = !self.split;
    }
}
