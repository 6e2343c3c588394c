//! Pointer drags on floating windows. A drag is a three-phase protocol:
//! `start` captures the baseline frame, `update` applies the pointer delta
//! to it, and `end` commits. `cancel` hands back the baseline so the caller
//! can restore it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sys::driver::WindowId;
use crate::sys::geometry::{Point, Rect};

/// Windows cannot be resized below this edge length.
const MIN_SIZE: f64 = 50.0;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DragAction {
    MoveWindow,
    ResizeWindow,
    RaiseWindow,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    window: WindowId,
    action: DragAction,
    start_pointer: Point,
    baseline: Rect,
}

#[derive(Debug, Default)]
pub struct DragManager {
    active: Option<ActiveDrag>,
}

impl DragManager {
    /// Begins a drag, replacing any drag already in flight. `RaiseWindow`
    /// has no continuous phase and is rejected here.
    pub fn start(
        &mut self,
        window: WindowId,
        action: DragAction,
        pointer: Point,
        baseline: Rect,
    ) -> bool {
        if action == DragAction::RaiseWindow {
            return false;
        }
        if let Some(active) = &self.active {
            debug!(window = %active.window, "drag replaced before it ended");
        }
        self.active = Some(ActiveDrag {
            window,
            action,
            start_pointer: pointer,
            baseline,
        });
        true
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn dragged_window(&self) -> Option<WindowId> {
        self.active.as_ref().map(|d| d.window)
    }

    /// Applies the pointer position to the baseline and returns the frame
    /// the window should take now. `None` when no drag is in flight.
    pub fn update(&mut self, pointer: Point) -> Option<(WindowId, Rect)> {
        let drag = self.active.as_ref()?;
        let dx = pointer.x - drag.start_pointer.x;
        let dy = pointer.y - drag.start_pointer.y;
        let frame = match drag.action {
            DragAction::MoveWindow => drag.baseline.translated(dx, dy),
            DragAction::ResizeWindow => Rect {
                origin: drag.baseline.origin,
                size: crate::sys::geometry::Size::new(
                    (drag.baseline.size.width + dx).max(MIN_SIZE),
                    (drag.baseline.size.height + dy).max(MIN_SIZE),
                ),
            },
            DragAction::RaiseWindow => unreachable!(),
        };
        Some((drag.window, frame))
    }

    /// Commits the drag at the given pointer position and clears it.
    pub fn end(&mut self, pointer: Point) -> Option<(WindowId, Rect)> {
        let result = self.update(pointer);
        self.active = None;
        result
    }

    /// Aborts the drag, returning the baseline frame to restore.
    pub fn cancel(&mut self) -> Option<(WindowId, Rect)> {
        let drag = self.active.take()?;
        Some((drag.window, drag.baseline))
    }

    /// Drops the drag if its window disappeared; nothing is restored since
    /// there is no window left to place.
    pub fn abort_for_window(&mut self, window: WindowId) -> bool {
        if self.dragged_window() == Some(window) {
            debug!(%window, "dragged window vanished; aborting drag");
            self.active = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const BASELINE: Rect = Rect::new(100.0, 100.0, 400.0, 300.0);

    fn manager_with(action: DragAction) -> DragManager {
        let mut drags = DragManager::default();
        assert!(drags.start(WindowId(1), action, Point::new(150.0, 150.0), BASELINE));
        drags
    }

    #[test]
    fn move_applies_the_pointer_delta_to_the_baseline() {
        let mut drags = manager_with(DragAction::MoveWindow);
        let (window, frame) = drags.update(Point::new(170.0, 140.0)).unwrap();
        assert_eq!(window, WindowId(1));
        assert_eq!(frame, Rect::new(120.0, 90.0, 400.0, 300.0));
        // Updates are relative to the baseline, not cumulative.
        let (_, frame) = drags.update(Point::new(150.0, 150.0)).unwrap();
        assert_eq!(frame, BASELINE);
    }

    #[test]
    fn resize_grows_the_frame_and_clamps_the_minimum() {
        let mut drags = manager_with(DragAction::ResizeWindow);
        let (_, frame) = drags.update(Point::new(250.0, 250.0)).unwrap();
        assert_eq!(frame, Rect::new(100.0, 100.0, 500.0, 400.0));
        let (_, frame) = drags.update(Point::new(-900.0, -900.0)).unwrap();
        assert_eq!(frame.size.width, MIN_SIZE);
        assert_eq!(frame.size.height, MIN_SIZE);
    }

    #[test]
    fn end_commits_and_clears() {
        let mut drags = manager_with(DragAction::MoveWindow);
        let (_, frame) = drags.end(Point::new(200.0, 150.0)).unwrap();
        assert_eq!(frame, Rect::new(150.0, 100.0, 400.0, 300.0));
        assert!(!drags.is_active());
        assert_eq!(drags.update(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn cancel_restores_the_baseline() {
        let mut drags = manager_with(DragAction::MoveWindow);
        let _ = drags.update(Point::new(900.0, 900.0));
        let (window, frame) = drags.cancel().unwrap();
        assert_eq!(window, WindowId(1));
        assert_eq!(frame, BASELINE);
        assert!(!drags.is_active());
    }

    #[test]
    fn raise_is_not_a_drag() {
        let mut drags = DragManager::default();
        assert!(!drags.start(
            WindowId(1),
            DragAction::RaiseWindow,
            Point::new(0.0, 0.0),
            BASELINE
        ));
        assert!(!drags.is_active());
    }

    #[test]
    fn vanished_window_aborts_without_a_restore() {
        let mut drags = manager_with(DragAction::MoveWindow);
        assert!(!drags.abort_for_window(WindowId(2)));
        assert!(drags.abort_for_window(WindowId(1)));
        assert_eq!(drags.cancel(), None);
    }
}
