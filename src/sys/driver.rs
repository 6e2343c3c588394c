//! The display-server seam. The core never talks to a real windowing system
//! directly; it issues requests through [`Driver`] and consumes
//! [`DriverEvent`]s, which keeps every component testable without a live
//! display connection.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::error::DriverError;
use crate::sys::geometry::{Point, Rect};
use crate::sys::hotkey::{Button, KeyCode, Modifiers};
use crate::sys::screen::Screen;

/// Opaque window handle minted by the display driver.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct WindowId(pub u32);

impl WindowId {
    pub fn new(id: u32) -> Self {
        WindowId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the driver knows about a window when it appears.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverWindow {
    pub id: WindowId,
    pub frame: Rect,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub wm_class: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DriverEvent {
    Connected {
        screens: Vec<Screen>,
        windows: Vec<DriverWindow>,
    },
    WindowMapped(DriverWindow),
    WindowUnmapped(WindowId),
    WindowTitleChanged(WindowId, String),
    KeyPressed {
        modifiers: Modifiers,
        key: KeyCode,
    },
    ButtonPressed {
        modifiers: Modifiers,
        button: Button,
        window: Option<WindowId>,
        position: Point,
    },
    ButtonReleased {
        button: Button,
        position: Point,
    },
    PointerMotion {
        position: Point,
    },
    /// The display server moved input focus without being asked, typically
    /// because the pointer crossed into another window.
    FocusChanged(WindowId),
    ScreensChanged(Vec<Screen>),
    ConnectionLost,
}

/// Requests the core can issue against the display server.
pub trait Driver {
    fn list_windows(&mut self) -> Result<Vec<DriverWindow>, DriverError>;
    fn move_resize(&mut self, window: WindowId, frame: Rect) -> Result<(), DriverError>;
    fn raise(&mut self, window: WindowId) -> Result<(), DriverError>;
    fn set_focus(&mut self, window: WindowId) -> Result<(), DriverError>;
    fn hide(&mut self, window: WindowId) -> Result<(), DriverError>;
    fn show(&mut self, window: WindowId) -> Result<(), DriverError>;
    fn kill(&mut self, window: WindowId) -> Result<(), DriverError>;
    /// Signals the display server that the manager is letting go. Terminal.
    fn release(&mut self) -> Result<(), DriverError>;
}

/// Every request the [`SimDriver`] has seen, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    MoveResize(WindowId, Rect),
    Raise(WindowId),
    SetFocus(WindowId),
    Hide(WindowId),
    Show(WindowId),
    Kill(WindowId),
    Release,
}

#[derive(Default)]
struct SimState {
    windows: Vec<DriverWindow>,
    calls: Vec<DriverCall>,
    events: VecDeque<DriverEvent>,
    disconnected: bool,
}

/// An in-memory driver. Tests and the binary's replay mode script events into
/// it and inspect the calls the core issued back.
#[derive(Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&self, event: DriverEvent) {
        self.state.lock().events.push_back(event);
    }

    pub fn next_event(&self) -> Option<DriverEvent> {
        self.state.lock().events.pop_front()
    }

    pub fn add_window(&self, window: DriverWindow) {
        let mut state = self.state.lock();
        state.windows.push(window.clone());
        state.events.push_back(DriverEvent::WindowMapped(window));
    }

    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.disconnected = true;
        state.events.push_back(DriverEvent::ConnectionLost);
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<DriverCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// The frame last applied to a window through `move_resize`, if any.
    pub fn applied_frame(&self, window: WindowId) -> Option<Rect> {
        self.state.lock().calls.iter().rev().find_map(|call| match call {
            DriverCall::MoveResize(wid, frame) if *wid == window => Some(*frame),
            _ => None,
        })
    }

    fn record(&self, call: DriverCall) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(DriverError::ConnectionLost);
        }
        state.calls.push(call);
        Ok(())
    }
}

impl Driver for SimDriver {
    fn list_windows(&mut self) -> Result<Vec<DriverWindow>, DriverError> {
        let state = self.state.lock();
        if state.disconnected {
            return Err(DriverError::ConnectionLost);
        }
        Ok(state.windows.clone())
    }

    fn move_resize(&mut self, window: WindowId, frame: Rect) -> Result<(), DriverError> {
        self.record(DriverCall::MoveResize(window, frame))
    }

    fn raise(&mut self, window: WindowId) -> Result<(), DriverError> {
        self.record(DriverCall::Raise(window))
    }

    fn set_focus(&mut self, window: WindowId) -> Result<(), DriverError> {
        self.record(DriverCall::SetFocus(window))
    }

    fn hide(&mut self, window: WindowId) -> Result<(), DriverError> {
        self.record(DriverCall::Hide(window))
    }

    fn show(&mut self, window: WindowId) -> Result<(), DriverError> {
        self.record(DriverCall::Show(window))
    }

    fn kill(&mut self, window: WindowId) -> Result<(), DriverError> {
        self.record(DriverCall::Kill(window))
    }

    fn release(&mut self) -> Result<(), DriverError> {
        self.state.lock().calls.push(DriverCall::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: u32) -> DriverWindow {
        DriverWindow {
            id: WindowId::new(id),
            frame: Rect::new(0.0, 0.0, 100.0, 100.0),
            title: String::new(),
            wm_class: String::new(),
        }
    }

    #[test]
    fn records_calls_in_order() {
        let sim = SimDriver::new();
        let mut driver = sim.clone();
        driver.set_focus(WindowId::new(1)).unwrap();
        driver.raise(WindowId::new(1)).unwrap();
        assert_eq!(sim.calls(), vec![
            DriverCall::SetFocus(WindowId::new(1)),
            DriverCall::Raise(WindowId::new(1)),
        ]);
    }

    #[test]
    fn add_window_queues_map_event() {
        let sim = SimDriver::new();
        sim.add_window(window(7));
        assert!(matches!(sim.next_event(), Some(DriverEvent::WindowMapped(w)) if w.id.as_u32() == 7));
        assert!(sim.next_event().is_none());
    }

    #[test]
    fn requests_fail_after_disconnect() {
        let sim = SimDriver::new();
        sim.disconnect();
        let mut driver = sim.clone();
        assert!(matches!(
            driver.move_resize(WindowId::new(1), Rect::default()),
            Err(DriverError::ConnectionLost)
        ));
    }

    #[test]
    fn applied_frame_reports_latest() {
        let sim = SimDriver::new();
        let mut driver = sim.clone();
        let wid = WindowId::new(3);
        driver.move_resize(wid, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        driver.move_resize(wid, Rect::new(5.0, 5.0, 20.0, 20.0)).unwrap();
        assert_eq!(sim.applied_frame(wid), Some(Rect::new(5.0, 5.0, 20.0, 20.0)));
    }
}
