//! Bar actor. Widgets render off-thread so one slow or failing widget
//! cannot hold up the rest; the composed row of cells is deduplicated so
//! unchanged state never produces output churn.

use std::fmt;

use tracing::{debug, warn};

use crate::actor::{self, Receiver, Sender as ActorSender};
use crate::common::config::BarSettings;
use crate::ui::widgets::{self, Cell, PLACEHOLDER, RefreshPolicy, Widget, WmSnapshot};

pub type Sender = ActorSender<Event>;

/// Where composed rows go. The rendering backend drains the other end.
pub type BarSink = tokio::sync::mpsc::UnboundedSender<Vec<Cell>>;

pub enum Event {
    /// Manager state changed; event-subscribed widgets re-render.
    State(WmSnapshot),
    /// Interval timer for one widget fired.
    Tick(usize),
    /// A background render finished and hands the widget back.
    Rendered(usize, Box<dyn Widget>, anyhow::Result<Vec<Cell>>),
    Shutdown,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::State(_) => f.write_str("State(..)"),
            Event::Tick(i) => write!(f, "Tick({i})"),
            Event::Rendered(i, widget, result) => {
                write!(f, "Rendered({i}, {widget:?}, ok={})", result.is_ok())
            }
            Event::Shutdown => f.write_str("Shutdown"),
        }
    }
}

struct Slot {
    /// Taken while a render for this widget is in flight.
    widget: Option<Box<dyn Widget>>,
    policy: RefreshPolicy,
    cells: Vec<Cell>,
}

pub struct Bar {
    slots: Vec<Slot>,
    state: WmSnapshot,
    last_row: Option<Vec<Cell>>,
    sink: BarSink,
    receiver: Receiver<Event>,
    sender: Sender,
}

impl Bar {
    pub fn new(settings: &BarSettings, sink: BarSink) -> (Self, Sender) {
        let (sender, receiver) = actor::channel();
        let slots = settings
            .widgets
            .iter()
            .map(|config| {
                let widget = widgets::build(config);
                Slot {
                    policy: widget.policy(),
                    widget: Some(widget),
                    cells: Vec::new(),
                }
            })
            .collect();
        let this = Bar {
            slots,
            state: WmSnapshot::default(),
            last_row: None,
            sink,
            receiver,
            sender: sender.clone(),
        };
        (this, sender)
    }

    pub async fn run(mut self) {
        self.spawn_tickers();
        while let Some((span, event)) = self.receiver.recv().await {
            let _guard = span.enter();
            if matches!(event, Event::Shutdown) {
                break;
            }
            self.handle_event(event);
        }
    }

    fn spawn_tickers(&self) {
        for (index, slot) in self.slots.iter().enumerate() {
            let RefreshPolicy::Interval(period) = slot.policy else {
                continue;
            };
            let sender = self.sender.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    sender.send(Event::Tick(index));
                }
            });
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::State(snapshot) => {
                if snapshot == self.state {
                    return;
                }
                self.state = snapshot;
                for index in 0..self.slots.len() {
                    if self.slots[index].policy == RefreshPolicy::OnStateChange {
                        self.render_slot(index);
                    }
                }
            }
            Event::Tick(index) => self.render_slot(index),
            Event::Rendered(index, widget, result) => {
                self.finish_render(index, widget, result)
            }
            Event::Shutdown => {}
        }
    }

    /// Kicks off a background render. A widget whose previous render is
    /// still in flight skips this round instead of queueing behind it.
    fn render_slot(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(mut widget) = slot.widget.take() else {
            debug!(widget = index, "render still in flight; skipping refresh");
            return;
        };
        let state = self.state.clone();
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let result = widget.render(&state);
            sender.send(Event::Rendered(index, widget, result));
        });
    }

    fn finish_render(
        &mut self,
        index: usize,
        widget: Box<dyn Widget>,
        result: anyhow::Result<Vec<Cell>>,
    ) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        slot.cells = match result {
            Ok(cells) => cells,
            Err(e) => {
                warn!(widget = widget.name(), "widget render failed: {e:#}");
                vec![Cell::new(PLACEHOLDER)]
            }
        };
        slot.widget = Some(widget);
        self.redraw();
    }

    fn redraw(&mut self) {
        let row = self.compose();
        if self.last_row.as_ref() == Some(&row) {
            return;
        }
        _ = self.sink.send(row.clone());
        self.last_row = Some(row);
    }

    fn compose(&self) -> Vec<Cell> {
        self.slots
            .iter()
            .flat_map(|slot| slot.cells.iter())
            .filter(|cell| !cell.text.is_empty())
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn cells(&self, index: usize) -> &[Cell] {
        &self.slots[index].cells
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    use super::*;
    use crate::common::config::WidgetConfig;
    use crate::ui::widgets::{BG_ACTIVE, GroupStatus};

    struct Failing;

    impl Widget for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn policy(&self) -> RefreshPolicy {
            RefreshPolicy::OnStateChange
        }

        fn render(&mut self, _state: &WmSnapshot) -> anyhow::Result<Vec<Cell>> {
            Err(anyhow!("source unavailable"))
        }
    }

    fn settings() -> BarSettings {
        BarSettings {
            enabled: true,
            height: 30.0,
            widgets: vec![
                WidgetConfig::GroupBox {},
                WidgetConfig::Text { text: "|".into() },
            ],
        }
    }

    fn snapshot() -> WmSnapshot {
        WmSnapshot {
            groups: vec![GroupStatus {
                name: "1".into(),
                active: true,
                populated: false,
            }],
            focused_title: None,
            layout_name: "columns".into(),
        }
    }

    fn bar() -> (Bar, UnboundedReceiver<Vec<Cell>>) {
        let (sink, rows) = unbounded_channel();
        let (bar, _tx) = Bar::new(&settings(), sink);
        (bar, rows)
    }

    /// Drives a render to completion synchronously, standing in for the
    /// spawn_blocking round trip.
    fn render_inline(bar: &mut Bar, index: usize) {
        let mut widget = bar.slots[index].widget.take().unwrap();
        let result = widget.render(&bar.state.clone());
        bar.finish_render(index, widget, result);
    }

    #[test]
    fn state_change_rerenders_subscribed_widgets() {
        let (mut bar, _rows) = bar();
        bar.state = snapshot();
        render_inline(&mut bar, 0);
        assert_eq!(bar.cells(0)[0].text, "1");
        assert_eq!(bar.cells(0)[0].bg, Some(BG_ACTIVE));
    }

    #[test]
    fn composed_rows_reach_the_sink() {
        let (mut bar, mut rows) = bar();
        bar.state = snapshot();
        render_inline(&mut bar, 0);
        render_inline(&mut bar, 1);
        // The second render pushes the full row; drain to the latest.
        let mut latest = None;
        while let Ok(row) = rows.try_recv() {
            latest = Some(row);
        }
        let row = latest.expect("a row must have been emitted");
        let texts: Vec<&str> = row.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "|"]);
    }

    #[test]
    fn failing_widget_shows_a_placeholder() {
        let (mut bar, _rows) = bar();
        bar.finish_render(0, Box::new(Failing), Failing.render(&WmSnapshot::default()));
        assert_eq!(bar.cells(0), &[Cell::new(PLACEHOLDER)]);
        // The widget is handed back and can render again later.
        assert!(bar.slots[0].widget.is_some());
    }

    #[test]
    fn unchanged_state_produces_no_new_row() {
        let (mut bar, mut rows) = bar();
        bar.state = snapshot();
        render_inline(&mut bar, 0);
        render_inline(&mut bar, 1);
        while rows.try_recv().is_ok() {}
        bar.handle_event(Event::State(snapshot()));
        assert!(rows.try_recv().is_err());
    }

    #[test]
    fn a_busy_widget_does_not_block_the_others() {
        let (mut bar, _rows) = bar();
        bar.state = snapshot();
        // Widget 0 is mid-render: its slot is empty.
        let parked = bar.slots[0].widget.take().unwrap();
        bar.render_slot(0);
        render_inline(&mut bar, 1);
        assert_eq!(bar.cells(1)[0].text, "|");
        bar.slots[0].widget = Some(parked);
    }
}
