use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::bridge::ForeignLoopError;
use crate::patterns::TextSink;
use crate::source::{Callback, EventSource, SourceError};

/// Payload delivered to widget callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetEvent {
    pub widget: Arc<str>,
    pub event: Arc<str>,
    /// Per-widget dispatch counter, starting at 0.
    pub seq: u64,
}

struct Handler {
    id: u64,
    event: Arc<str>,
    callback: Callback<WidgetEvent>,
}

#[derive(Default)]
struct WidgetState {
    events: Vec<String>,
    handlers: Vec<Handler>,
    texts: Vec<String>,
    dispatched: u64,
    destroyed: bool,
}

impl WidgetState {
    fn count(&self, event: &str) -> usize {
        self.handlers.iter().filter(|h| &*h.event == event).count()
    }
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    widgets: HashMap<Arc<str>, WidgetState>,
    unsubscribed: Vec<u64>,
}

/// In-process stand-in for a UI engine.
///
/// Widgets keep a handler table per event and a history of every text they
/// displayed. Callbacks run synchronously on the dispatching thread while the
/// engine lock is held, so once `unsubscribe` returns no callback of that
/// registration is running or will run.
#[derive(Default)]
pub struct SimEngine {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl SimEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a handle to the widget `name`, creating it with the given events
    /// if it does not exist yet.
    pub fn widget(self: &Arc<Self>, name: &str, events: &[&str]) -> Arc<Widget> {
        let name: Arc<str> = Arc::from(name);
        self.lock()
            .widgets
            .entry(name.clone())
            .or_insert_with(|| WidgetState {
                events: events.iter().map(|e| e.to_string()).collect(),
                ..WidgetState::default()
            });
        Arc::new(Widget {
            engine: Arc::clone(self),
            name,
        })
    }

    /// Invokes every callback registered for `event` on `widget`; returns how many ran.
    pub fn dispatch(&self, widget: &str, event: &str) -> usize {
        let mut inner = self.lock();
        let Some(state) = inner.widgets.get_mut(widget) else {
            return 0;
        };
        if state.destroyed {
            return 0;
        }

        let payload = WidgetEvent {
            widget: Arc::from(widget),
            event: Arc::from(event),
            seq: state.dispatched,
        };
        state.dispatched += 1;

        let mut ran = 0;
        for handler in state.handlers.iter().filter(|h| &*h.event == event) {
            (handler.callback)(payload.clone());
            ran += 1;
        }
        debug!(widget, event, callbacks = ran, "dispatched");
        ran
    }

    /// Destroys `widget`: its callbacks are dropped and later subscriptions are refused.
    pub fn destroy(&self, widget: &str) {
        let mut inner = self.lock();
        if let Some(state) = inner.widgets.get_mut(widget) {
            state.destroyed = true;
            state.handlers.clear();
        }
        debug!(widget, "destroyed");
        self.changed.notify_all();
    }

    /// Blocks until `widget` has at least `count` callbacks for `event`.
    pub fn await_subscribers(
        &self,
        widget: &str,
        event: &str,
        count: usize,
        within: Duration,
    ) -> Result<(), ForeignLoopError> {
        let guard = self.lock();
        let (inner, _) = self
            .changed
            .wait_timeout_while(guard, within, |inner| {
                count_of(inner, widget, event) < count
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let have = count_of(&inner, widget, event);
        if have < count {
            return Err(ForeignLoopError::TimedOut(format!(
                "{widget}.{event}: {have}/{count} subscribers after {within:?}"
            )));
        }
        Ok(())
    }

    /// Every text `widget` displayed, oldest first.
    pub fn texts(&self, widget: &str) -> Vec<String> {
        self.lock()
            .widgets
            .get(widget)
            .map(|w| w.texts.clone())
            .unwrap_or_default()
    }

    /// Text currently displayed by `widget`.
    pub fn text(&self, widget: &str) -> Option<String> {
        self.lock()
            .widgets
            .get(widget)
            .and_then(|w| w.texts.last().cloned())
    }

    /// Number of live callbacks for `event` on `widget`.
    pub fn subscribers(&self, widget: &str, event: &str) -> usize {
        count_of(&self.lock(), widget, event)
    }

    /// Handles passed to `unsubscribe`, in call order.
    pub fn unsubscribed(&self) -> Vec<u64> {
        self.lock().unsubscribed.clone()
    }

    pub fn is_destroyed(&self, widget: &str) -> bool {
        self.lock()
            .widgets
            .get(widget)
            .is_some_and(|w| w.destroyed)
    }

    fn subscribe(
        &self,
        widget: &str,
        event: &str,
        callback: Callback<WidgetEvent>,
    ) -> Result<u64, SourceError> {
        let mut inner = self.lock();
        let id = inner.next_handle;
        let state = match inner.widgets.get_mut(widget) {
            Some(state) if !state.destroyed => state,
            _ => return Err(SourceError::Invalidated),
        };
        if !state.events.iter().any(|e| e == event) {
            return Err(SourceError::UnknownEvent {
                event: event.to_string(),
            });
        }

        state.handlers.push(Handler {
            id,
            event: Arc::from(event),
            callback,
        });
        inner.next_handle += 1;
        self.changed.notify_all();
        Ok(id)
    }

    fn unsubscribe(&self, handle: u64) {
        let mut inner = self.lock();
        inner.unsubscribed.push(handle);
        for state in inner.widgets.values_mut() {
            state.handlers.retain(|h| h.id != handle);
        }
        self.changed.notify_all();
    }

    fn set_text(&self, widget: &str, text: &str) {
        let mut inner = self.lock();
        match inner.widgets.get_mut(widget) {
            Some(state) if !state.destroyed => state.texts.push(text.to_string()),
            _ => debug!(widget, text, "text on missing widget ignored"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn count_of(inner: &Inner, widget: &str, event: &str) -> usize {
    inner
        .widgets
        .get(widget)
        .map(|w| w.count(event))
        .unwrap_or(0)
}

/// Handle to one widget of a [`SimEngine`].
pub struct Widget {
    engine: Arc<SimEngine>,
    name: Arc<str>,
}

impl Widget {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl EventSource for Widget {
    type Payload = WidgetEvent;
    type Handle = u64;

    fn subscribe(
        &self,
        event: &str,
        callback: Callback<WidgetEvent>,
    ) -> Result<u64, SourceError> {
        self.engine.subscribe(&self.name, event, callback)
    }

    fn unsubscribe(&self, handle: u64) {
        self.engine.unsubscribe(handle);
    }
}

impl TextSink for Widget {
    fn set_text(&self, text: &str) {
        self.engine.set_text(&self.name, text);
    }
}
