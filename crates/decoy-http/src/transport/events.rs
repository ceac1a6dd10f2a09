//! Lifecycle events and listener registration.
//!
//! Listeners are kept per event kind in registration order. The single-slot
//! legacy callbacks (`on_load` and friends) are not special-cased at dispatch
//! time: each transport registers one wrapper listener per callback kind when
//! it is created, and the wrapper forwards to whatever callback is currently
//! installed.

use super::headers::{self, Headers};
use super::ReadyState;
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kinds of events a transport emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReadyStateChange,
    LoadStart,
    Load,
    Abort,
    LoadEnd,
    Error,
    /// Any other name passed to `dispatch_event`.
    Custom(String),
}

impl EventKind {
    /// Kinds that have a wrapper listener for their legacy callback.
    pub(crate) const WRAPPED: [EventKind; 5] = [
        EventKind::ReadyStateChange,
        EventKind::LoadStart,
        EventKind::Load,
        EventKind::Abort,
        EventKind::LoadEnd,
    ];

    pub fn name(&self) -> &str {
        match self {
            EventKind::ReadyStateChange => "readystatechange",
            EventKind::LoadStart => "loadstart",
            EventKind::Load => "load",
            EventKind::Abort => "abort",
            EventKind::LoadEnd => "loadend",
            EventKind::Error => "error",
            EventKind::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "readystatechange" => EventKind::ReadyStateChange,
            "loadstart" => EventKind::LoadStart,
            "load" => EventKind::Load,
            "abort" => EventKind::Abort,
            "loadend" => EventKind::LoadEnd,
            "error" => EventKind::Error,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event delivered to listeners.
///
/// Events emitted at HEADERS_RECEIVED or later carry a snapshot of the
/// response received so far.
#[derive(Debug)]
pub struct Event {
    kind: EventKind,
    ready_state: ReadyState,
    status: u16,
    response_headers: Headers,
    response_text: Option<String>,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind, ready_state: ReadyState, status: u16) -> Self {
        Self {
            kind,
            ready_state,
            status,
            response_headers: Headers::new(),
            response_text: None,
            default_prevented: Cell::new(false),
        }
    }

    /// Attach the response headers and the body text delivered so far.
    pub fn with_response(mut self, headers: Headers, text: Option<String>) -> Self {
        self.response_headers = headers;
        self.response_text = text;
        self
    }

    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    /// Case-insensitive response header lookup.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        headers::find(&self.response_headers, name)
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Readiness of the transport when the event was emitted.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// An event listener.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned when a listener is registered, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Currently installed legacy callbacks, shared with the wrapper listeners.
pub(crate) type Callbacks = Arc<Mutex<HashMap<EventKind, Listener>>>;

/// Ordered listener lists keyed by event kind.
#[derive(Default)]
pub(crate) struct EventTarget {
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventTarget {
    /// A target with one wrapper listener per legacy callback kind.
    pub(crate) fn with_callbacks(callbacks: &Callbacks) -> Self {
        let mut target = Self::default();
        for kind in EventKind::WRAPPED {
            let callbacks = Arc::clone(callbacks);
            let slot = kind.clone();
            target.add(
                kind,
                Arc::new(move |event: &Event| {
                    let callback = callbacks.lock().get(&slot).cloned();
                    if let Some(callback) = callback {
                        callback(event);
                    }
                }),
            );
        }
        target
    }

    pub(crate) fn add(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, kind: &EventKind, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(kind) else {
            return false;
        };
        match listeners.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn dispatch(&self, event: &Event) -> bool {
        if let Some(listeners) = self.listeners.get(event.kind()) {
            for (_, listener) in listeners {
                listener(event);
            }
        }
        event.default_prevented()
    }

    pub(crate) fn count(&self, kind: &EventKind) -> usize {
        self.listeners.get(kind).map_or(0, Vec::len)
    }
}
