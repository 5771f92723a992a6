/*!
 * Signals
 *
 * A [`Signal`] is a named, mutable value with an ordered list of
 * subscribers. Calling [`Signal::update`] snapshots the current
 * subscriber list, notifies each in order, and returns whatever further
 * events those callbacks produced.
 */

mod trace;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::InlineString;
use crate::errors::SignalError;
use crate::event::{Context, Event, EventCallback};
use crate::time::EventTime;
use crate::value::{sig_start_default, EventValue};

pub use trace::{reset_trace_handler, set_trace_handler};

/// A handle to one subscriber registered on a [`Signal`].
///
/// Identity, not structure, is what makes two connections distinct: two
/// `connect()` calls with an identical callback and context still produce
/// two independent handles, each removable without affecting the other.
#[derive(Clone)]
pub struct SignalConnection(Arc<SignalConnectionInner>);

struct SignalConnectionInner {
    call: EventCallback,
    call_context: Option<Context>,
}

impl SignalConnection {
    fn new(call: EventCallback, call_context: Option<Context>) -> Self {
        Self(Arc::new(SignalConnectionInner { call, call_context }))
    }

    fn invoke(&self, time: EventTime, value: EventValue) -> Option<Vec<Event>> {
        (self.0.call)(time, Some(value), self.0.call_context.clone())
    }
}

impl PartialEq for SignalConnection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SignalConnection {}

struct SignalState {
    value: EventValue,
    previous_value: EventValue,
    connected_clients: Vec<SignalConnection>,
    trace_connection: Option<SignalConnection>,
}

/// A named broadcast value. Cheap to clone; clones share the same
/// underlying state.
#[derive(Clone)]
pub struct Signal(Arc<SignalInner>);

struct SignalInner {
    name: InlineString,
    state: RwLock<SignalState>,
}

impl Signal {
    pub fn new(name: impl Into<InlineString>, start_value: impl Into<Option<EventValue>>) -> Self {
        let value = start_value.into().unwrap_or_else(sig_start_default);
        Self(Arc::new(SignalInner {
            name: name.into(),
            state: RwLock::new(SignalState {
                previous_value: crate::value::sig_undefined(),
                value,
                connected_clients: Vec::new(),
                trace_connection: None,
            }),
        }))
    }

    pub fn name(&self) -> &InlineString {
        &self.0.name
    }

    pub fn value(&self) -> EventValue {
        self.0.state.read().value.clone()
    }

    pub fn previous_value(&self) -> EventValue {
        self.0.state.read().previous_value.clone()
    }

    /// Update the signal's value and notify every currently-connected
    /// subscriber, in list order, with the new value. Connections made by
    /// a subscriber re-entrantly during this call are not notified by this
    /// call (the subscriber list is snapshotted before iterating).
    pub fn update(&self, time: impl Into<EventTime>, value: impl Into<Option<EventValue>>) -> Vec<Event> {
        let time = time.into();
        let value = value.into().unwrap_or_else(crate::value::sig_zero);

        let snapshot = {
            let mut state = self.0.state.write();
            state.previous_value = std::mem::replace(&mut state.value, value.clone());
            state.connected_clients.clone()
        };

        let mut produced = Vec::new();
        for conn in &snapshot {
            if let Some(events) = conn.invoke(time, value.clone()) {
                produced.extend(events);
            }
        }
        produced
    }

    /// Register a new subscriber. `index = -1` appends, `0` prepends;
    /// any other index inserts at that position (clamped to the list's
    /// current length).
    pub fn connect(
        &self,
        call: EventCallback,
        call_context: impl Into<Option<Context>>,
        index: i64,
    ) -> SignalConnection {
        let conn = SignalConnection::new(call, call_context.into());
        let mut state = self.0.state.write();
        let len = state.connected_clients.len();
        let pos = if index < 0 {
            len
        } else {
            (index as usize).min(len)
        };
        state.connected_clients.insert(pos, conn.clone());
        conn
    }

    /// Remove every occurrence of `conn`. A handle that is not present is
    /// silently ignored.
    pub fn disconnect(&self, conn: &SignalConnection) -> Result<(), SignalError> {
        let mut state = self.0.state.write();
        state.connected_clients.retain(|c| c != conn);
        Ok(())
    }

    /// Install the built-in trace hook at the front of the subscriber
    /// list, if not already installed.
    pub fn trace(&self) {
        let mut state = self.0.state.write();
        if state.trace_connection.is_some() {
            return;
        }
        let sig = self.clone();
        let call: EventCallback = Arc::new(move |time, value, _ctx| {
            trace::emit(&sig, time, value);
            None
        });
        let conn = SignalConnection::new(call, None);
        state.connected_clients.insert(0, conn.clone());
        state.trace_connection = Some(conn);
    }

    pub fn untrace(&self) {
        let mut state = self.0.state.write();
        if let Some(conn) = state.trace_connection.take() {
            state.connected_clients.retain(|c| *c != conn);
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Signal {}
