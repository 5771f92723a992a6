/*!
 * Events
 *
 * An [`Event`] pairs a simulated time with a callback and its (optional)
 * value and context. The [`Sequencer`](crate::sequencer::Sequencer) owns
 * pending events exclusively and invokes them in `(time, priority)` order.
 */

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::time::EventTime;
use crate::value::EventValue;

/// Opaque, cheaply-cloneable, type-erased context passed through to
/// callbacks. The kernel never inspects its contents.
pub type Context = Arc<dyn Any + Send + Sync>;

/// The single callback signature every event callback is normalized to:
/// `(time, value, context) -> further events to schedule`.
///
/// Handlers that only care about a prefix of the triple simply ignore the
/// trailing arguments; see [`crate::device::HandlerArity`] for how
/// [`crate::device::Device::act`] validates a handler's declared shape
/// against what it was actually called with.
pub type EventCallback = Arc<dyn Fn(EventTime, Option<EventValue>, Option<Context>) -> Option<Vec<Event>> + Send + Sync>;

/// A scheduled, timestamped callable.
#[derive(Clone)]
pub struct Event {
    time: EventTime,
    callback: EventCallback,
    value: Option<EventValue>,
    context: Option<Context>,
}

impl Event {
    pub fn new(
        time: impl Into<EventTime>,
        callback: EventCallback,
        value: impl Into<Option<EventValue>>,
        context: impl Into<Option<Context>>,
    ) -> Self {
        Self {
            time: time.into(),
            callback,
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn time(&self) -> EventTime {
        self.time
    }

    pub fn value(&self) -> Option<&EventValue> {
        self.value.as_ref()
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Invoke the callback with the full `(time, value, context)` triple,
    /// returning whatever further events it produced.
    pub fn action(&self) -> Option<Vec<Event>> {
        (self.callback)(self.time, self.value.clone(), self.context.clone())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
