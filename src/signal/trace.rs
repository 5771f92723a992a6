/*!
 * The process-wide, replaceable trace sink for signal updates.
 *
 * The default sink writes one `log::info!` line per traced update; tests
 * and embedders can swap it out via [`set_trace_handler`].
 */

use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::time::EventTime;
use crate::value::EventValue;

use super::Signal;

/// A sink invoked once per traced signal update.
pub type TraceSink = Box<dyn Fn(&Signal, EventTime, &Option<EventValue>) + Send + Sync>;

fn handler() -> &'static RwLock<TraceSink> {
    static TRACE_HANDLER_CLIENT: OnceLock<RwLock<TraceSink>> = OnceLock::new();
    TRACE_HANDLER_CLIENT.get_or_init(|| RwLock::new(Box::new(default_sink)))
}

fn default_sink(signal: &Signal, time: EventTime, value: &Option<EventValue>) {
    let value = value.as_ref().map(|v| v.to_string()).unwrap_or_default();
    log::info!(
        "@{time}: Sig<{}> : {} ==> {}",
        signal.name(),
        signal.previous_value(),
        value
    );
}

pub(super) fn emit(signal: &Signal, time: EventTime, value: Option<EventValue>) {
    (handler().read())(signal, time, &value);
}

/// Replace the process-wide trace sink.
pub fn set_trace_handler(sink: TraceSink) {
    *handler().write() = sink;
}

/// Restore the default trace sink.
pub fn reset_trace_handler() {
    *handler().write() = Box::new(default_sink);
}
