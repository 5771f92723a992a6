/*!
 * Devices
 *
 * A [`Device`] hosts a small state machine plus a set of declared inputs,
 * actions, and outputs. Every input/action call runs through a uniform
 * wrapper ([`Device::dispatch`]) that enforces the re-entrancy discipline
 * (`act`/`out`/`xto` may only be called from within a handler body),
 * invokes pre/post hooks, and collects any further events the handler
 * scheduled.
 */

mod handler;
mod hooks;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::InlineString;
use crate::errors::DeviceError;
use crate::event::{Context, Event, EventCallback};
use crate::signal::{Signal, SignalConnection};
use crate::time::EventTime;
use crate::value::EventValue;

pub use handler::HandlerArity;
use handler::{HandlerEntry, HandlerKind};
pub use hooks::{HookContext, HookHandle, XtoContext};
use hooks::{HookEntry, HookWhen};

type DesimResult<T> = Result<T, DeviceError>;

/// A stateful participant in the simulation: inputs feed it, actions are
/// its self-scheduled delayed work, and outputs are the signals it owns.
///
/// Cheap to clone; clones share the same underlying state, which is how a
/// registered handler closure can capture a handle back to its own device.
#[derive(Clone)]
pub struct Device(Arc<DeviceCore>);

struct DeviceCore {
    name: InlineString,
    states: Vec<InlineString>,
    state: RwLock<InlineString>,
    timings: RwLock<HashMap<InlineString, f64>>,
    handlers: RwLock<HashMap<InlineString, HandlerEntry>>,
    outputs: RwLock<HashMap<InlineString, Signal>>,
    /// Output hooks installed via [`Device::hook`], tracked separately from
    /// the `Signal`'s own connection list so by-name `unhook_by_name` can
    /// find and disconnect them, mirroring `device.py`'s `_output_hooks`.
    output_hooks: RwLock<HashMap<InlineString, Vec<SignalConnection>>>,
    pre_hooks: RwLock<HashMap<InlineString, Vec<HookEntry>>>,
    post_hooks: RwLock<HashMap<InlineString, Vec<HookEntry>>>,
    further_acts: RwLock<Vec<Event>>,
    current_time: RwLock<Option<(EventTime, InlineString)>>,
}

impl Device {
    /// `states` must be non-empty; the device starts in `states[0]`.
    /// `timings` keys must all start with `"t_"`.
    pub fn new(
        name: impl Into<InlineString>,
        states: Vec<InlineString>,
        timings: HashMap<InlineString, f64>,
    ) -> DesimResult<Self> {
        let name = name.into();
        for key in timings.keys() {
            if !key.as_str().starts_with("t_") {
                return Err(DeviceError::InvalidTiming {
                    device: name.clone(),
                    key: key.as_str().to_string(),
                });
            }
        }
        let initial_state = states.first().cloned().unwrap_or_else(|| InlineString::from("idle"));
        Ok(Self(Arc::new(DeviceCore {
            name,
            states,
            state: RwLock::new(initial_state),
            timings: RwLock::new(timings),
            handlers: RwLock::new(HashMap::new()),
            outputs: RwLock::new(HashMap::new()),
            output_hooks: RwLock::new(HashMap::new()),
            pre_hooks: RwLock::new(HashMap::new()),
            post_hooks: RwLock::new(HashMap::new()),
            further_acts: RwLock::new(Vec::new()),
            current_time: RwLock::new(None),
        })))
    }

    pub fn name(&self) -> &InlineString {
        &self.0.name
    }

    pub fn state(&self) -> InlineString {
        self.0.state.read().clone()
    }

    pub fn timing(&self, key: &str) -> Option<f64> {
        self.0.timings.read().get(key).copied()
    }

    // -- registration --------------------------------------------------

    pub fn register_input(&self, name: impl Into<InlineString>, arity: HandlerArity, call: EventCallback) {
        self.0.handlers.write().insert(
            name.into(),
            HandlerEntry {
                kind: HandlerKind::Input,
                arity,
                call,
            },
        );
    }

    pub fn register_action(&self, name: impl Into<InlineString>, arity: HandlerArity, call: EventCallback) {
        self.0.handlers.write().insert(
            name.into(),
            HandlerEntry {
                kind: HandlerKind::Action,
                arity,
                call,
            },
        );
    }

    pub fn add_output(&self, name: impl Into<InlineString>, start_value: impl Into<Option<EventValue>>) -> Signal {
        let name = name.into();
        let signal = Signal::new(name.clone(), start_value.into());
        self.0.outputs.write().insert(name, signal.clone());
        signal
    }

    pub fn output(&self, name: &str) -> Option<Signal> {
        self.0.outputs.read().get(name).cloned()
    }

    pub fn inputs(&self) -> Vec<InlineString> {
        self.component_names(HandlerKind::Input)
    }

    pub fn actions(&self) -> Vec<InlineString> {
        self.component_names(HandlerKind::Action)
    }

    fn component_names(&self, kind: HandlerKind) -> Vec<InlineString> {
        self.0
            .handlers
            .read()
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Produce a Sequencer-schedulable callback for a registered input.
    /// Errors from the underlying dispatch (unknown name, wrong kind,
    /// re-entrancy) are logged and surfaced as an empty event batch,
    /// since the `Event` callback boundary cannot carry a `Result`.
    pub fn input_handle(&self, name: &str) -> DesimResult<EventCallback> {
        self.component_handle(name, HandlerKind::Input)
    }

    pub fn action_handle(&self, name: &str) -> DesimResult<EventCallback> {
        self.component_handle(name, HandlerKind::Action)
    }

    fn component_handle(&self, name: &str, kind: HandlerKind) -> DesimResult<EventCallback> {
        {
            let handlers = self.0.handlers.read();
            let entry = handlers
                .get(name)
                .ok_or_else(|| DeviceError::UnknownComponent {
                    device: self.0.name.clone(),
                    name: InlineString::from(name),
                })?;
            if entry.kind != kind {
                return Err(DeviceError::UnknownComponent {
                    device: self.0.name.clone(),
                    name: InlineString::from(name),
                });
            }
        }
        let device = self.clone();
        let name = InlineString::from(name);
        Ok(Arc::new(move |time, value, context| {
            match device.dispatch(name.as_str(), time, value, context) {
                Ok(events) => Some(events),
                Err(err) => {
                    log::error!("{err}");
                    None
                }
            }
        }))
    }

    /// Directly invoke a registered input or action, bypassing the
    /// Sequencer. Used by tests and by callers that want the `Result`.
    pub fn call(&self, name: &str, time: impl Into<EventTime>, value: impl Into<Option<EventValue>>, context: impl Into<Option<Context>>) -> DesimResult<Vec<Event>> {
        self.dispatch(name, time.into(), value.into(), context.into())
    }

    fn dispatch(&self, name: &str, time: EventTime, value: Option<EventValue>, context: Option<Context>) -> DesimResult<Vec<Event>> {
        let entry = {
            let handlers = self.0.handlers.read();
            handlers
                .get(name)
                .cloned()
                .ok_or_else(|| DeviceError::UnknownComponent {
                    device: self.0.name.clone(),
                    name: InlineString::from(name),
                })?
        };

        {
            let mut guard = self.0.current_time.write();
            if guard.is_some() {
                return Err(DeviceError::AlreadyDispatching {
                    device: self.0.name.clone(),
                    context: InlineString::from(name),
                });
            }
            *guard = Some((time, InlineString::from(name)));
        }

        let pre_events = self.fire_hooks(&self.0.pre_hooks, name, time, value.clone(), context.clone());
        let handler_events = (entry.call)(time, value.clone(), context.clone()).unwrap_or_default();
        let post_events = self.fire_hooks(&self.0.post_hooks, name, time, value, context);

        let further = std::mem::take(&mut *self.0.further_acts.write());
        *self.0.current_time.write() = None;

        let mut all = pre_events;
        all.extend(handler_events);
        all.extend(post_events);
        all.extend(further);
        Ok(all)
    }

    fn fire_hooks(
        &self,
        table: &RwLock<HashMap<InlineString, Vec<HookEntry>>>,
        component: &str,
        time: EventTime,
        value: Option<EventValue>,
        call_context: Option<Context>,
    ) -> Vec<Event> {
        let entries = table.read().get(component).cloned().unwrap_or_default();
        let mut produced = Vec::new();
        for entry in entries {
            let combined: Context = Arc::new(HookContext {
                call_context: call_context.clone(),
                hook_context: entry.hook_context(),
            });
            if let Some(events) = (entry.call())(time, value.clone(), Some(combined)) {
                produced.extend(events);
            }
        }
        produced
    }

    // -- re-entrant helpers: act / out / xto ----------------------------

    fn require_handler_context(&self, component: &str) -> DesimResult<(EventTime, InlineString)> {
        self.0
            .current_time
            .read()
            .clone()
            .ok_or_else(|| DeviceError::NotInHandler {
                device: self.0.name.clone(),
                component: InlineString::from(component),
            })
    }

    /// Schedule `action_name` to run at `time`. Only callable from within
    /// an input or action body. `action_name` is looked up as given, then
    /// with an `"act"` prefix, then `"act_"`, matching the lookup order of
    /// the system this kernel is modeled on.
    pub fn act(
        &self,
        action_name: &str,
        time: impl Into<EventTime>,
        value: impl Into<Option<EventValue>>,
        context: impl Into<Option<Context>>,
    ) -> DesimResult<()> {
        let (now, _caller) = self.require_handler_context("act")?;
        let time = time.into();
        let value = value.into();
        let context = context.into();

        let (resolved_name, entry) = self.resolve_action(action_name)?;

        if !entry.arity.accepts(value.is_some(), context.is_some()) {
            return Err(DeviceError::ArityMismatch {
                device: self.0.name.clone(),
                action: resolved_name,
                expected: entry.arity.describe(),
                got: describe_args(value.is_some(), context.is_some()),
            });
        }

        let hook_ctx: Context = Arc::new(resolved_name.clone());
        let hook_events = self.fire_hooks(&self.0.pre_hooks, "act", now, value.clone(), Some(hook_ctx));

        let call = entry.call.clone();
        self.0.further_acts.write().push(Event::new(time, call, value, context));
        self.0.further_acts.write().extend(hook_events);
        Ok(())
    }

    fn resolve_action(&self, name: &str) -> DesimResult<(InlineString, HandlerEntry)> {
        let handlers = self.0.handlers.read();
        for candidate in [name.to_string(), format!("act{name}"), format!("act_{name}")] {
            if let Some(entry) = handlers.get(candidate.as_str()) {
                if entry.kind == HandlerKind::Action {
                    return Ok((InlineString::from(candidate.as_str()), entry.clone()));
                }
            }
        }
        Err(DeviceError::UnknownComponent {
            device: self.0.name.clone(),
            name: InlineString::from(name),
        })
    }

    /// Update output `output_name` with `value` (defaulting to
    /// `SIG_UNDEFINED`). Only callable from within an input or action
    /// body.
    pub fn out(&self, output_name: &str, value: impl Into<Option<EventValue>>) -> DesimResult<()> {
        let (now, _caller) = self.require_handler_context("out")?;
        let value = value.into().unwrap_or_else(crate::value::sig_undefined);

        let hook_ctx: Context = Arc::new(InlineString::from(output_name));
        let hook_events = self.fire_hooks(&self.0.pre_hooks, "out", now, Some(value.clone()), Some(hook_ctx));

        let signal = self.0.outputs.read().get(output_name).cloned().ok_or_else(|| DeviceError::UnknownComponent {
            device: self.0.name.clone(),
            name: InlineString::from(output_name),
        })?;

        let produced = signal.update(now, value);
        let mut further = self.0.further_acts.write();
        further.extend(hook_events);
        further.extend(produced);
        Ok(())
    }

    /// Assert the device is currently in one of `current_states`, and
    /// optionally transition it to `new_state`. Only callable from within
    /// an input or action body.
    pub fn xto(&self, current_states: &[&str], new_state: Option<&str>) -> DesimResult<()> {
        let (now, caller) = self.require_handler_context("xto")?;

        for s in current_states {
            self.require_known_state(s)?;
        }
        let actual = self.0.state.read().clone();
        if !current_states.iter().any(|s| *s == actual.as_str()) {
            return Err(DeviceError::StateGuard {
                device: self.0.name.clone(),
                caller,
                current: actual,
                expected: current_states.join(" | "),
            });
        }

        let target = match new_state {
            Some(ns) => {
                self.require_known_state(ns)?;
                InlineString::from(ns)
            }
            None => actual.clone(),
        };

        let hook_ctx: Context = Arc::new(XtoContext {
            caller,
            old_state: actual,
            new_state: target.clone(),
        });
        let hook_events = self.fire_hooks(&self.0.pre_hooks, "xto", now, None, Some(hook_ctx));
        self.0.further_acts.write().extend(hook_events);

        if new_state.is_some() {
            *self.0.state.write() = target;
        }
        Ok(())
    }

    fn require_known_state(&self, name: &str) -> DesimResult<()> {
        if self.0.states.iter().any(|s| s.as_str() == name) {
            Ok(())
        } else {
            Err(DeviceError::UnknownState {
                device: self.0.name.clone(),
                state: InlineString::from(name),
            })
        }
    }

    // -- hooks -----------------------------------------------------------

    pub fn hook(
        &self,
        name: &str,
        call: EventCallback,
        context: impl Into<Option<Context>>,
        call_after: bool,
    ) -> DesimResult<HookHandle> {
        let context = context.into();

        if let Some(signal) = self.0.outputs.read().get(name).cloned() {
            let wrapped: EventCallback = {
                let call = call.clone();
                let context = context.clone();
                Arc::new(move |time, value, _call_ctx| {
                    let combined: Context = Arc::new(HookContext {
                        call_context: None,
                        hook_context: context.clone(),
                    });
                    call(time, value, Some(combined))
                })
            };
            let index = if call_after { -1 } else { 0 };
            let conn = signal.connect(wrapped, None, index);
            self.0
                .output_hooks
                .write()
                .entry(InlineString::from(name))
                .or_default()
                .push(conn.clone());
            return Ok(HookHandle::Output {
                name: InlineString::from(name),
                conn,
            });
        }

        let is_pseudo = matches!(name, "act" | "out" | "xto");
        let is_known = is_pseudo || self.0.handlers.read().contains_key(name);
        if !is_known {
            return Err(DeviceError::UnknownComponent {
                device: self.0.name.clone(),
                name: InlineString::from(name),
            });
        }

        let when = if call_after && !is_pseudo { HookWhen::Post } else { HookWhen::Pre };
        let entry = HookEntry::new(call, context);
        let table = match when {
            HookWhen::Pre => &self.0.pre_hooks,
            HookWhen::Post => &self.0.post_hooks,
        };
        table.write().entry(InlineString::from(name)).or_default().push(entry.clone());

        Ok(HookHandle::Component {
            name: InlineString::from(name),
            when,
            entry,
        })
    }

    /// Remove every hook installed on `name`. For an output, this also
    /// disconnects each hook's `Signal` connection, not just the bookkeeping
    /// entry — matching `device.py`'s `unhook`, which walks `_output_hooks`
    /// and calls `output.disconnect(a_hook)` for each.
    pub fn unhook_by_name(&self, name: &str) -> DesimResult<()> {
        if let Some(signal) = self.0.outputs.read().get(name).cloned() {
            if let Some(conns) = self.0.output_hooks.write().remove(name) {
                for conn in conns {
                    let _ = signal.disconnect(&conn);
                }
            }
        }
        self.0.pre_hooks.write().remove(name);
        self.0.post_hooks.write().remove(name);
        Ok(())
    }

    pub fn unhook(&self, handle: &HookHandle) -> DesimResult<()> {
        match handle {
            HookHandle::Output { name, conn } => {
                if let Some(signal) = self.0.outputs.read().get(name.as_str()).cloned() {
                    signal.disconnect(conn).map_err(|_| DeviceError::UnknownComponent {
                        device: self.0.name.clone(),
                        name: name.clone(),
                    })?;
                }
                if let Some(conns) = self.0.output_hooks.write().get_mut(name.as_str()) {
                    conns.retain(|c| c != conn);
                }
            }
            HookHandle::Component { name, when, entry } => {
                let table = match when {
                    HookWhen::Pre => &self.0.pre_hooks,
                    HookWhen::Post => &self.0.post_hooks,
                };
                if let Some(list) = table.write().get_mut(name.as_str()) {
                    list.retain(|e| e != entry);
                }
            }
        }
        Ok(())
    }

    /// Install the built-in trace hook on `name`, or `"*"` for every
    /// known input, action, output, and `act`/`out`/`xto`. `after` selects
    /// whether the trace fires before or after the target runs.
    pub fn trace(&self, name: &str, after: bool) -> DesimResult<Vec<HookHandle>> {
        let targets = self.trace_targets(name);
        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            let device_name = self.0.name.clone();
            let component = InlineString::from(target.as_str());
            let call: EventCallback = Arc::new(move |time, value, _ctx| {
                let rendered = value.as_ref().map(|v| v.to_string()).unwrap_or_default();
                log::info!("@{time}: Dev<{device_name}>.{component} : {rendered}");
                None
            });
            handles.push(self.hook(&target, call, None, after)?);
        }
        Ok(handles)
    }

    pub fn untrace(&self, handles: &[HookHandle]) -> DesimResult<()> {
        for h in handles {
            self.unhook(h)?;
        }
        Ok(())
    }

    fn trace_targets(&self, name: &str) -> Vec<String> {
        if name != "*" {
            return vec![name.to_string()];
        }
        let mut targets: Vec<String> = self
            .0
            .handlers
            .read()
            .keys()
            .map(|k| k.as_str().to_string())
            .collect();
        targets.extend(self.0.outputs.read().keys().map(|k| k.as_str().to_string()));
        targets.extend(["act".to_string(), "out".to_string(), "xto".to_string()]);
        targets
    }
}

fn describe_args(has_value: bool, has_context: bool) -> &'static str {
    match (has_value, has_context) {
        (false, false) => "1 argument (time)",
        (true, false) => "2 arguments (time, value)",
        (_, true) => "3 arguments (time, value, context)",
    }
}
