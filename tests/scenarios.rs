//! Literal end-to-end scenarios exercising signals, devices, and the
//! sequencer together.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use desim::core::InlineString;
use desim::device::HandlerArity;
use desim::errors::SequencerError;
use desim::event::Event;
use desim::value::{sig_undefined, EventValue};
use desim::{Device, Sequencer, Signal};
use pretty_assertions::assert_eq;

/// Device-level state shared by `in1` and `newdata`: the last seen input
/// value and the completion time it's pending against. Mirrors the
/// `self._latest_value`/`self._time_change_complete` attributes `ex_device.py`
/// keeps on the device itself rather than threading through a closure.
struct TrialState {
    latest_value: Option<EventValue>,
    time_change_complete: Option<desim::EventTime>,
}

fn trial_device() -> Device {
    let dev = Device::new(
        "trial",
        vec![InlineString::from("idle"), InlineString::from("changing")],
        HashMap::from([(InlineString::from("t_delay"), 1.5)]),
    )
    .unwrap();
    dev.add_output("out1", None);

    let state = Arc::new(parking_lot::RwLock::new(TrialState {
        latest_value: None,
        time_change_complete: None,
    }));

    {
        let handle = dev.clone();
        let state = state.clone();
        dev.register_input(
            "in1",
            HandlerArity::TimeValue,
            Arc::new(move |time, value, _ctx| {
                // Only the signal update is gated on "idle"; the state
                // transition and the pending-change bookkeeping below run on
                // every call, so a second input while already "changing"
                // still re-arms the delayed `newdata` action.
                if handle.state().as_str() == "idle" {
                    handle.out("out1", sig_undefined()).unwrap();
                }
                handle.xto(&["idle", "changing"], Some("changing")).unwrap();
                let delay = handle.timing("t_delay").unwrap();
                let complete = time + delay;
                {
                    let mut s = state.write();
                    s.latest_value = value;
                    s.time_change_complete = Some(complete);
                }
                handle.act("newdata", complete, None, None).unwrap();
                None
            }),
        );
    }
    {
        let handle = dev.clone();
        let state = state.clone();
        dev.register_action(
            "newdata",
            HandlerArity::TimeOnly,
            Arc::new(move |time, _value, _ctx| {
                handle.xto(&["changing"], None).unwrap();
                let (latest_value, complete) = {
                    let s = state.read();
                    (s.latest_value.clone(), s.time_change_complete)
                };
                if complete.is_some_and(|complete| time >= complete) {
                    handle.out("out1", latest_value).unwrap();
                    handle.xto(&["changing"], Some("idle")).unwrap();
                }
                None
            }),
        );
    }
    dev
}

#[test]
fn s1_direct_update_with_two_connections() {
    let sig = Signal::new("s1", None);
    let log_a = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log_b = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let la = log_a.clone();
    sig.connect(Arc::new(move |t, v, _c| { la.lock().push((t, v.unwrap())); None }), None, -1);
    let lb = log_b.clone();
    sig.connect(Arc::new(move |t, v, _c| { lb.lock().push((t, v.unwrap())); None }), None, -1);

    sig.update(1.0, EventValue::from(7i64));
    sig.update(2.5, EventValue::from("x"));

    for log in [&log_a, &log_b] {
        let entries = log.lock();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, EventValue::from(7i64));
        assert_eq!(entries[1].1, EventValue::from("x"));
    }
    assert_eq!(sig.value(), EventValue::from("x"));
    assert_eq!(sig.previous_value(), EventValue::from(7i64));
}

#[test]
fn s2_priority_tie_break() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let oa = order.clone();
    let ob = order.clone();

    let mut seq = Sequencer::default();
    seq.add(Event::new(
        desim::EventTime::new(1.0, 0),
        Arc::new(move |_t, _v, _c| { oa.lock().push('a'); None }),
        None,
        None,
    ));
    seq.add(Event::new(
        desim::EventTime::new(1.0, 5),
        Arc::new(move |_t, _v, _c| { ob.lock().push('b'); None }),
        None,
        None,
    ));

    seq.run_to_completion().unwrap();
    assert_eq!(order.lock().clone(), vec!['b', 'a']);
}

#[test]
fn s3_minimal_device_round_trip() {
    let dev = trial_device();
    let mut seq = Sequencer::default();

    let in1 = dev.input_handle("in1").unwrap();
    seq.add(Event::new(1.0, in1, Some(EventValue::from(1i64)), None));
    seq.run_to_completion().unwrap();

    let out1 = dev.output("out1").unwrap();
    assert_eq!(out1.value(), EventValue::from(1i64));
    assert_eq!(out1.previous_value(), sig_undefined());
    assert_eq!(dev.state().as_str(), "idle");
}

#[test]
fn s4_two_overlapping_inputs() {
    let dev = trial_device();
    let mut seq = Sequencer::default();

    let in1_a = dev.input_handle("in1").unwrap();
    let in1_b = dev.input_handle("in1").unwrap();
    seq.add(Event::new(1.0, in1_a, Some(EventValue::from(1i64)), None));
    seq.add(Event::new(1.3, in1_b, Some(EventValue::from(2i64)), None));
    seq.run_to_completion().unwrap();

    assert_eq!(dev.output("out1").unwrap().value(), EventValue::from(2i64));
}

#[test]
fn s5_backwards_time_is_fatal() {
    let counter = Arc::new(AtomicI64::new(0));
    let mut seq = Sequencer::default();
    let c = counter.clone();
    seq.add(Event::new(5.0, Arc::new(move |_t, _v, _c| { c.fetch_add(1, Ordering::SeqCst); None }), None, None));
    seq.run_to_completion().unwrap();

    let c2 = counter.clone();
    seq.add(Event::new(3.0, Arc::new(move |_t, _v, _c| { c2.fetch_add(1, Ordering::SeqCst); None }), None, None));
    let result = seq.run_to_completion();
    assert!(matches!(result, Err(SequencerError::BackwardsTime { .. })));
    assert_eq!(counter.load(Ordering::SeqCst), 1, "the stale event must never dispatch");
}
