/*!
 * desim-cli
 *
 * Small demo binary: builds a two-state device wired to a single output
 * signal, seeds one input event, and drives the sequencer interactively.
 */

use std::collections::HashMap;
use std::io::{stdin, stdout, BufReader};
use std::sync::Arc;

use desim::core::InlineString;
use desim::device::HandlerArity;
use desim::event::Event;
use desim::value::EventValue;
use desim::{Device, Sequencer};

struct TrialState {
    latest_value: Option<EventValue>,
    time_change_complete: Option<desim::EventTime>,
}

fn build_trial_device() -> Device {
    let dev = Device::new(
        "trial",
        vec![InlineString::from("idle"), InlineString::from("changing")],
        HashMap::from([(InlineString::from("t_delay"), 1.5)]),
    )
    .expect("timing keys are valid");
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
                // transition and bookkeeping below run on every call, so a
                // second input while already "changing" re-arms the delayed
                // `newdata` action instead of being a no-op.
                if handle.state().as_str() == "idle" {
                    handle
                        .out("out1", desim::value::sig_undefined())
                        .expect("out is valid inside an input handler");
                }
                handle
                    .xto(&["idle", "changing"], Some("changing"))
                    .expect("idle/changing -> changing is a declared state");
                let delay = handle.timing("t_delay").unwrap_or(1.5);
                let complete = time + delay;
                {
                    let mut s = state.write();
                    s.latest_value = value;
                    s.time_change_complete = Some(complete);
                }
                handle
                    .act("newdata", complete, None, None)
                    .expect("newdata is a registered action");
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
                handle
                    .xto(&["changing"], None)
                    .expect("changing is the state while newdata is pending");
                let (latest_value, complete) = {
                    let s = state.read();
                    (s.latest_value.clone(), s.time_change_complete)
                };
                if complete.is_some_and(|complete| time >= complete) {
                    handle.out("out1", latest_value).expect("out is valid inside an action handler");
                    handle
                        .xto(&["changing"], Some("idle"))
                        .expect("changing -> idle is a declared state");
                }
                None
            }),
        );
    }
    dev
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("desim starting");

    let dev = build_trial_device();
    let mut sequencer = Sequencer::default();

    let in1 = dev.input_handle("in1").expect("in1 is registered");
    sequencer.add(Event::new(1.0, in1, Some(EventValue::from(1i64)), None));

    log::info!("seeded in1(1.0, 1); entering interactive mode");

    let stdin = stdin();
    let mut input = BufReader::new(stdin.lock());
    let mut output = stdout();
    if let Err(err) = sequencer.interact(&mut input, &mut output) {
        log::error!("sequencer halted with a fatal error: {err}");
        std::process::exit(1);
    }

    log::info!("final state: {}", dev.state());
}
