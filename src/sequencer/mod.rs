/*!
 * Sequencer
 *
 * Drives simulated time forward by repeatedly sorting the pending event
 * list, popping the earliest event, and running it. The queue is a plain
 * `Vec`, re-sorted every iteration rather than kept in a binary heap: at
 * the scale this kernel targets, a stable sort is simpler to reason about
 * and preserves FIFO order for same-`(time, priority)` ties for free.
 */

use std::io::{BufRead, Write};

use serde::Serialize;

use crate::errors::SequencerError;
use crate::event::Event;
use crate::time::EventTime;

/// Why a [`Sequencer::run`] call stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    StepsExhausted,
    StopTimeReached,
    QueueEmpty,
}

/// A lightweight, serializable snapshot of sequencer state, useful for
/// debugging or golden-output tests.
#[derive(Debug, Serialize)]
pub struct SequencerSnapshot {
    pub time: f64,
    pub pending: usize,
}

/// The main loop driver: owns the pending event queue and the current
/// simulated time.
pub struct Sequencer {
    events: Vec<Event>,
    time: EventTime,
    pub verbose: bool,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Sequencer {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            time: EventTime::default(),
            verbose: false,
        }
    }

    pub fn time(&self) -> EventTime {
        self.time
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            time: self.time.time(),
            pending: self.events.len(),
        }
    }

    pub fn add(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn add_all(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Drain the queue in `(time, priority)` order until one of `steps`,
    /// `stop`, or queue-exhaustion halts the run.
    pub fn run(&mut self, steps: Option<u64>, stop: Option<EventTime>) -> Result<HaltReason, SequencerError> {
        let mut remaining = steps;

        loop {
            if self.events.is_empty() {
                return Ok(HaltReason::QueueEmpty);
            }

            self.events.sort_by(|a, b| a.time().cmp(&b.time()));
            let next_time = self.events[0].time();

            if next_time < self.time {
                return Err(SequencerError::BackwardsTime {
                    current: self.time,
                    next: next_time,
                });
            }
            self.time = next_time;

            if let Some(stop) = stop {
                if self.time >= stop {
                    return Ok(HaltReason::StopTimeReached);
                }
            }

            if let Some(r) = remaining {
                if r == 0 {
                    return Ok(HaltReason::StepsExhausted);
                }
                remaining = Some(r - 1);
            }

            let event = self.events.remove(0);
            if self.verbose {
                log::debug!("dispatching event @ {}", event.time());
            }
            if let Some(produced) = event.action() {
                self.events.extend(produced);
            }
        }
    }

    /// Run exactly `n` events (or until the queue empties first).
    pub fn step(&mut self, n: u64) -> Result<HaltReason, SequencerError> {
        self.run(Some(n), None)
    }

    /// Run until simulated time reaches `t`.
    pub fn until(&mut self, t: impl Into<EventTime>) -> Result<HaltReason, SequencerError> {
        self.run(None, Some(t.into()))
    }

    /// Run for `dt` simulated time units starting now.
    pub fn awhile(&mut self, dt: f64) -> Result<HaltReason, SequencerError> {
        let stop = self.time + dt;
        self.run(None, Some(stop))
    }

    /// Run to completion (until the queue empties).
    pub fn run_to_completion(&mut self) -> Result<HaltReason, SequencerError> {
        self.run(None, None)
    }

    /// Read commands from `input` and drive the sequencer until `q` or EOF,
    /// writing prompts/diagnostics to `output`.
    pub fn interact(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<(), SequencerError> {
        loop {
            write!(output, "desim> ").ok();
            output.flush().ok();

            let mut line = String::new();
            if input.read_line(&mut line).unwrap_or(0) == 0 {
                return Ok(());
            }
            let line = line.trim();

            if line == "q" {
                return Ok(());
            } else if line.is_empty() {
                self.run(Some(1), None)?;
            } else if line == "*" {
                self.run_to_completion()?;
            } else if let Ok(period) = line.parse::<f64>() {
                // A decimal point routes to the period/until branch; a bare
                // negative integer (e.g. "-5") has no named route ("n=steps"
                // only covers non-negative counts) and falls through to the
                // help text below, rather than being misread as `until`.
                if line.contains('.') {
                    if period < 0.0 {
                        self.until(-period)?;
                    } else {
                        self.awhile(period)?;
                    }
                } else if period >= 0.0 {
                    self.step(period as u64)?;
                } else {
                    print_help(&mut *output);
                }
            } else {
                print_help(&mut *output);
            }
        }
    }
}

fn print_help(output: &mut dyn Write) {
    writeln!(output, "commands: <enter>=step, N=step N, P.P=run for period, -T=run until T, *=run to completion, q=quit").ok();
}
