/*!
 * Error Taxonomy
 *
 * One `thiserror` enum per subsystem, aggregated into [`DesimError`].
 */

use crate::core::InlineString;
use thiserror::Error;

/// Errors raised by [`crate::signal::Signal`] operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    #[error("signal {signal}: connection handle not found")]
    UnknownConnection { signal: InlineString },
}

/// Errors raised by [`crate::device::Device`] operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device {device}: {component} called outside an input/action handler")]
    NotInHandler {
        device: InlineString,
        component: InlineString,
    },

    #[error("device {device}: unknown component {name}")]
    UnknownComponent {
        device: InlineString,
        name: InlineString,
    },

    #[error(
        "device {device}: {caller} cannot transition from state {current} (expected one of {expected})"
    )]
    StateGuard {
        device: InlineString,
        caller: InlineString,
        current: InlineString,
        expected: String,
    },

    #[error("device {device}: unknown target state {state}")]
    UnknownState {
        device: InlineString,
        state: InlineString,
    },

    #[error(
        "device {device}: act({action}) takes {expected} but was called with {got}"
    )]
    ArityMismatch {
        device: InlineString,
        action: InlineString,
        expected: &'static str,
        got: &'static str,
    },

    #[error("device {device}: timing key {key} must start with \"t_\"")]
    InvalidTiming { device: InlineString, key: String },

    #[error("device {device}: {context} is already executing (re-entrant dispatch is not supported)")]
    AlreadyDispatching {
        device: InlineString,
        context: InlineString,
    },
}

/// Errors raised while draining the [`crate::sequencer::Sequencer`] queue.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequencerError {
    #[error("event at {next} is earlier than current sequencer time {current}")]
    BackwardsTime {
        current: crate::time::EventTime,
        next: crate::time::EventTime,
    },
}

/// Aggregate error type for the whole crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DesimError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

pub type DesimResult<T> = Result<T, DesimError>;
