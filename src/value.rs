/*!
 * Event Payloads
 *
 * [`EventValue`] is a small tagged union carrying the int/float/string
 * payloads signals and events pass around. Equality coerces across numeric
 * and string representations the way the dynamically-typed system this
 * kernel is modeled after does; ordering is deliberately unimplemented (see
 * the `static_assertions` check at the bottom of this file).
 */

use std::fmt;

/// A uniformly-typed value carried by [`crate::event::Event`]s and
/// [`crate::signal::Signal`]s.
///
/// `EventValue` has no `PartialOrd`/`Ord` impl on purpose: comparing two
/// simulation payloads for order is not a meaningful operation in this
/// system, so the comparison operators simply fail to compile rather than
/// picking an arbitrary cross-type ordering.
#[derive(Debug, Clone)]
pub enum EventValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl EventValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EventValue::Int(v) => Some(*v),
            EventValue::Float(v) => Some(*v as i64),
            EventValue::Str(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EventValue::Int(v) => Some(*v as f64),
            EventValue::Float(v) => Some(*v),
            EventValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            EventValue::Int(v) => Some(*v as f64),
            EventValue::Float(v) => Some(*v),
            EventValue::Str(_) => None,
        }
    }
}

impl From<i64> for EventValue {
    fn from(v: i64) -> Self {
        EventValue::Int(v)
    }
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Float(v)
    }
}

impl From<String> for EventValue {
    fn from(v: String) -> Self {
        EventValue::Str(v)
    }
}

impl From<&str> for EventValue {
    fn from(v: &str) -> Self {
        EventValue::Str(v.to_string())
    }
}

impl PartialEq for EventValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EventValue::Str(a), EventValue::Str(b)) => a == b,
            (EventValue::Str(_), _) | (_, EventValue::Str(_)) => false,
            _ => self.numeric() == other.numeric(),
        }
    }
}

impl PartialEq<i64> for EventValue {
    fn eq(&self, other: &i64) -> bool {
        *self == EventValue::from(*other)
    }
}

impl PartialEq<f64> for EventValue {
    fn eq(&self, other: &f64) -> bool {
        *self == EventValue::from(*other)
    }
}

impl PartialEq<str> for EventValue {
    fn eq(&self, other: &str) -> bool {
        matches!(self, EventValue::Str(s) if s == other)
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Int(v) => write!(f, "{v}"),
            EventValue::Float(v) => write!(f, "{v}"),
            EventValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// The value used when a signal or output has never meaningfully carried
/// data.
pub fn sig_undefined() -> EventValue {
    EventValue::Str("<undefined-value>".to_string())
}

/// Numeric zero, also used as the default `update()` value.
pub fn sig_zero() -> EventValue {
    EventValue::Int(0)
}

/// Default starting value for a freshly-added output.
pub fn sig_start_default() -> EventValue {
    sig_zero()
}

static_assertions::assert_not_impl_any!(EventValue: PartialOrd);
