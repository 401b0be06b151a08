//! Named, case-insensitive parameter values for automation.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::RangeInclusive;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Parameter Store
===============

Every effect owns one store. External automation (MIDI CC mapping, scripted
sweeps) talks to effects only through names:

  effect.set_parameter("RoomSize", 0.8)
  effect.parameter("roomsize")          // 0.8, names ignore case

Rules
-----

  unknown name      reads return 0.0, never an error
  empty name        writes are ignored
  registration      sets both the default and the current value
  range             registered ranges clamp every write
  NaN / infinity    writes are ignored so no coefficient ever goes non-finite

Names are stored lowercase. Lookups with an already-lowercase name don't
allocate, which is the common case for the typed setters.
*/

/// Lowercase form of a parameter name, borrowing when it already is.
pub fn canonical_name(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
struct Parameter {
    value: f32,
    default: f32,
    range: Option<(f32, f32)>,
}

impl Parameter {
    fn clamp(&self, value: f32) -> f32 {
        match self.range {
            Some((min, max)) => value.clamp(min, max),
            None => value,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    entries: HashMap<String, Parameter>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unbounded parameter.
    pub fn register(&mut self, name: &str, default: f32) {
        self.insert(name, default, None);
    }

    /// Register a parameter whose writes are clamped to `range`.
    ///
    /// Reversed bounds are swapped. A NaN bound registers the parameter
    /// unbounded.
    pub fn register_ranged(&mut self, name: &str, default: f32, range: RangeInclusive<f32>) {
        let (a, b) = range.into_inner();
        if a.is_nan() || b.is_nan() {
            log::warn!("parameter {name:?} has a NaN bound, registering it unbounded");
            self.insert(name, default, None);
            return;
        }
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        self.insert(name, default.clamp(min, max), Some((min, max)));
    }

    fn insert(&mut self, name: &str, default: f32, range: Option<(f32, f32)>) {
        if name.is_empty() || !default.is_finite() {
            return;
        }
        self.entries.insert(
            canonical_name(name).into_owned(),
            Parameter {
                value: default,
                default,
                range,
            },
        );
    }

    /// Current value, or 0.0 for names never registered or written.
    pub fn get(&self, name: &str) -> f32 {
        self.entries
            .get(&*canonical_name(name))
            .map(|p| p.value)
            .unwrap_or(0.0)
    }

    pub fn default_of(&self, name: &str) -> f32 {
        self.entries
            .get(&*canonical_name(name))
            .map(|p| p.default)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&*canonical_name(name))
    }

    /// Store `value` under `name`, clamped to the registered range.
    ///
    /// Returns the value actually stored, or `None` when the write was
    /// ignored (empty name, non-finite value). Writing an unknown name
    /// creates an unbounded entry.
    pub fn set(&mut self, name: &str, value: f32) -> Option<f32> {
        if name.is_empty() || !value.is_finite() {
            log::trace!("ignoring parameter write {name:?} = {value}");
            return None;
        }

        let key = canonical_name(name);
        match self.entries.get_mut(&*key) {
            Some(param) => {
                let clamped = param.clamp(value);
                if clamped != value {
                    log::trace!("clamped parameter {key} from {value} to {clamped}");
                }
                param.value = clamped;
                Some(clamped)
            }
            None => {
                log::trace!("writing unregistered parameter {key}");
                self.entries.insert(
                    key.into_owned(),
                    Parameter {
                        value,
                        default: 0.0,
                        range: None,
                    },
                );
                Some(value)
            }
        }
    }

    /// Restore every parameter to its registered default.
    pub fn reset_to_defaults(&mut self) {
        for param in self.entries.values_mut() {
            param.value = param.default;
        }
    }

    /// Iterate `(canonical name, current value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), p.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parameter write queued from a control thread.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParameterChange {
    pub name: &'static str,
    pub value: f32,
}

pub trait ParameterReceiver {
    fn pop(&mut self) -> Option<ParameterChange>;
}

#[cfg(feature = "rtrb")]
impl ParameterReceiver for Consumer<ParameterChange> {
    fn pop(&mut self) -> Option<ParameterChange> {
        Consumer::pop(self).ok()
    }
}

/// Single-writer queue carrying parameter writes to the audio thread.
///
/// The control side pushes with `Producer::push`; the audio side hands the
/// consumer to [`crate::Effect::apply_pending`] between reads.
#[cfg(feature = "rtrb")]
pub fn parameter_channel(
    capacity: usize,
) -> (Producer<ParameterChange>, Consumer<ParameterChange>) {
    RingBuffer::new(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_reads_zero() {
        let store = ParameterStore::new();
        assert_eq!(store.get("gain"), 0.0);
        assert_eq!(store.get(""), 0.0);
    }

    #[test]
    fn test_register_seeds_value_and_default() {
        let mut store = ParameterStore::new();
        store.register("Gain", 0.7);

        assert_eq!(store.get("gain"), 0.7);
        assert_eq!(store.default_of("GAIN"), 0.7);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut store = ParameterStore::new();
        store.register("gain", 0.5);

        store.set("GAIN", 0.9);
        assert_eq!(store.get("gain"), 0.9);
        assert_eq!(store.get("Gain"), 0.9);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_name_is_ignored() {
        let mut store = ParameterStore::new();
        assert_eq!(store.set("", 1.0), None);
        store.register("", 1.0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_ranged_writes_clamp() {
        let mut store = ParameterStore::new();
        store.register_ranged("feedback", 0.5, 0.0..=0.95);

        assert_eq!(store.set("feedback", 4.0), Some(0.95));
        assert_eq!(store.get("feedback"), 0.95);
        assert_eq!(store.set("feedback", -1.0), Some(0.0));
    }

    #[test]
    fn test_odd_ranges_do_not_panic() {
        let mut store = ParameterStore::new();
        store.register_ranged("reversed", 5.0, 1.0..=0.0);
        assert_eq!(store.get("reversed"), 1.0);
        assert_eq!(store.set("reversed", -3.0), Some(0.0));

        store.register_ranged("open", 2.0, f32::NAN..=1.0);
        assert_eq!(store.get("open"), 2.0);
        assert_eq!(store.set("open", 10.0), Some(10.0));

        store.register("broken", f32::NAN);
        assert!(!store.contains("broken"));
    }

    #[test]
    fn test_non_finite_writes_ignored() {
        let mut store = ParameterStore::new();
        store.register("cutoff", 1000.0);

        assert_eq!(store.set("cutoff", f32::NAN), None);
        assert_eq!(store.set("cutoff", f32::INFINITY), None);
        assert_eq!(store.get("cutoff"), 1000.0);
    }

    #[test]
    fn test_unknown_write_creates_entry() {
        let mut store = ParameterStore::new();
        store.set("Custom", 3.0);
        assert_eq!(store.get("custom"), 3.0);
        assert_eq!(store.default_of("custom"), 0.0);
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut store = ParameterStore::new();
        store.register("a", 1.0);
        store.register("b", 2.0);
        store.set("a", 5.0);
        store.set("b", 6.0);

        store.reset_to_defaults();
        assert_eq!(store.get("a"), 1.0);
        assert_eq!(store.get("b"), 2.0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_parameter_channel_delivers_in_order() {
        let (mut tx, mut rx) = parameter_channel(4);
        tx.push(ParameterChange {
            name: "mix",
            value: 0.2,
        })
        .unwrap();
        tx.push(ParameterChange {
            name: "mix",
            value: 0.4,
        })
        .unwrap();

        assert_eq!(ParameterReceiver::pop(&mut rx).map(|c| c.value), Some(0.2));
        assert_eq!(ParameterReceiver::pop(&mut rx).map(|c| c.value), Some(0.4));
        assert_eq!(ParameterReceiver::pop(&mut rx), None);
    }
}
