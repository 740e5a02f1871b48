//! Typed histories and their conversion to and from the checker's dynamically typed records.
//!
//! Conversions copy every field, preserve order, and allocate fresh sequences. Rehydrating a
//! value that does not hold the declared type panics: it means the history was assembled for a
//! different model.

use {
    crate::erase::{rehydrate, Erasable},
    lincheck::Value,
};

pub use lincheck::EventKind;

/// An element of a history in which each function call is packaged with its return, along with
/// the timestamps of both.
///
/// The interval `[call, ret]` is closed, so an operation spanning `[10, 20]` is concurrent with
/// one spanning `[20, 30]`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operation<I, O> {
    /// Optional unless you want a visualization. Zero-indexed.
    pub client_id: usize,
    pub input: I,
    /// Invocation timestamp.
    pub call: i64,
    pub output: O,
    /// Response timestamp.
    pub ret: i64,
}

/// A function call event or a function return event.
///
/// Events carry no timestamps; only their relative order matters. `id` matches a call with its
/// return. A call only carries an `input` and a return only carries an `output`; the other field
/// holds its default value and is ignored.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Event<I, O> {
    /// Optional unless you want a visualization. Zero-indexed.
    pub client_id: usize,
    pub kind: EventKind,
    pub input: I,
    pub output: O,
    pub id: usize,
}

impl<I, O: Default> Event<I, O> {
    /// A call event carrying `input`. The output slot holds `O::default()`.
    pub fn call(client_id: usize, id: usize, input: I) -> Self {
        Event {
            client_id,
            kind: EventKind::Call,
            input,
            output: O::default(),
            id,
        }
    }
}

impl<I: Default, O> Event<I, O> {
    /// A return event carrying `output`. The input slot holds `I::default()`.
    pub fn ret(client_id: usize, id: usize, output: O) -> Self {
        Event {
            client_id,
            kind: EventKind::Return,
            input: I::default(),
            output,
            id,
        }
    }
}

/// Erases the inputs and outputs of an operation history, keeping client ids and timestamps.
pub fn to_untyped_operations<I, O>(history: &[Operation<I, O>]) -> Vec<lincheck::Operation>
where
    I: Erasable,
    O: Erasable,
{
    history
        .iter()
        .map(|op| lincheck::Operation {
            client_id: op.client_id,
            input: Value::new(op.input.clone()),
            call: op.call,
            output: Value::new(op.output.clone()),
            ret: op.ret,
        })
        .collect()
}

/// # Panics
///
/// If an input or output does not hold an `I` or an `O` respectively.
pub fn to_typed_operations<I, O>(history: &[lincheck::Operation]) -> Vec<Operation<I, O>>
where
    I: Clone + 'static,
    O: Clone + 'static,
{
    history
        .iter()
        .map(|op| Operation {
            client_id: op.client_id,
            input: rehydrate::<I>(&op.input, "input").clone(),
            call: op.call,
            output: rehydrate::<O>(&op.output, "output").clone(),
            ret: op.ret,
        })
        .collect()
}

/// Erases the input of each call and the output of each return into the event's value slot.
pub fn to_untyped_events<I, O>(history: &[Event<I, O>]) -> Vec<lincheck::Event>
where
    I: Erasable,
    O: Erasable,
{
    history
        .iter()
        .map(|ev| lincheck::Event {
            client_id: ev.client_id,
            kind: ev.kind,
            value: match ev.kind {
                EventKind::Call => Value::new(ev.input.clone()),
                EventKind::Return => Value::new(ev.output.clone()),
            },
            id: ev.id,
        })
        .collect()
}

/// Restores calls' inputs and returns' outputs from the value slot. The field that the kind
/// does not carry is left at its default.
///
/// # Panics
///
/// If a call's value is not an `I` or a return's value is not an `O`.
pub fn to_typed_events<I, O>(history: &[lincheck::Event]) -> Vec<Event<I, O>>
where
    I: Clone + Default + 'static,
    O: Clone + Default + 'static,
{
    history
        .iter()
        .map(|ev| {
            let (input, output) = match ev.kind {
                EventKind::Call => (rehydrate::<I>(&ev.value, "input").clone(), O::default()),
                EventKind::Return => (I::default(), rehydrate::<O>(&ev.value, "output").clone()),
            };
            Event {
                client_id: ev.client_id,
                kind: ev.kind,
                input,
                output,
                id: ev.id,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    enum Input {
        #[default]
        Read,
        Write(u8),
    }

    #[test]
    fn operations_round_trip() {
        let history = vec![
            Operation {
                client_id: 0,
                input: Input::Write(3),
                call: -5,
                output: None,
                ret: 7,
            },
            Operation {
                client_id: 4,
                input: Input::Read,
                call: 7,
                output: Some(3u8),
                ret: i64::MAX,
            },
        ];
        let untyped = to_untyped_operations(&history);
        assert_eq!(untyped.len(), 2);
        assert_eq!(untyped[1].client_id, 4);
        assert_eq!(untyped[1].ret, i64::MAX);
        assert_eq!(untyped[0].input.downcast_ref::<Input>(), Ok(&Input::Write(3)));
        assert_eq!(to_typed_operations::<Input, Option<u8>>(&untyped), history);
    }

    #[test]
    fn events_round_trip() {
        let history: Vec<Event<Input, Option<u8>>> = vec![
            Event::call(0, 0, Input::Write(1)),
            Event::call(1, 1, Input::Read),
            Event::ret(1, 1, Some(1)),
            Event::ret(0, 0, None),
        ];
        assert_eq!(history[0].output, None);
        assert_eq!(history[2].input, Input::Read);

        let untyped = to_untyped_events(&history);
        assert_eq!(untyped[0].value.downcast_ref::<Input>(), Ok(&Input::Write(1)));
        assert_eq!(untyped[2].value.downcast_ref::<Option<u8>>(), Ok(&Some(1)));
        assert_eq!(untyped[3].kind, EventKind::Return);
        assert_eq!(to_typed_events::<Input, Option<u8>>(&untyped), history);
    }

    #[test]
    fn events_only_erase_the_field_implied_by_kind() {
        // The unused field holds a non-default value, which must not survive the trip.
        let history = vec![
            Event {
                client_id: 2,
                kind: EventKind::Call,
                input: Input::Write(9),
                output: Some(1u8),
                id: 5,
            },
            Event {
                client_id: 2,
                kind: EventKind::Return,
                input: Input::Write(9),
                output: Some(2u8),
                id: 5,
            },
        ];
        let untyped = to_untyped_events(&history);
        assert!(untyped[0].value.is::<Input>());
        assert!(untyped[1].value.is::<Option<u8>>());

        let typed = to_typed_events::<Input, Option<u8>>(&untyped);
        assert_eq!(typed[0], Event::call(2, 5, Input::Write(9)));
        assert_eq!(typed[1], Event::ret(2, 5, Some(2)));
    }

    #[test]
    #[should_panic(expected = "output")]
    fn rehydrating_the_wrong_type_panics() {
        let untyped = to_untyped_operations(&[Operation {
            client_id: 0,
            input: Input::Read,
            call: 0,
            output: 1u32,
            ret: 1,
        }]);
        to_typed_operations::<Input, u64>(&untyped);
    }
}
