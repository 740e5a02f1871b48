//! The boundary between typed models and the checker's [`Value`]-based ones.
//!
//! Every value handed to a typed callback is downcast to its declared type first, and every
//! value a typed callback returns is wrapped again. A value of the wrong type can only come
//! from mixing models and histories, so it panics on the spot instead of being coerced.

use {
    crate::{
        history::{
            to_typed_events, to_typed_operations, to_untyped_events, to_untyped_operations, Event,
            Operation,
        },
        Model,
    },
    lincheck::{PartitionEventFn, PartitionFn, Value},
    std::{any::Any, fmt::Debug, sync::Arc},
};

/// A type whose values can cross into the checker as a [`Value`] and come back.
pub trait Erasable: Any + Clone + Debug + Send + Sync {}

impl<T> Erasable for T where T: Any + Clone + Debug + Send + Sync {}

/// Downcasts `value`, panicking with the `role` it plays (state, input, output) on failure.
pub(crate) fn rehydrate<'a, T: Any>(value: &'a Value, role: &str) -> &'a T {
    match value.downcast_ref::<T>() {
        Ok(typed) => typed,
        Err(err) => panic!("model contract violated: {role}: {err}"),
    }
}

pub(crate) fn erase_partition<I, O>(
    partition: impl Fn(&[Operation<I, O>]) -> Vec<Vec<Operation<I, O>>> + Send + Sync + 'static,
) -> PartitionFn
where
    I: Erasable,
    O: Erasable,
{
    Arc::new(move |history: &[lincheck::Operation]| {
        partition(&to_typed_operations(history))
            .iter()
            .map(|p| to_untyped_operations(p))
            .collect()
    })
}

pub(crate) fn erase_partition_event<I, O>(
    partition_event: impl Fn(&[Event<I, O>]) -> Vec<Vec<Event<I, O>>> + Send + Sync + 'static,
) -> PartitionEventFn
where
    I: Erasable + Default,
    O: Erasable + Default,
{
    Arc::new(move |history: &[lincheck::Event]| {
        partition_event(&to_typed_events(history))
            .iter()
            .map(|p| to_untyped_events(p))
            .collect()
    })
}

impl<S, I, O> Model<S, I, O>
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    /// Converts this model to the checker's dynamically typed representation. Optional parts
    /// are only carried over if present, so the checker applies its own defaults otherwise.
    ///
    /// # Panics
    ///
    /// The returned model panics when handed a state, input or output that is not an `S`, `I`
    /// or `O` respectively.
    pub fn to_model(&self) -> lincheck::Model {
        let init = Arc::clone(&self.init);
        let step = Arc::clone(&self.step);
        let equal = Arc::clone(&self.equal);
        let mut model = lincheck::Model::new(
            move || Value::new(init()),
            move |state, input, output| {
                let (ok, next) = step(
                    rehydrate::<S>(state, "state"),
                    rehydrate::<I>(input, "input"),
                    rehydrate::<O>(output, "output"),
                );
                (ok, Value::new(next))
            },
        )
        .equal(move |state1, state2| {
            equal(
                rehydrate::<S>(state1, "state"),
                rehydrate::<S>(state2, "state"),
            )
        });
        if let Some(partition) = &self.partition {
            let partition = Arc::clone(partition);
            model = model.partition(move |history| partition(history));
        }
        if let Some(partition_event) = &self.partition_event {
            let partition_event = Arc::clone(partition_event);
            model = model.partition_event(move |history| partition_event(history));
        }
        if let Some(describe_operation) = &self.describe_operation {
            let describe_operation = Arc::clone(describe_operation);
            model = model.describe_operation(move |input, output| {
                describe_operation(
                    rehydrate::<I>(input, "input"),
                    rehydrate::<O>(output, "output"),
                )
            });
        }
        if let Some(describe_state) = &self.describe_state {
            let describe_state = Arc::clone(describe_state);
            model = model.describe_state(move |state| describe_state(rehydrate::<S>(state, "state")));
        }
        model
    }
}
