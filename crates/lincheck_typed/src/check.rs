use {
    crate::{
        erase::Erasable,
        history::{to_untyped_events, to_untyped_operations, Event, Operation},
        Model,
    },
    lincheck::{CheckResult, LinearizationInfo},
    std::time::Duration,
};

/// Checks whether an operation history is linearizable with respect to `model`.
pub fn check_operations<S, I, O>(model: &Model<S, I, O>, history: &[Operation<I, O>]) -> bool
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_operations(&model.to_model(), &to_untyped_operations(history))
}

/// Checks whether an operation history is linearizable, giving up with [`CheckResult::Unknown`]
/// after `timeout`. A zero timeout never expires.
pub fn check_operations_timeout<S, I, O>(
    model: &Model<S, I, O>,
    history: &[Operation<I, O>],
    timeout: Duration,
) -> CheckResult
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_operations_timeout(&model.to_model(), &to_untyped_operations(history), timeout)
}

/// Like [`check_operations_timeout`], but also returns the information needed to
/// [visualize](crate::visualize) the history.
pub fn check_operations_verbose<S, I, O>(
    model: &Model<S, I, O>,
    history: &[Operation<I, O>],
    timeout: Duration,
) -> (CheckResult, LinearizationInfo)
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_operations_verbose(&model.to_model(), &to_untyped_operations(history), timeout)
}

/// Checks whether an event history is linearizable with respect to `model`.
pub fn check_events<S, I, O>(model: &Model<S, I, O>, history: &[Event<I, O>]) -> bool
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_events(&model.to_model(), &to_untyped_events(history))
}

/// Checks whether an event history is linearizable, giving up with [`CheckResult::Unknown`]
/// after `timeout`. A zero timeout never expires.
pub fn check_events_timeout<S, I, O>(
    model: &Model<S, I, O>,
    history: &[Event<I, O>],
    timeout: Duration,
) -> CheckResult
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_events_timeout(&model.to_model(), &to_untyped_events(history), timeout)
}

/// Like [`check_events_timeout`], but also returns the information needed to
/// [visualize](crate::visualize) the history.
pub fn check_events_verbose<S, I, O>(
    model: &Model<S, I, O>,
    history: &[Event<I, O>],
    timeout: Duration,
) -> (CheckResult, LinearizationInfo)
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    lincheck::check_events_verbose(&model.to_model(), &to_untyped_events(history), timeout)
}
