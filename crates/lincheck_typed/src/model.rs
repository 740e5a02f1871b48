use {
    crate::{
        erase::{erase_partition, erase_partition_event, Erasable},
        history::{Event, Operation},
    },
    lincheck::{Capabilities, PartitionEventFn, PartitionFn},
    std::{
        fmt::{self, Debug, Formatter},
        sync::Arc,
    },
};

pub type InitFn<S> = Arc<dyn Fn() -> S + Send + Sync>;
pub type StepFn<S, I, O> = Arc<dyn Fn(&S, &I, &O) -> (bool, S) + Send + Sync>;
pub type EqualFn<S> = Arc<dyn Fn(&S, &S) -> bool + Send + Sync>;
pub type DescribeOperationFn<I, O> = Arc<dyn Fn(&I, &O) -> String + Send + Sync>;
pub type DescribeStateFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// A sequential specification of a system with states `S`, inputs `I` and outputs `O`.
///
/// Models are expected to be purely functional: `step` must not depend on anything but its
/// arguments, and it returns a new state rather than changing the given one. The checker may
/// call into a model from several threads at once.
///
/// Only `init` and `step` (and `equal` if `S` has no suitable [`PartialEq`]) are needed to test
/// histories for linearizability. The remaining parts are optional:
///
/// - A partition function can greatly improve performance. A history is linearizable if and
///   only if each partition is, and `init`/`step` may then describe a single partition (e.g.
///   a single key of a key-value store).
/// - `describe_operation` and `describe_state` produce nicer visualizations. The defaults
///   render with [`Debug`].
pub struct Model<S, I, O> {
    pub(crate) partition: Option<PartitionFn>,
    pub(crate) partition_event: Option<PartitionEventFn>,
    pub(crate) init: InitFn<S>,
    pub(crate) step: StepFn<S, I, O>,
    pub(crate) equal: EqualFn<S>,
    pub(crate) describe_operation: Option<DescribeOperationFn<I, O>>,
    pub(crate) describe_state: Option<DescribeStateFn<S>>,
}

impl<S, I, O> Clone for Model<S, I, O> {
    fn clone(&self) -> Self {
        Model {
            partition: self.partition.clone(),
            partition_event: self.partition_event.clone(),
            init: Arc::clone(&self.init),
            step: Arc::clone(&self.step),
            equal: Arc::clone(&self.equal),
            describe_operation: self.describe_operation.clone(),
            describe_state: self.describe_state.clone(),
        }
    }
}

impl<S, I, O> Debug for Model<S, I, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}

impl<S, I, O> Model<S, I, O> {
    /// Which optional parts were supplied. `equal` is always present.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            partition: self.partition.is_some(),
            partition_event: self.partition_event.is_some(),
            equal: true,
            describe_operation: self.describe_operation.is_some(),
            describe_state: self.describe_state.is_some(),
        }
    }

    /// Produces the initial state.
    pub fn init(&self) -> S {
        (self.init)()
    }

    /// Applies an operation to `state`. Returns whether `output` is a legal response to `input`
    /// in that state, along with the next state.
    pub fn step(&self, state: &S, input: &I, output: &O) -> (bool, S) {
        (self.step)(state, input, output)
    }

    /// Compares states with the model's equality.
    pub fn equal_states(&self, state1: &S, state2: &S) -> bool {
        (self.equal)(state1, state2)
    }
}

impl<S, I, O> Model<S, I, O>
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    /// Creates a model whose states are compared with `==` ([`shallow_equal`]).
    ///
    /// Only use this if `==` is the intended equivalence on states. Otherwise use
    /// [`Model::new_with_equal`].
    pub fn new(
        init: impl Fn() -> S + Send + Sync + 'static,
        step: impl Fn(&S, &I, &O) -> (bool, S) + Send + Sync + 'static,
    ) -> Self
    where
        S: PartialEq,
    {
        Self::new_with_equal(init, step, shallow_equal::<S>)
    }

    /// Creates a model whose states are compared with `equal`, which must be an equivalence
    /// relation.
    pub fn new_with_equal(
        init: impl Fn() -> S + Send + Sync + 'static,
        step: impl Fn(&S, &I, &O) -> (bool, S) + Send + Sync + 'static,
        equal: impl Fn(&S, &S) -> bool + Send + Sync + 'static,
    ) -> Self {
        Model {
            partition: None,
            partition_event: None,
            init: Arc::new(init),
            step: Arc::new(step),
            equal: Arc::new(equal),
            describe_operation: None,
            describe_state: None,
        }
    }

    /// Partitions an operation history such that the history is linearizable if and only if
    /// every partition is.
    pub fn partition(
        mut self,
        partition: impl Fn(&[Operation<I, O>]) -> Vec<Vec<Operation<I, O>>> + Send + Sync + 'static,
    ) -> Self {
        self.partition = Some(erase_partition(partition));
        self
    }

    /// Like [`Model::partition`], but for event histories.
    pub fn partition_event(
        mut self,
        partition_event: impl Fn(&[Event<I, O>]) -> Vec<Vec<Event<I, O>>> + Send + Sync + 'static,
    ) -> Self
    where
        I: Default,
        O: Default,
    {
        self.partition_event = Some(erase_partition_event(partition_event));
        self
    }

    /// Replaces the equality on states.
    pub fn equal(mut self, equal: impl Fn(&S, &S) -> bool + Send + Sync + 'static) -> Self {
        self.equal = Arc::new(equal);
        self
    }

    /// Describes an operation for visualizations, e.g. `get("x") -> "y"`.
    pub fn describe_operation(
        mut self,
        describe_operation: impl Fn(&I, &O) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_operation = Some(Arc::new(describe_operation));
        self
    }

    /// Describes a state for visualizations, e.g. `{"x" -> "y", "z" -> "w"}`.
    pub fn describe_state(
        mut self,
        describe_state: impl Fn(&S) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_state = Some(Arc::new(describe_state));
        self
    }

    /// Describes an operation with the supplied describer, falling back to
    /// [`default_describe_operation`].
    pub fn describe_operation_of(&self, input: &I, output: &O) -> String {
        match &self.describe_operation {
            Some(describe) => describe(input, output),
            None => default_describe_operation(input, output),
        }
    }

    /// Describes a state with the supplied describer, falling back to [`default_describe_state`].
    pub fn describe_state_of(&self, state: &S) -> String {
        match &self.describe_state {
            Some(describe) => describe(state),
            None => default_describe_state(state),
        }
    }
}

/// The fallback equality on states: `==`.
pub fn shallow_equal<S: PartialEq>(state1: &S, state2: &S) -> bool {
    state1 == state2
}

/// Renders an operation as `{input:?} -> {output:?}`.
pub fn default_describe_operation<I: Debug, O: Debug>(input: &I, output: &O) -> String {
    format!("{input:?} -> {output:?}")
}

/// Renders a state with its `Debug` implementation.
pub fn default_describe_state<S: Debug>(state: &S) -> String {
    format!("{state:?}")
}
