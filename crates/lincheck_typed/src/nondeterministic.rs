use {
    crate::{
        erase::{erase_partition, erase_partition_event, Erasable},
        history::{Event, Operation},
        model::{
            default_describe_operation, default_describe_state, shallow_equal,
            DescribeOperationFn, DescribeStateFn, EqualFn,
        },
        Model, StateSet,
    },
    lincheck::{Capabilities, PartitionEventFn, PartitionFn},
    std::{
        fmt::{self, Debug, Formatter},
        sync::Arc,
    },
    tracing::trace,
};

/// Yields every possible initial state.
pub type NondeterministicInitFn<S> = Arc<dyn Fn() -> Vec<S> + Send + Sync>;
pub type NondeterministicStepFn<S, I, O> = Arc<dyn Fn(&S, &I, &O) -> Vec<S> + Send + Sync>;

/// A sequential specification whose step may lead to several states.
///
/// Where a [`Model`] step yields one next state, a nondeterministic step yields every state
/// the system could be in afterwards, and an empty `Vec` if the system cannot produce `output`
/// for `input` from the given state. Likewise `init` yields every possible initial state.
///
/// [`NondeterministicModel::to_model`] turns this into a [`Model`] over [`StateSet`]s, which
/// is the form the checker needs. The construction is general but relies on `equal` to merge
/// states, and a hand-written [`Model`] may be considerably faster.
pub struct NondeterministicModel<S, I, O> {
    partition: Option<PartitionFn>,
    partition_event: Option<PartitionEventFn>,
    init: NondeterministicInitFn<S>,
    step: NondeterministicStepFn<S, I, O>,
    equal: EqualFn<S>,
    describe_operation: Option<DescribeOperationFn<I, O>>,
    describe_state: Option<DescribeStateFn<S>>,
}

impl<S, I, O> Clone for NondeterministicModel<S, I, O> {
    fn clone(&self) -> Self {
        NondeterministicModel {
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

impl<S, I, O> Debug for NondeterministicModel<S, I, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NondeterministicModel")
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}

impl<S, I, O> NondeterministicModel<S, I, O> {
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
}

impl<S, I, O> NondeterministicModel<S, I, O>
where
    S: Erasable,
    I: Erasable,
    O: Erasable,
{
    /// Creates a model whose states are compared with `==` ([`shallow_equal`]).
    pub fn new(
        init: impl Fn() -> Vec<S> + Send + Sync + 'static,
        step: impl Fn(&S, &I, &O) -> Vec<S> + Send + Sync + 'static,
    ) -> Self
    where
        S: PartialEq,
    {
        Self::new_with_equal(init, step, shallow_equal::<S>)
    }

    /// Creates a model whose states are compared with `equal`, which is also what merges
    /// duplicate states into a [`StateSet`].
    pub fn new_with_equal(
        init: impl Fn() -> Vec<S> + Send + Sync + 'static,
        step: impl Fn(&S, &I, &O) -> Vec<S> + Send + Sync + 'static,
        equal: impl Fn(&S, &S) -> bool + Send + Sync + 'static,
    ) -> Self {
        NondeterministicModel {
            partition: None,
            partition_event: None,
            init: Arc::new(init),
            step: Arc::new(step),
            equal: Arc::new(equal),
            describe_operation: None,
            describe_state: None,
        }
    }

    /// See [`Model::partition`].
    pub fn partition(
        mut self,
        partition: impl Fn(&[Operation<I, O>]) -> Vec<Vec<Operation<I, O>>> + Send + Sync + 'static,
    ) -> Self {
        self.partition = Some(erase_partition(partition));
        self
    }

    /// See [`Model::partition_event`].
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

    pub fn describe_operation(
        mut self,
        describe_operation: impl Fn(&I, &O) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_operation = Some(Arc::new(describe_operation));
        self
    }

    /// Describes a single state. A [`StateSet`] is rendered as the braced list of its states'
    /// descriptions.
    pub fn describe_state(
        mut self,
        describe_state: impl Fn(&S) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_state = Some(Arc::new(describe_state));
        self
    }

    /// Converts to a deterministic [`Model`] with the power set construction: a state of the
    /// result is the set of states the system could be in.
    ///
    /// - The initial state is the set of initial states, merged under `equal`.
    /// - A step applies the nondeterministic step to every state in the set and merges the
    ///   union of the results. It succeeds if the union is nonempty, i.e. if at least one state
    ///   in the set explains the operation.
    /// - Two sets are equal if they hold the same states under `equal`.
    ///
    /// Partition functions carry over unchanged, as they only look at the history.
    pub fn to_model(&self) -> Model<StateSet<S>, I, O> {
        let init = Arc::clone(&self.init);
        let init_equal = Arc::clone(&self.equal);
        let step = Arc::clone(&self.step);
        let step_equal = Arc::clone(&self.equal);
        let equal = Arc::clone(&self.equal);
        let describe_state: DescribeStateFn<S> = match &self.describe_state {
            Some(describe_state) => Arc::clone(describe_state),
            None => Arc::new(default_describe_state::<S>),
        };
        let describe_operation: DescribeOperationFn<I, O> = match &self.describe_operation {
            Some(describe_operation) => Arc::clone(describe_operation),
            None => Arc::new(default_describe_operation::<I, O>),
        };
        Model {
            partition: self.partition.clone(),
            partition_event: self.partition_event.clone(),
            init: Arc::new(move || StateSet::merge(init(), &*init_equal)),
            step: Arc::new(move |states: &StateSet<S>, input: &I, output: &O| {
                let next = StateSet::merge(
                    states.iter().flat_map(|state| step(state, input, output)),
                    &*step_equal,
                );
                trace!(from = states.len(), to = next.len(), "power set step");
                (!next.is_empty(), next)
            }),
            equal: Arc::new(move |states1: &StateSet<S>, states2: &StateSet<S>| {
                states1.same_states(states2, &*equal)
            }),
            describe_operation: Some(describe_operation),
            describe_state: Some(Arc::new(move |states: &StateSet<S>| {
                states.describe(|state| describe_state(state))
            })),
        }
    }

    /// Converts directly to the checker's representation. Equivalent to calling
    /// [`Model::to_model`] on the result of [`NondeterministicModel::to_model`].
    pub fn to_untyped_model(&self) -> lincheck::Model {
        self.to_model().to_model()
    }
}

#[cfg(test)]
mod test {
    use {super::*, lincheck::Value};

    /// A register replicated twice, where a write may not have reached the replica serving
    /// later reads.
    #[derive(Clone, Debug, PartialEq)]
    enum Input {
        Write(u8),
        Read,
    }

    fn lagging_register() -> NondeterministicModel<u8, Input, u8> {
        NondeterministicModel::new(
            || vec![0],
            |&state, input, &output| match input {
                Input::Write(v) if *v == state => vec![state],
                Input::Write(v) => vec![state, *v],
                Input::Read if output == state => vec![state],
                Input::Read => vec![],
            },
        )
    }

    fn set(states: &[u8]) -> StateSet<u8> {
        StateSet::merge(states.iter().copied(), |a: &u8, b: &u8| a == b)
    }

    #[test]
    fn initial_states_are_merged() {
        let model =
            NondeterministicModel::new(|| vec![1u8, 2, 1, 2, 3], |&s, _i: &(), _o: &()| vec![s])
                .to_model();
        assert_eq!(model.init().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn step_takes_union_of_every_branch() {
        let model = lagging_register().to_model();
        let init = model.init();
        assert_eq!(init.as_slice(), &[0]);

        let (ok, after_write) = model.step(&init, &Input::Write(1), &0);
        assert!(ok);
        assert!(model.equal_states(&after_write, &set(&[0, 1])));

        // Writing again from either branch cannot add states.
        let (ok, again) = model.step(&after_write, &Input::Write(1), &0);
        assert!(ok);
        assert!(model.equal_states(&again, &set(&[1, 0])));

        // Reading 0 is explained by the lagging branch alone.
        let (ok, after_read) = model.step(&after_write, &Input::Read, &0);
        assert!(ok);
        assert!(model.equal_states(&after_read, &set(&[0])));

        let (ok, after_read) = model.step(&after_write, &Input::Read, &1);
        assert!(ok);
        assert!(model.equal_states(&after_read, &set(&[1])));
    }

    #[test]
    fn empty_union_rejects_step() {
        let model = lagging_register().to_model();
        let (ok, next) = model.step(&set(&[0, 1]), &Input::Read, &2);
        assert!(!ok);
        assert!(next.is_empty());
    }

    #[test]
    fn describes_sets() {
        let model = lagging_register().to_model();
        assert_eq!(model.describe_state_of(&set(&[0, 1])), "{0, 1}");
        assert_eq!(model.describe_operation_of(&Input::Write(1), &0), "Write(1) -> 0");

        let model = lagging_register()
            .describe_state(|s| format!("r={s}"))
            .describe_operation(|i, o| format!("{i:?}/{o}"))
            .to_model();
        assert_eq!(model.describe_state_of(&set(&[1, 0])), "{r=1, r=0}");
        assert_eq!(model.describe_operation_of(&Input::Read, &1), "Read/1");
    }

    #[test]
    fn carries_partitions_over() {
        let model = lagging_register().partition(|history| vec![history.to_vec()]);
        assert!(model.capabilities().partition);
        assert!(model.to_model().capabilities().partition);
        assert!(model.to_untyped_model().capabilities().partition);
        assert!(!model.to_untyped_model().capabilities().partition_event);
    }

    #[test]
    fn untyped_model_steps_over_sets() {
        let model = lagging_register().to_untyped_model();
        let init = model.init();
        let (ok, next) = model.step(&init, &Value::new(Input::Write(1)), &Value::new(0u8));
        assert!(ok);
        assert_eq!(next.downcast_ref::<StateSet<u8>>().unwrap().len(), 2);
        assert!(model.equal_states(&next, &Value::new(set(&[1, 0]))));
        assert_eq!(model.describe_state_of(&init), "{0}");
    }
}
