use {
    crate::Value,
    std::{
        fmt::{self, Debug, Formatter},
        sync::Arc,
    },
};

/// An element of a history in which each function call is packaged with its return, along with
/// the timestamps of both.
///
/// The interval `[call, ret]` is closed, so an operation spanning `[10, 20]` is concurrent with
/// one spanning `[20, 30]`.
#[derive(Clone, Debug)]
pub struct Operation {
    /// Only used to lay out visualizations. Zero-indexed.
    pub client_id: usize,
    pub input: Value,
    pub call: i64,
    pub output: Value,
    pub ret: i64,
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub enum EventKind {
    Call,
    Return,
}

/// An element of a history in which calls and returns are only relatively ordered.
///
/// `value` holds the input of a [`EventKind::Call`] and the output of a
/// [`EventKind::Return`]. The `id` matches a call with its return.
#[derive(Clone, Debug)]
pub struct Event {
    /// Only used to lay out visualizations. Zero-indexed.
    pub client_id: usize,
    pub kind: EventKind,
    pub value: Value,
    pub id: usize,
}

pub type PartitionFn = Arc<dyn Fn(&[Operation]) -> Vec<Vec<Operation>> + Send + Sync>;
pub type PartitionEventFn = Arc<dyn Fn(&[Event]) -> Vec<Vec<Event>> + Send + Sync>;
pub type InitFn = Arc<dyn Fn() -> Value + Send + Sync>;
pub type StepFn = Arc<dyn Fn(&Value, &Value, &Value) -> (bool, Value) + Send + Sync>;
pub type EqualFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;
pub type DescribeOperationFn = Arc<dyn Fn(&Value, &Value) -> String + Send + Sync>;
pub type DescribeStateFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Which optional parts of a model were supplied. Anything missing falls back to the checker's
/// default behavior.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    pub partition: bool,
    pub partition_event: bool,
    pub equal: bool,
    pub describe_operation: bool,
    pub describe_state: bool,
}

/// A sequential specification of a system over dynamically typed [`Value`]s.
///
/// Only `init` and `step` are mandatory. `step` must be a pure function of its arguments, and
/// every callback may be invoked concurrently from several checker threads.
///
/// Defaults for the optional parts:
///
/// - partitioning: the whole history is a single partition;
/// - `equal`: [`Value::ptr_eq`], which is only sound if `step` hands back the state it was
///   given whenever the state does not change;
/// - `describe_operation`: `"{input:?} -> {output:?}"`;
/// - `describe_state`: `"{state:?}"`.
#[derive(Clone)]
pub struct Model {
    partition: Option<PartitionFn>,
    partition_event: Option<PartitionEventFn>,
    init: InitFn,
    step: StepFn,
    equal: Option<EqualFn>,
    describe_operation: Option<DescribeOperationFn>,
    describe_state: Option<DescribeStateFn>,
}

impl Model {
    pub fn new(
        init: impl Fn() -> Value + Send + Sync + 'static,
        step: impl Fn(&Value, &Value, &Value) -> (bool, Value) + Send + Sync + 'static,
    ) -> Self {
        Model {
            partition: None,
            partition_event: None,
            init: Arc::new(init),
            step: Arc::new(step),
            equal: None,
            describe_operation: None,
            describe_state: None,
        }
    }

    /// Partitions an operation history such that the history is linearizable if and only if
    /// every partition is.
    pub fn partition(
        mut self,
        partition: impl Fn(&[Operation]) -> Vec<Vec<Operation>> + Send + Sync + 'static,
    ) -> Self {
        self.partition = Some(Arc::new(partition));
        self
    }

    /// Like [`Model::partition`], but for event histories.
    pub fn partition_event(
        mut self,
        partition_event: impl Fn(&[Event]) -> Vec<Vec<Event>> + Send + Sync + 'static,
    ) -> Self {
        self.partition_event = Some(Arc::new(partition_event));
        self
    }

    pub fn equal(mut self, equal: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static) -> Self {
        self.equal = Some(Arc::new(equal));
        self
    }

    pub fn describe_operation(
        mut self,
        describe_operation: impl Fn(&Value, &Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_operation = Some(Arc::new(describe_operation));
        self
    }

    pub fn describe_state(
        mut self,
        describe_state: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.describe_state = Some(Arc::new(describe_state));
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            partition: self.partition.is_some(),
            partition_event: self.partition_event.is_some(),
            equal: self.equal.is_some(),
            describe_operation: self.describe_operation.is_some(),
            describe_state: self.describe_state.is_some(),
        }
    }

    pub fn init(&self) -> Value {
        (self.init)()
    }

    pub fn step(&self, state: &Value, input: &Value, output: &Value) -> (bool, Value) {
        (self.step)(state, input, output)
    }

    pub fn equal_states(&self, state1: &Value, state2: &Value) -> bool {
        match &self.equal {
            Some(equal) => equal(state1, state2),
            None => state1.ptr_eq(state2),
        }
    }

    pub fn describe_operation_of(&self, input: &Value, output: &Value) -> String {
        match &self.describe_operation {
            Some(describe) => describe(input, output),
            None => format!("{input:?} -> {output:?}"),
        }
    }

    pub fn describe_state_of(&self, state: &Value) -> String {
        match &self.describe_state {
            Some(describe) => describe(state),
            None => format!("{state:?}"),
        }
    }

    pub(crate) fn partition_operations(&self, history: &[Operation]) -> Vec<Vec<Operation>> {
        match &self.partition {
            Some(partition) => partition(history),
            None => vec![history.to_vec()],
        }
    }

    pub(crate) fn partition_events(&self, history: &[Event]) -> Vec<Vec<Event>> {
        match &self.partition_event {
            Some(partition_event) => partition_event(history),
            None => vec![history.to_vec()],
        }
    }
}

impl Debug for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}
