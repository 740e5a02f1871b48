//! A checker that decides whether a concurrent history is [linearizable] with respect to a
//! sequential specification.
//!
//! Histories and models are dynamically typed: states, inputs and outputs are [`Value`]s, and
//! a [`Model`] is a bundle of callbacks over them. The `lincheck_typed` crate layers static
//! types on top of this.
//!
//! A history is either a sequence of [`Operation`]s (calls packaged with their returns and
//! timestamped) or a sequence of [`Event`]s (calls and returns that are only relatively
//! ordered). If the model can partition a history, the partitions are checked on parallel
//! threads.
//!
//! # Example
//!
//! ```rust
//! use lincheck::{check_operations, Model, Operation, Value};
//!
//! // A register where `Some(v)` writes `v` and `None` reads.
//! let model = Model::new(
//!     || Value::new(0u32),
//!     |state, input, output| {
//!         let state = *state.downcast_ref::<u32>().unwrap();
//!         match *input.downcast_ref::<Option<u32>>().unwrap() {
//!             Some(v) => (true, Value::new(v)),
//!             None => (*output.downcast_ref::<u32>().unwrap() == state, Value::new(state)),
//!         }
//!     },
//! )
//! .equal(|a, b| a.downcast_ref::<u32>().unwrap() == b.downcast_ref::<u32>().unwrap());
//!
//! let op = |client_id, input: Option<u32>, call, output: u32, ret| Operation {
//!     client_id,
//!     input: Value::new(input),
//!     call,
//!     output: Value::new(output),
//!     ret,
//! };
//! assert!(check_operations(
//!     &model,
//!     &[op(0, Some(1), 0, 0, 10), op(1, None, 5, 1, 15)],
//! ));
//! assert!(!check_operations(
//!     &model,
//!     &[op(0, Some(1), 0, 0, 10), op(1, None, 11, 0, 15)],
//! ));
//! ```
//!
//! [linearizable]: https://en.wikipedia.org/wiki/Linearizability

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod checker;
mod model;
mod value;
mod visualize;

pub use checker::{
    check_events, check_events_timeout, check_events_verbose, check_operations,
    check_operations_timeout, check_operations_verbose, CheckResult, LinearizationInfo,
};

pub use model::{
    Capabilities, DescribeOperationFn, DescribeStateFn, EqualFn, Event, EventKind, InitFn, Model,
    Operation, PartitionEventFn, PartitionFn, StepFn,
};

pub use value::{DowncastError, Value};

pub use visualize::{visualize, visualize_path};
