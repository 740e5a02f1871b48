//! Statically typed models and histories for the [`lincheck`] linearizability checker.
//!
//! The checker works with dynamically typed [`Value`]s. This crate lets you write a [`Model`]
//! over your own state, input and output types, record histories of typed [`Operation`]s or
//! [`Event`]s, and hands both to the checker through a single conversion layer. Models whose
//! step can lead to several states are written as a [`NondeterministicModel`] and converted
//! to a deterministic model over [`StateSet`]s.
//!
//! # Example
//!
//! ```rust
//! use lincheck_typed::{check_operations, Model, Operation};
//!
//! #[derive(Clone, Debug)]
//! enum Input {
//!     Read,
//!     Write(u32),
//! }
//!
//! let register = Model::new(
//!     || 0u32,
//!     |&state: &u32, input: &Input, &output: &u32| match input {
//!         Input::Read => (output == state, state),
//!         Input::Write(v) => (true, *v),
//!     },
//! );
//!
//! let history = [
//!     Operation { client_id: 0, input: Input::Write(1), call: 0, output: 0, ret: 10 },
//!     Operation { client_id: 1, input: Input::Read, call: 5, output: 1, ret: 15 },
//! ];
//! assert!(check_operations(&register, &history));
//!
//! let history = [
//!     Operation { client_id: 0, input: Input::Write(1), call: 0, output: 0, ret: 10 },
//!     Operation { client_id: 1, input: Input::Read, call: 11, output: 0, ret: 15 },
//! ];
//! assert!(!check_operations(&register, &history));
//! ```
//!
//! # Features
//!
//! - `serde`: Implement `Serialize` and `Deserialize` for [`Operation`] and [`Event`].

#![cfg_attr(all(doc, CHANNEL_NIGHTLY), feature(doc_auto_cfg))]
#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod check;
mod erase;
mod history;
mod model;
mod nondeterministic;
mod state_set;
mod visualize;

pub use check::{
    check_events, check_events_timeout, check_events_verbose, check_operations,
    check_operations_timeout, check_operations_verbose,
};

pub use erase::Erasable;

pub use history::{
    to_typed_events, to_typed_operations, to_untyped_events, to_untyped_operations, Event,
    EventKind, Operation,
};

pub use model::{
    default_describe_operation, default_describe_state, shallow_equal, DescribeOperationFn,
    DescribeStateFn, EqualFn, InitFn, Model, StepFn,
};

pub use nondeterministic::{NondeterministicInitFn, NondeterministicModel, NondeterministicStepFn};

pub use state_set::StateSet;

pub use visualize::{visualize, visualize_path};

pub use lincheck::{Capabilities, CheckResult, LinearizationInfo, Value};
