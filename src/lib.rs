//! # Prometheus DES
//!
//! A deterministic, single-threaded discrete-event simulation kernel.
//!
//! Simulated activities are written as ordinary `async` blocks ("processes")
//! that suspend by awaiting [`Event`]s. The [`Environment`] owns the clock and
//! an event calendar ordered by `(time, priority, insertion order)`, and
//! resumes each process when the event it waits on is processed. Nothing runs
//! in parallel and nothing depends on wall-clock time, so a model fed the
//! same inputs always produces the same trace.
//!
//! ## Key Features
//!
//! - **Events and timeouts**: one-shot occurrences with a fixed outcome
//! - **Processes**: `async` bodies with interrupts delivered at suspension points
//! - **Conditions**: `all_of` / `any_of` (and `&` / `|`) over events
//! - **Resources**: FIFO, priority and preemptive pools with scoped acquisition
//! - **Configuration**: named resources built from JSON
//!
//! ## Example
//!
//! ```rust
//! use prometheus_des::core::{Environment, Until, Value};
//! use prometheus_des::resources::Resource;
//!
//! let env = Environment::new();
//! let desk = Resource::new(&env, 1).unwrap();
//!
//! for name in ["alice", "bob"] {
//!     let (env2, desk) = (env.clone(), desk.clone());
//!     env.process_named(name, async move {
//!         let req = desk.request()?.guard();
//!         req.wait().await?;
//!         env2.timeout(5.0)?.await?;
//!         Ok(Value::none())
//!     });
//! }
//!
//! env.run(Until::Forever).unwrap();
//! assert_eq!(env.now(), 10.0);
//! ```
//!
//! For more complete models, see:
//! - `tests/preemption_test.rs` - machine shop with breakdowns and repairs
//! - `benches/simulation_bench.rs` - kernel and model benchmarks

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Simulation kernel: clock, calendar, events, processes and conditions.
pub mod core;
/// Configuration models for the epoch and named resources.
pub mod config;
/// Builders to construct simulation objects from configuration.
pub mod builders;
/// Infrastructure adapters: admission queues.
pub mod infra;
/// Shared resources with FIFO, priority and preemptive admission.
pub mod resources;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    Condition, ConditionValue, Environment, Event, Failure, Interrupt, Outcome, Process,
    ProcessId, SimError, SimResult, Until, Value,
};
pub use crate::resources::{PreemptiveResource, Preempted, PriorityResource, Request, Resource};
