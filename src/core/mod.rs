//! Simulation kernel: clock, calendar, events, processes and conditions.

pub mod calendar;
pub mod condition;
pub mod environment;
pub mod error;
pub mod event;
pub mod process;
pub mod trace;
pub mod value;

pub use calendar::Priority;
pub use condition::{Condition, ConditionValue, Evaluator};
pub use environment::{Environment, Until};
pub use error::{AppResult, SimError, SimResult};
pub use event::{Event, EventFuture, EventId, EventState};
pub use process::{Process, ProcessId};
pub use trace::{InMemoryTraceSink, StepRecord, TraceSink};
pub use value::{Failure, Interrupt, Outcome, Value};
