//! Error types for kernel operations.

use thiserror::Error;

use crate::core::event::EventId;
use crate::core::value::Failure;

/// Errors produced by the simulation kernel.
///
/// Configuration errors (bad capacity, negative delay) are returned at the
/// call that caused them. Failures raised inside a process travel as that
/// process's [`Failure`] outcome instead and only surface here as
/// [`SimError::Unhandled`] when nothing observed them.
#[derive(Debug, Error)]
pub enum SimError {
    /// Resource capacity must be strictly positive.
    #[error("invalid capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),
    /// A delay was negative (or NaN).
    #[error("negative delay: {0}")]
    NegativeTime(f64),
    /// The event was already triggered; its outcome is fixed.
    #[error("event {0} has already been triggered")]
    AlreadyTriggered(EventId),
    /// The event has not been triggered yet, so it has no outcome to copy.
    #[error("event {0} has not been triggered")]
    NotTriggered(EventId),
    /// The event was already processed; callbacks can no longer be added.
    #[error("event {0} has already been processed")]
    AlreadyProcessed(EventId),
    /// `step()` was called with nothing left on the calendar.
    #[error("no scheduled events left")]
    EmptyCalendar,
    /// A bounded queue refused an item.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// The target process has already terminated.
    #[error("process {0} has terminated and cannot be interrupted")]
    InvalidInterrupt(String),
    /// The item is not present in the queue.
    #[error("not found: {0}")]
    NotFound(String),
    /// `run` was asked to stop at a time in the past.
    #[error("until ({until}) must not be before the current time ({now})")]
    InvalidUntil {
        /// Requested stop time.
        until: f64,
        /// Clock at the time of the call.
        now: f64,
    },
    /// The calendar ran dry before the `until` event was processed.
    #[error("no scheduled events left but until event {0} was not processed")]
    UntilNotReached(EventId),
    /// A failed event was processed without anyone handling the failure.
    #[error("unhandled failure of event {event}: {failure}")]
    Unhandled {
        /// The failed event.
        event: EventId,
        /// Its failure cause.
        failure: Failure,
    },
    /// An event was awaited outside of any running process.
    #[error("events can only be awaited from inside a process")]
    NoActiveProcess,
    /// An event from a different environment was mixed in.
    #[error("event {0} belongs to a different environment")]
    ForeignEvent(EventId),
    /// The environment owning an event has been dropped.
    #[error("the owning environment has been dropped")]
    EnvironmentDropped,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for kernel results.
pub type SimResult<T> = Result<T, SimError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_negative_time() {
        let e = SimError::NegativeTime(-1.5);
        assert_eq!(e.to_string(), "negative delay: -1.5");
    }

    #[test]
    fn test_error_display_invalid_until() {
        let e = SimError::InvalidUntil { until: 3.0, now: 10.0 };
        let s = e.to_string();
        assert!(s.contains('3'));
        assert!(s.contains("10"));
    }

    #[test]
    fn test_error_is_std_error_and_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SimError>();
        let e: Box<dyn std::error::Error> = Box::new(SimError::EmptyCalendar);
        assert!(!e.to_string().is_empty());
    }
}
