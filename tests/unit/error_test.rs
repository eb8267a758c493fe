//! Tests for error types

use prometheus_des::core::{EventId, Failure, Interrupt, SimError, Value};

#[test]
fn test_queue_full_error() {
    let err = SimError::QueueFull("repairman".to_string());
    assert_eq!(format!("{}", err), "queue full: repairman");
}

#[test]
fn test_invalid_capacity_error() {
    let err = SimError::InvalidCapacity(0);
    assert_eq!(format!("{}", err), "invalid capacity: 0 (must be > 0)");
}

#[test]
fn test_already_triggered_error() {
    let err = SimError::AlreadyTriggered(EventId::new(7));
    assert_eq!(format!("{}", err), "event E#7 has already been triggered");
}

#[test]
fn test_empty_calendar_error() {
    assert_eq!(format!("{}", SimError::EmptyCalendar), "no scheduled events left");
}

#[test]
fn test_unhandled_error_carries_failure() {
    let err = SimError::Unhandled {
        event: EventId::new(3),
        failure: Failure::msg("machine on fire"),
    };
    let msg = err.to_string();
    assert!(msg.contains("E#3"));
    assert!(msg.contains("machine on fire"));
}

#[test]
fn test_sim_error_converts_into_failure() {
    let failure: Failure = SimError::NegativeTime(-2.0).into();
    assert!(!failure.is_interrupt());
    assert!(matches!(
        failure.downcast_ref::<SimError>(),
        Some(SimError::NegativeTime(t)) if *t == -2.0
    ));
}

#[test]
fn test_interrupt_failure() {
    let failure: Failure = Interrupt::new(Value::new("breakdown")).into();
    assert!(failure.is_interrupt());
    assert!(failure.downcast_ref::<SimError>().is_none());
    assert_eq!(
        failure.as_interrupt().and_then(|i| i.cause_as::<&str>()),
        Some(&"breakdown")
    );
}

#[test]
fn test_anyhow_failure() {
    let failure = Failure::from_anyhow(anyhow::anyhow!("bad input {}", 42));
    assert_eq!(failure.to_string(), "bad input 42");
}
