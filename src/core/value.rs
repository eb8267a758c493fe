//! Event payloads and failure causes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, cheaply cloneable payload of a successful event.
///
/// Most events carry nothing; timeouts, processes and conditions carry
/// whatever their producer put in. Read it back with [`Value::get`].
#[derive(Clone, Default)]
pub struct Value(Option<Arc<dyn Any + Send + Sync>>);

impl Value {
    /// The empty value.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Wrap a payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Returns `true` if this value carries no payload.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the payload as `T`, if it is one.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => write!(f, "Value(None)"),
            Some(_) => write!(f, "Value(..)"),
        }
    }
}

/// An exceptional condition injected into a process.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    cause: Value,
}

impl Interrupt {
    /// Create an interrupt with the given cause.
    #[must_use]
    pub const fn new(cause: Value) -> Self {
        Self { cause }
    }

    /// The raw cause.
    #[must_use]
    pub const fn cause(&self) -> &Value {
        &self.cause
    }

    /// The cause as a concrete type, e.g. [`crate::resources::Preempted`].
    #[must_use]
    pub fn cause_as<T: Any>(&self) -> Option<&T> {
        self.cause.get::<T>()
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interrupt({:?})", self.cause)
    }
}

/// Why an event failed.
///
/// Any `std::error::Error + Send + Sync` converts into a `Failure`, so process
/// bodies can use `?` on ordinary errors. `Failure` deliberately does not
/// implement `std::error::Error` itself.
#[derive(Clone, Debug)]
pub enum Failure {
    /// The process was interrupted and did not catch it.
    Interrupt(Interrupt),
    /// Any other error raised by model code.
    Error(Arc<anyhow::Error>),
}

impl Failure {
    /// Build a failure from a plain message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Error(Arc::new(anyhow::Error::msg(message)))
    }

    /// Wrap an `anyhow` error.
    #[must_use]
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        Self::Error(Arc::new(err))
    }

    /// Returns the interrupt if this failure is one.
    #[must_use]
    pub const fn as_interrupt(&self) -> Option<&Interrupt> {
        match self {
            Self::Interrupt(i) => Some(i),
            Self::Error(_) => None,
        }
    }

    /// Returns `true` if this failure is an interrupt.
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt(_))
    }

    /// Try to view the underlying error as `E`.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Error(e) => e.downcast_ref::<E>(),
            Self::Interrupt(_) => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt(i) => write!(f, "{i}"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

impl<E> From<E> for Failure
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Error(Arc::new(anyhow::Error::new(err)))
    }
}

impl From<Interrupt> for Failure {
    fn from(interrupt: Interrupt) -> Self {
        Self::Interrupt(interrupt)
    }
}

/// The fixed result of a triggered event.
pub type Outcome = Result<Value, Failure>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SimError;

    #[test]
    fn test_value_downcast() {
        let v = Value::new(42_u32);
        assert_eq!(v.get::<u32>(), Some(&42));
        assert!(v.get::<i64>().is_none());
        assert!(Value::none().is_none());
    }

    #[test]
    fn test_failure_from_sim_error() {
        let f: Failure = SimError::EmptyCalendar.into();
        assert!(!f.is_interrupt());
        assert!(matches!(f.downcast_ref::<SimError>(), Some(SimError::EmptyCalendar)));
    }

    #[test]
    fn test_interrupt_cause() {
        let f: Failure = Interrupt::new(Value::new("stop")).into();
        let cause = f.as_interrupt().and_then(|i| i.cause_as::<&str>());
        assert_eq!(cause, Some(&"stop"));
    }
}
