//! Shared resources: capacity-bounded pools processes queue for.
//!
//! * [`Resource`]: FIFO admission.
//! * [`PriorityResource`]: waiting requests are served by [`RequestKey`].
//! * [`PreemptiveResource`]: a more important request may evict a user,
//!   which is interrupted with a [`Preempted`] cause.
//!
//! All three are built on the [`Admission`] scaffold, which other
//! put/get style resources can implement too.

pub mod base;
pub mod request;
pub mod resource;

use std::fmt;

use serde::Serialize;

use crate::core::ProcessId;

pub use base::Admission;
pub use request::{Release, Request, RequestGuard, RequestKey};
pub use resource::{PreemptiveResource, PriorityResource, Resource};

/// Identifier of a resource, unique within one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R#{}", self.0)
    }
}

/// Interrupt cause delivered to a user evicted from a
/// [`PreemptiveResource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preempted {
    /// The process whose request caused the eviction.
    pub by: Option<ProcessId>,
    /// When the evicted user had been granted the slot.
    pub usage_since: f64,
    /// The resource the user was evicted from.
    pub resource: ResourceId,
}
