//! Request and release events.

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::future::IntoFuture;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use ordered_float::OrderedFloat;

use crate::core::{Event, EventFuture, Outcome, ProcessId, SimError, SimResult};
use crate::infra::queue::Keyed;
use crate::resources::resource::ResourceCore;
use crate::resources::ResourceId;

/// Ordering key of a request: `(priority, time, !preempt)`.
///
/// Smaller keys are more important. At equal priority the older request
/// wins, and at equal priority and time a preempting request wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    priority: i64,
    time: OrderedFloat<f64>,
    preempt: bool,
}

impl RequestKey {
    /// Build a key.
    #[must_use]
    pub const fn new(priority: i64, time: f64, preempt: bool) -> Self {
        Self {
            priority,
            time: OrderedFloat(time),
            preempt,
        }
    }

    /// Priority; smaller is more important.
    #[must_use]
    pub const fn priority(&self) -> i64 {
        self.priority
    }

    /// Creation time of the request.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.into_inner()
    }

    /// Whether the request may evict users.
    #[must_use]
    pub const fn preempt(&self) -> bool {
        self.preempt
    }
}

impl Ord for RequestKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.time.cmp(&other.time))
            .then_with(|| (!self.preempt).cmp(&!other.preempt))
    }
}

impl PartialOrd for RequestKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) struct RequestCore {
    event: Event,
    resource: Weak<ResourceCore>,
    resource_id: ResourceId,
    process: Option<ProcessId>,
    key: RequestKey,
    usage_since: Cell<Option<f64>>,
}

/// A request for one slot of a resource.
///
/// Succeeds once the slot is granted. Await it from a process, then hand it
/// back with [`Request::release`], or use [`Request::guard`] to release on
/// scope exit.
#[derive(Clone)]
pub struct Request(Rc<RequestCore>);

impl Request {
    pub(crate) fn new(
        event: Event,
        resource: Weak<ResourceCore>,
        resource_id: ResourceId,
        process: Option<ProcessId>,
        key: RequestKey,
    ) -> Self {
        Self(Rc::new(RequestCore {
            event,
            resource,
            resource_id,
            process,
            key,
            usage_since: Cell::new(None),
        }))
    }

    /// The underlying event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.0.event
    }

    /// The ordering key.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        self.0.key
    }

    /// Priority; smaller is more important.
    #[must_use]
    pub fn priority(&self) -> i64 {
        self.0.key.priority
    }

    /// Whether the request may evict users.
    #[must_use]
    pub fn preempt(&self) -> bool {
        self.0.key.preempt
    }

    /// Simulation time at which the request was made.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.0.key.time()
    }

    /// The process that made the request, if any.
    #[must_use]
    pub fn process(&self) -> Option<ProcessId> {
        self.0.process
    }

    /// The resource this request was made against.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.0.resource_id
    }

    /// When the slot was granted.
    #[must_use]
    pub fn usage_since(&self) -> Option<f64> {
        self.0.usage_since.get()
    }

    pub(crate) fn set_usage_since(&self, t: f64) {
        self.0.usage_since.set(Some(t));
    }

    fn resource(&self) -> SimResult<Rc<ResourceCore>> {
        self.0
            .resource
            .upgrade()
            .ok_or_else(|| SimError::NotFound(format!("resource {}", self.0.resource_id)))
    }

    /// Withdraw the request if it is still waiting.
    pub fn cancel(&self) -> SimResult<()> {
        if self.is_triggered() {
            return Ok(());
        }
        self.resource()?.cancel(self)
    }

    /// Give the slot back.
    pub fn release(&self) -> SimResult<Release> {
        self.resource()?.release(self)
    }

    /// Leave a scoped acquisition: withdraw the request if still waiting and
    /// release it unless `abandoned`.
    pub fn exit(&self, abandoned: bool) -> SimResult<()> {
        self.cancel()?;
        if !abandoned {
            self.release()?;
        }
        Ok(())
    }

    /// Wrap the request in a guard that exits on drop.
    #[must_use]
    pub fn guard(self) -> RequestGuard {
        RequestGuard {
            request: self,
            exited: false,
        }
    }
}

impl Keyed for Request {
    type Key = RequestKey;

    fn key(&self) -> RequestKey {
        self.0.key
    }
}

impl Deref for Request {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.0.event
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Request {}

impl IntoFuture for Request {
    type Output = Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.0.event.wait()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("event", &self.0.event.id())
            .field("resource", &self.0.resource_id)
            .field("process", &self.0.process)
            .field("key", &self.0.key)
            .field("usage_since", &self.0.usage_since.get())
            .finish()
    }
}

/// Scoped acquisition of a resource slot.
///
/// Dropping the guard withdraws the request if it is still waiting and
/// releases the slot. While the environment is tearing down the release is
/// skipped.
#[must_use = "dropping the guard releases the slot immediately"]
pub struct RequestGuard {
    request: Request,
    exited: bool,
}

impl RequestGuard {
    /// The guarded request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// A future resolving once the slot is granted.
    pub fn wait(&self) -> EventFuture {
        self.request.event().wait()
    }

    /// Release now and report errors instead of logging them.
    pub fn release(mut self) -> SimResult<()> {
        self.exited = true;
        self.request.exit(false)
    }
}

impl Deref for RequestGuard {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        let abandoned = self.request.env().ok().is_none_or(|env| env.is_tearing_down());
        if let Err(e) = self.request.exit(abandoned) {
            tracing::warn!(
                request = %self.request.id(),
                error = %e,
                abandoned,
                "failed to release request on drop"
            );
        }
    }
}

impl fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("request", &self.request)
            .field("exited", &self.exited)
            .finish()
    }
}

/// An event releasing a request's slot. Succeeds immediately.
#[derive(Clone)]
pub struct Release {
    event: Event,
    request: Request,
}

impl Release {
    pub(crate) const fn new(event: Event, request: Request) -> Self {
        Self { event, request }
    }

    /// The request being released.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The underlying event.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }
}

impl Deref for Release {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event
    }
}

impl IntoFuture for Release {
    type Output = Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.event.wait()
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("event", &self.event.id())
            .field("request", &self.request.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let urgent = RequestKey::new(0, 5.0, false);
        let older = RequestKey::new(1, 1.0, false);
        let newer = RequestKey::new(1, 2.0, false);
        let preempting = RequestKey::new(1, 2.0, true);
        assert!(urgent < older);
        assert!(older < newer);
        assert!(preempting < newer);
        let mut keys = vec![newer, urgent, preempting, older];
        keys.sort();
        assert_eq!(keys, vec![urgent, older, preempting, newer]);
    }
}
