//! Resource pools with FIFO, priority and preemptive admission.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::QueueDiscipline;
use crate::core::environment::Kernel;
use crate::core::event::Callback;
use crate::core::{Environment, Event, Priority, SimError, SimResult, Value};
use crate::infra::queue::{AdmissionQueue, FifoQueue, SortedQueue};
use crate::resources::base::Admission;
use crate::resources::request::{Release, Request, RequestKey};
use crate::resources::{Preempted, ResourceId};

/// Shared state of a resource pool.
pub(crate) struct ResourceCore {
    id: ResourceId,
    env: Weak<RefCell<Kernel>>,
    capacity: usize,
    discipline: QueueDiscipline,
    max_queue_depth: Option<usize>,
    users: RefCell<Vec<Request>>,
    put_queue: RefCell<Box<dyn AdmissionQueue<Request>>>,
    get_queue: RefCell<FifoQueue<Release>>,
}

impl ResourceCore {
    pub(crate) fn new(
        env: &Environment,
        capacity: usize,
        discipline: QueueDiscipline,
        max_queue_depth: Option<usize>,
    ) -> SimResult<Rc<Self>> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity(capacity));
        }
        if max_queue_depth == Some(0) {
            return Err(SimError::InvalidConfig(
                "max_queue_depth must be greater than 0".into(),
            ));
        }
        // Depth is enforced in `request`, after admission.
        let put_queue: Box<dyn AdmissionQueue<Request>> = match discipline {
            QueueDiscipline::Fifo => Box::new(FifoQueue::new()),
            QueueDiscipline::Priority | QueueDiscipline::Preemptive => Box::new(SortedQueue::new()),
        };
        let id = ResourceId::new(env.next_resource_id());
        tracing::debug!(resource = %id, capacity, ?discipline, ?max_queue_depth, "resource created");
        Ok(Rc::new(Self {
            id,
            env: env.downgrade(),
            capacity,
            discipline,
            max_queue_depth,
            users: RefCell::new(Vec::new()),
            put_queue: RefCell::new(put_queue),
            get_queue: RefCell::new(FifoQueue::new()),
        }))
    }

    fn env(&self) -> SimResult<Environment> {
        Environment::upgrade(&self.env).ok_or(SimError::EnvironmentDropped)
    }

    /// Create a request, queue it and re-run admission.
    ///
    /// A request that has to wait while `max_queue_depth` others already do
    /// is withdrawn again and refused with [`SimError::QueueFull`].
    pub(crate) fn request(self: &Rc<Self>, priority: i64, preempt: bool) -> SimResult<Request> {
        let env = self.env()?;
        let key = RequestKey::new(priority, env.now(), preempt);
        let request = Request::new(
            Event::new(&env, "request"),
            Rc::downgrade(self),
            self.id,
            env.active_process(),
            key,
        );
        self.put_queue.borrow_mut().enqueue(request.clone())?;
        self.trigger_put()?;
        if let Some(depth) = self.max_queue_depth {
            let waiting = self.put_queue.borrow().len();
            if !request.is_triggered() && waiting > depth {
                self.put_queue.borrow_mut().remove(&request)?;
                tracing::debug!(resource = %self.id, request = %request.id(), depth, "request refused");
                return Err(SimError::QueueFull(format!(
                    "resource {} has {depth} waiting requests",
                    self.id
                )));
            }
        }
        let weak = Rc::downgrade(self);
        request.add_callback(Callback::Hook(Box::new(move |_, _| {
            if let Some(core) = weak.upgrade() {
                if let Err(e) = core.trigger_get() {
                    tracing::warn!(resource = %core.id, error = %e, "get admission failed");
                }
            }
        })));
        Ok(request)
    }

    /// Create a release for `request` and re-run admission.
    pub(crate) fn release(self: &Rc<Self>, request: &Request) -> SimResult<Release> {
        let env = self.env()?;
        let release = Release::new(Event::new(&env, "release"), request.clone());
        self.get_queue.borrow_mut().enqueue(release.clone())?;
        let weak = Rc::downgrade(self);
        release.add_callback(Callback::Hook(Box::new(move |_, _| {
            if let Some(core) = weak.upgrade() {
                if let Err(e) = core.trigger_put() {
                    tracing::warn!(resource = %core.id, error = %e, "put admission failed");
                }
            }
        })));
        self.trigger_get()?;
        Ok(release)
    }

    /// Drop a waiting request from the put-queue. Absent requests are ignored.
    pub(crate) fn cancel(&self, request: &Request) -> SimResult<()> {
        match self.put_queue.borrow_mut().remove(request) {
            Ok(_) => {
                tracing::debug!(resource = %self.id, request = %request.id(), "request withdrawn");
                Ok(())
            }
            Err(SimError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Evict the least important user if `request` outranks it.
    fn preempt_for(&self, env: &Environment, request: &Request) {
        let victim = {
            let users = self.users.borrow();
            if users.len() < self.capacity || !request.preempt() {
                return;
            }
            match users.iter().max_by_key(|u| u.key()) {
                Some(victim) if victim.key() > request.key() => victim.clone(),
                _ => return,
            }
        };
        self.users.borrow_mut().retain(|u| u != &victim);

        let cause = Preempted {
            by: request.process(),
            usage_since: victim.usage_since().unwrap_or_else(|| env.now()),
            resource: self.id,
        };
        tracing::info!(
            resource = %self.id,
            victim = %victim.id(),
            by = ?cause.by,
            usage_since = cause.usage_since,
            "user preempted"
        );
        if let Some(pid) = victim.process() {
            if let Err(e) = env.interrupt_process(pid, Value::new(cause)) {
                tracing::warn!(resource = %self.id, process = %pid, error = %e, "failed to interrupt preempted user");
            }
        }
    }

    pub(crate) const fn id(&self) -> ResourceId {
        self.id
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn count(&self) -> usize {
        self.users.borrow().len()
    }

    pub(crate) fn users(&self) -> Vec<Request> {
        self.users.borrow().clone()
    }

    pub(crate) fn queue(&self) -> Vec<Request> {
        self.put_queue.borrow().to_vec()
    }

    pub(crate) const fn max_queue_depth(&self) -> Option<usize> {
        self.max_queue_depth
    }
}

impl Admission for ResourceCore {
    type Put = Request;
    type Get = Release;

    fn next_put(&self) -> Option<Request> {
        self.put_queue.borrow().peek().cloned()
    }

    fn remove_put(&self, put: &Request) -> SimResult<()> {
        self.put_queue.borrow_mut().remove(put).map(|_| ())
    }

    fn next_get(&self) -> Option<Release> {
        self.get_queue.borrow().peek().cloned()
    }

    fn remove_get(&self, get: &Release) -> SimResult<()> {
        self.get_queue.borrow_mut().remove(get).map(|_| ())
    }

    fn do_put(&self, put: &Request) -> SimResult<bool> {
        let env = self.env()?;
        if self.discipline == QueueDiscipline::Preemptive {
            self.preempt_for(&env, put);
        }
        {
            let mut users = self.users.borrow_mut();
            if users.len() >= self.capacity {
                tracing::debug!(resource = %self.id, request = %put.id(), "request queued");
                return Ok(false);
            }
            users.push(put.clone());
        }
        let now = env.now();
        put.set_usage_since(now);
        env.schedule(put, Ok(Value::none()), 0.0, Priority::Normal)?;
        tracing::debug!(resource = %self.id, request = %put.id(), time = now, "request granted");
        Ok(true)
    }

    fn do_get(&self, get: &Release) -> SimResult<bool> {
        let env = self.env()?;
        self.users.borrow_mut().retain(|u| u != get.request());
        env.schedule(get, Ok(Value::none()), 0.0, Priority::Normal)?;
        Ok(true)
    }
}

/// A pool of `capacity` slots granted in request order.
#[derive(Clone)]
pub struct Resource {
    core: Rc<ResourceCore>,
}

impl Resource {
    /// Create a resource. Fails with [`SimError::InvalidCapacity`] if
    /// `capacity` is 0.
    pub fn new(env: &Environment, capacity: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Fifo, None)?,
        })
    }

    /// Create a resource whose wait queue holds at most `depth` requests.
    /// A `depth` of 0 is rejected with [`SimError::InvalidConfig`].
    pub fn with_max_queue_depth(env: &Environment, capacity: usize, depth: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Fifo, Some(depth))?,
        })
    }

    /// Request a slot.
    pub fn request(&self) -> SimResult<Request> {
        self.core.request(0, false)
    }

    /// Give a granted (or waiting) request back.
    pub fn release(&self, request: &Request) -> SimResult<Release> {
        self.core.release(request)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Number of slots in use.
    #[must_use]
    pub fn count(&self) -> usize {
        self.core.count()
    }

    /// Requests currently holding a slot, in grant order.
    #[must_use]
    pub fn users(&self) -> Vec<Request> {
        self.core.users()
    }

    /// Requests waiting for a slot, in service order.
    #[must_use]
    pub fn queue(&self) -> Vec<Request> {
        self.core.queue()
    }

    /// Bound on the number of waiting requests.
    #[must_use]
    pub fn max_queue_depth(&self) -> Option<usize> {
        self.core.max_queue_depth()
    }

    /// The resource identifier.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.core.id()
    }
}

/// A pool whose waiting requests are served by [`RequestKey`].
#[derive(Clone)]
pub struct PriorityResource {
    core: Rc<ResourceCore>,
}

impl PriorityResource {
    /// Create a priority resource.
    pub fn new(env: &Environment, capacity: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Priority, None)?,
        })
    }

    /// Create a priority resource with a bounded wait queue.
    pub fn with_max_queue_depth(env: &Environment, capacity: usize, depth: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Priority, Some(depth))?,
        })
    }

    /// Request a slot at priority 0.
    pub fn request(&self) -> SimResult<Request> {
        self.core.request(0, true)
    }

    /// Request a slot with an explicit priority and preempt flag.
    pub fn request_with(&self, priority: i64, preempt: bool) -> SimResult<Request> {
        self.core.request(priority, preempt)
    }

    /// Give a granted (or waiting) request back.
    pub fn release(&self, request: &Request) -> SimResult<Release> {
        self.core.release(request)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Number of slots in use.
    #[must_use]
    pub fn count(&self) -> usize {
        self.core.count()
    }

    /// Requests currently holding a slot, in grant order.
    #[must_use]
    pub fn users(&self) -> Vec<Request> {
        self.core.users()
    }

    /// Requests waiting for a slot, in service order.
    #[must_use]
    pub fn queue(&self) -> Vec<Request> {
        self.core.queue()
    }

    /// Bound on the number of waiting requests.
    #[must_use]
    pub fn max_queue_depth(&self) -> Option<usize> {
        self.core.max_queue_depth()
    }

    /// The resource identifier.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.core.id()
    }
}

/// A priority pool where preempting requests evict less important users.
///
/// Evicted users are interrupted with a [`Preempted`] cause.
#[derive(Clone)]
pub struct PreemptiveResource {
    core: Rc<ResourceCore>,
}

impl PreemptiveResource {
    /// Create a preemptive resource.
    pub fn new(env: &Environment, capacity: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Preemptive, None)?,
        })
    }

    /// Create a preemptive resource with a bounded wait queue.
    pub fn with_max_queue_depth(env: &Environment, capacity: usize, depth: usize) -> SimResult<Self> {
        Ok(Self {
            core: ResourceCore::new(env, capacity, QueueDiscipline::Preemptive, Some(depth))?,
        })
    }

    /// Request a slot at priority 0, preempting if possible.
    pub fn request(&self) -> SimResult<Request> {
        self.core.request(0, true)
    }

    /// Request a slot with an explicit priority and preempt flag.
    pub fn request_with(&self, priority: i64, preempt: bool) -> SimResult<Request> {
        self.core.request(priority, preempt)
    }

    /// Give a granted (or waiting) request back.
    pub fn release(&self, request: &Request) -> SimResult<Release> {
        self.core.release(request)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Number of slots in use.
    #[must_use]
    pub fn count(&self) -> usize {
        self.core.count()
    }

    /// Requests currently holding a slot, in grant order.
    #[must_use]
    pub fn users(&self) -> Vec<Request> {
        self.core.users()
    }

    /// Requests waiting for a slot, in service order.
    #[must_use]
    pub fn queue(&self) -> Vec<Request> {
        self.core.queue()
    }

    /// Bound on the number of waiting requests.
    #[must_use]
    pub fn max_queue_depth(&self) -> Option<usize> {
        self.core.max_queue_depth()
    }

    /// The resource identifier.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.core.id()
    }
}

impl fmt::Debug for ResourceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("discipline", &self.discipline)
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .field("queued", &self.put_queue.borrow().len())
            .finish()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}

impl fmt::Debug for PriorityResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}

impl fmt::Debug for PreemptiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}
