//! Events: one-shot occurrences with a fixed outcome.
//!
//! Every wait in the kernel is modeled as an [`Event`]. An event starts
//! *pending*, becomes *triggered* once its outcome is fixed and it is placed
//! on the calendar, and becomes *processed* when the environment pops it and
//! runs its callbacks. Transitions never go backwards and callbacks run
//! exactly once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use crate::core::calendar::Priority;
use crate::core::environment::{Environment, Kernel};
use crate::core::error::{SimError, SimResult};
use crate::core::process::ProcessId;
use crate::core::value::{Failure, Outcome, Value};

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly increasing event identifier, unique within one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── State ─────────────────────────────────────────────────────────────

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventState {
    /// Not yet triggered; no outcome.
    Pending,
    /// Outcome fixed and sitting on the calendar.
    Triggered,
    /// Popped from the calendar; callbacks have run.
    Processed,
}

/// Something to run when an event is processed.
pub(crate) enum Callback {
    /// Resume a suspended process.
    Resume(ProcessId),
    /// Arbitrary housekeeping (queue drains, condition checks, ...).
    Hook(Box<dyn FnOnce(&Environment, &Event)>),
}

struct EventCore {
    id: EventId,
    kind: &'static str,
    env: Weak<RefCell<Kernel>>,
    state: Cell<EventState>,
    outcome: RefCell<Option<Outcome>>,
    callbacks: RefCell<Vec<Callback>>,
    defused: Cell<bool>,
}

// ── Event ─────────────────────────────────────────────────────────────

/// Handle to a simulation event. Cloning is cheap and shares the event.
#[derive(Clone)]
pub struct Event(Rc<EventCore>);

impl Event {
    pub(crate) fn new(env: &Environment, kind: &'static str) -> Self {
        Self(Rc::new(EventCore {
            id: env.next_event_id(),
            kind,
            env: env.downgrade(),
            state: Cell::new(EventState::Pending),
            outcome: RefCell::new(None),
            callbacks: RefCell::new(Vec::new()),
            defused: Cell::new(false),
        }))
    }

    /// The event's identifier.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.0.id
    }

    /// Short label of what produced this event (`"timeout"`, `"request"`, ...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.0.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EventState {
        self.0.state.get()
    }

    /// `true` once the outcome is fixed.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.state() != EventState::Pending
    }

    /// `true` once the callbacks have run.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.state() == EventState::Processed
    }

    /// `Some(true)` if the event succeeded, `Some(false)` if it failed,
    /// `None` while pending.
    #[must_use]
    pub fn is_ok(&self) -> Option<bool> {
        self.0.outcome.borrow().as_ref().map(Result::is_ok)
    }

    /// The outcome, once triggered.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.0.outcome.borrow().clone()
    }

    /// The success value, if the event succeeded.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.outcome().and_then(Result::ok)
    }

    /// The failure cause, if the event failed.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        self.outcome().and_then(Result::err)
    }

    /// Mark a failure as handled so processing it is not fatal.
    pub fn defuse(&self) {
        self.0.defused.set(true);
    }

    /// Whether the failure of this event has been handled.
    #[must_use]
    pub fn is_defused(&self) -> bool {
        self.0.defused.get()
    }

    /// Trigger the event successfully, now.
    pub fn succeed(&self, value: Value) -> SimResult<()> {
        self.env()?
            .schedule(self, Ok(value), 0.0, Priority::Normal)
    }

    /// Trigger the event as failed, now.
    pub fn fail(&self, failure: Failure) -> SimResult<()> {
        self.env()?
            .schedule(self, Err(failure), 0.0, Priority::Normal)
    }

    /// Trigger this event with the outcome of `other`.
    ///
    /// Handy as a callback to chain events together.
    pub fn trigger(&self, other: &Self) -> SimResult<()> {
        let outcome = other.outcome().ok_or(SimError::NotTriggered(other.id()))?;
        self.env()?.schedule(self, outcome, 0.0, Priority::Normal)
    }

    /// Register a callback to run when the event is processed.
    ///
    /// The callback must not hold on to a borrow of anything the kernel
    /// needs; it may freely schedule new events.
    pub fn on_processed<F>(&self, f: F) -> SimResult<()>
    where
        F: FnOnce(&Environment, &Self) + 'static,
    {
        if self.is_processed() {
            return Err(SimError::AlreadyProcessed(self.id()));
        }
        self.add_callback(Callback::Hook(Box::new(f)));
        Ok(())
    }

    /// A future resolving to this event's outcome. Only usable inside a
    /// process.
    #[must_use]
    pub fn wait(&self) -> EventFuture {
        EventFuture {
            event: self.clone(),
            registered: None,
        }
    }

    /// The environment this event belongs to.
    pub fn env(&self) -> SimResult<Environment> {
        Environment::upgrade(&self.0.env).ok_or(SimError::EnvironmentDropped)
    }

    pub(crate) fn belongs_to(&self, env: &Environment) -> bool {
        env.owns(&self.0.env)
    }

    pub(crate) fn add_callback(&self, callback: Callback) {
        self.0.callbacks.borrow_mut().push(callback);
    }

    /// Drop the resume callback of `pid`, if any. Used when a process is
    /// interrupted away from this event.
    pub(crate) fn remove_resume(&self, pid: ProcessId) {
        self.0
            .callbacks
            .borrow_mut()
            .retain(|cb| !matches!(cb, Callback::Resume(p) if *p == pid));
    }

    pub(crate) fn mark_triggered(&self, outcome: Outcome) {
        *self.0.outcome.borrow_mut() = Some(outcome);
        self.0.state.set(EventState::Triggered);
    }

    /// Transition to processed and hand the callbacks to the caller.
    pub(crate) fn take_callbacks(&self) -> Vec<Callback> {
        self.0.state.set(EventState::Processed);
        std::mem::take(&mut *self.0.callbacks.borrow_mut())
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Event {}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("state", &self.0.state.get())
            .finish_non_exhaustive()
    }
}

impl IntoFuture for Event {
    type Output = Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        EventFuture {
            event: self,
            registered: None,
        }
    }
}

// ── Awaiting ──────────────────────────────────────────────────────────

/// Suspension point of a process waiting on an [`Event`].
///
/// Polling order: a queued interrupt wins over everything, then an already
/// processed event resolves immediately, otherwise the active process is
/// registered as a listener and suspended.
#[must_use = "futures do nothing unless awaited"]
pub struct EventFuture {
    event: Event,
    registered: Option<ProcessId>,
}

impl EventFuture {
    /// The event being waited on.
    pub const fn event(&self) -> &Event {
        &self.event
    }
}

impl Future for EventFuture {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Outcome> {
        let env = match self.event.env() {
            Ok(env) => env,
            Err(e) => return Poll::Ready(Err(e.into())),
        };
        let Some(pid) = env.active_process() else {
            return Poll::Ready(Err(SimError::NoActiveProcess.into()));
        };

        if let Some(interrupt) = env.take_interrupt(pid) {
            if self.registered.take().is_some() {
                self.event.remove_resume(pid);
            }
            env.set_target(pid, None);
            return Poll::Ready(Err(Failure::Interrupt(interrupt)));
        }

        if self.event.is_processed() {
            self.registered = None;
            let outcome = self
                .event
                .outcome()
                .unwrap_or_else(|| Err(SimError::NotTriggered(self.event.id()).into()));
            if outcome.is_err() {
                self.event.defuse();
            }
            return Poll::Ready(outcome);
        }

        if self.registered != Some(pid) {
            self.event.add_callback(Callback::Resume(pid));
            self.registered = Some(pid);
        }
        env.set_target(pid, Some(self.event.clone()));
        Poll::Pending
    }
}
