//! The simulation environment: clock, calendar and run loop.
//!
//! `Environment` is a cheap, cloneable handle to a single-threaded kernel.
//! Every process, event and resource keeps only a weak back-reference to it.
//! The kernel is never borrowed while callbacks run or processes are polled,
//! so callbacks and process bodies may freely schedule new events.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::config::SimulationConfig;
use crate::core::calendar::{Calendar, Priority};
use crate::core::condition::{Condition, Evaluator};
use crate::core::error::{SimError, SimResult};
use crate::core::event::{Callback, Event, EventId};
use crate::core::process::{ProcessId, ProcessSlot};
use crate::core::trace::{StepRecord, TraceSink};
use crate::core::value::{Outcome, Value};
use crate::core::Process;

/// Mutable kernel state behind an [`Environment`] handle.
pub(crate) struct Kernel {
    pub(crate) now: f64,
    pub(crate) calendar: Calendar,
    pub(crate) next_event_id: u64,
    pub(crate) next_process_id: u64,
    pub(crate) next_resource_id: u64,
    pub(crate) active: Option<ProcessId>,
    pub(crate) processes: BTreeMap<ProcessId, ProcessSlot>,
    pub(crate) tearing_down: bool,
    pub(crate) trace: Option<Box<dyn TraceSink>>,
}

/// When [`Environment::run`] should stop.
#[derive(Debug, Clone, Default)]
pub enum Until {
    /// Until the calendar is empty.
    #[default]
    Forever,
    /// Until the clock would pass this time.
    Time(f64),
    /// Until this event has been processed.
    Event(Event),
}

impl From<f64> for Until {
    fn from(t: f64) -> Self {
        Self::Time(t)
    }
}

impl From<Event> for Until {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<&Event> for Until {
    fn from(event: &Event) -> Self {
        Self::Event(event.clone())
    }
}

impl From<&Process> for Until {
    fn from(process: &Process) -> Self {
        Self::Event(process.event().clone())
    }
}

/// Handle to a simulation environment.
#[derive(Clone)]
pub struct Environment {
    kernel: Rc<RefCell<Kernel>>,
}

impl Environment {
    /// Create an environment whose clock starts at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_time(0.0)
    }

    /// Create an environment whose clock starts at `initial_time`.
    #[must_use]
    pub fn with_initial_time(initial_time: f64) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(Kernel {
                now: initial_time,
                calendar: Calendar::new(),
                next_event_id: 0,
                next_process_id: 0,
                next_resource_id: 0,
                active: None,
                processes: BTreeMap::new(),
                tearing_down: false,
                trace: None,
            })),
        }
    }

    /// Create an environment from validated configuration.
    pub fn from_config(cfg: &SimulationConfig) -> SimResult<Self> {
        cfg.validate()
            .map_err(|e| SimError::InvalidConfig(format!("config invalid: {e}")))?;
        Ok(Self::with_initial_time(cfg.initial_time))
    }

    /// Attach a step observer.
    #[must_use]
    pub fn with_trace_sink(self, sink: impl TraceSink + 'static) -> Self {
        self.kernel.borrow_mut().trace = Some(Box::new(sink));
        self
    }

    pub(crate) fn upgrade(weak: &Weak<RefCell<Kernel>>) -> Option<Self> {
        weak.upgrade().map(|kernel| Self { kernel })
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Kernel>> {
        Rc::downgrade(&self.kernel)
    }

    pub(crate) fn owns(&self, weak: &Weak<RefCell<Kernel>>) -> bool {
        std::ptr::eq(weak.as_ptr(), Rc::as_ptr(&self.kernel))
    }

    pub(crate) fn kernel(&self) -> &RefCell<Kernel> {
        &self.kernel
    }

    pub(crate) fn next_event_id(&self) -> EventId {
        let mut k = self.kernel.borrow_mut();
        let id = EventId::new(k.next_event_id);
        k.next_event_id += 1;
        id
    }

    pub(crate) fn next_resource_id(&self) -> u64 {
        let mut k = self.kernel.borrow_mut();
        let id = k.next_resource_id;
        k.next_resource_id += 1;
        id
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.kernel.borrow().now
    }

    /// The process currently running, if any.
    #[must_use]
    pub fn active_process(&self) -> Option<ProcessId> {
        self.kernel.borrow().active
    }

    /// `true` while [`Environment::teardown`] is abandoning processes.
    #[must_use]
    pub fn is_tearing_down(&self) -> bool {
        self.kernel.borrow().tearing_down
    }

    /// Time of the next scheduled activation, if any.
    #[must_use]
    pub fn peek(&self) -> Option<f64> {
        self.kernel.borrow().calendar.peek_time()
    }

    /// Number of activations on the calendar.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.kernel.borrow().calendar.len()
    }

    /// Create a new pending event.
    #[must_use]
    pub fn event(&self) -> Event {
        Event::new(self, "event")
    }

    /// An event that succeeds after `delay`.
    pub fn timeout(&self, delay: f64) -> SimResult<Event> {
        self.timeout_with(delay, Value::none())
    }

    /// An event that succeeds with `value` after `delay`.
    pub fn timeout_with(&self, delay: f64, value: Value) -> SimResult<Event> {
        let event = Event::new(self, "timeout");
        self.schedule(&event, Ok(value), delay, Priority::Normal)?;
        Ok(event)
    }

    /// A condition that succeeds once every event in `events` has.
    pub fn all_of(&self, events: impl IntoIterator<Item = Event>) -> SimResult<Condition> {
        Condition::new(self, Evaluator::All, events.into_iter().collect())
    }

    /// A condition that succeeds once any event in `events` has.
    pub fn any_of(&self, events: impl IntoIterator<Item = Event>) -> SimResult<Condition> {
        Condition::new(self, Evaluator::Any, events.into_iter().collect())
    }

    /// Fix `event`'s outcome and put it on the calendar `delay` from now.
    pub fn schedule(
        &self,
        event: &Event,
        outcome: Outcome,
        delay: f64,
        priority: Priority,
    ) -> SimResult<()> {
        if delay.is_nan() || delay < 0.0 {
            return Err(SimError::NegativeTime(delay));
        }
        if !event.belongs_to(self) {
            return Err(SimError::ForeignEvent(event.id()));
        }
        if event.is_triggered() {
            return Err(SimError::AlreadyTriggered(event.id()));
        }
        event.mark_triggered(outcome);
        let mut k = self.kernel.borrow_mut();
        let at = k.now + delay;
        let sequence = k.calendar.schedule(at, priority, event.clone());
        tracing::trace!(event = %event.id(), kind = event.kind(), at, sequence, "scheduled");
        Ok(())
    }

    /// Process the next activation.
    ///
    /// Advances the clock to the entry's time and runs the event's callbacks
    /// in registration order. A failed event nobody handled is returned as
    /// [`SimError::Unhandled`] after its callbacks ran.
    pub fn step(&self) -> SimResult<()> {
        let entry = {
            let mut k = self.kernel.borrow_mut();
            let entry = k.calendar.pop_next().ok_or(SimError::EmptyCalendar)?;
            let time = entry.time.into_inner();
            if time > k.now {
                k.now = time;
            }
            entry
        };
        let event = entry.event;
        let callbacks = event.take_callbacks();
        tracing::debug!(
            event = %event.id(),
            kind = event.kind(),
            time = entry.time.into_inner(),
            callbacks = callbacks.len(),
            "processing"
        );

        for callback in callbacks {
            match callback {
                Callback::Resume(pid) => self.resume(pid),
                Callback::Hook(hook) => hook(self, &event),
            }
        }

        let failure = event.failure();
        // The sink runs without the kernel borrowed, like callbacks do.
        let sink = self.kernel.borrow_mut().trace.take();
        if let Some(mut sink) = sink {
            sink.record(StepRecord {
                time: entry.time.into_inner(),
                priority: entry.priority,
                sequence: entry.sequence,
                event: event.id(),
                kind: event.kind(),
                ok: failure.is_none(),
            });
            let mut k = self.kernel.borrow_mut();
            if k.trace.is_none() {
                k.trace = Some(sink);
            }
        }

        match failure {
            Some(failure) if !event.is_defused() => {
                tracing::warn!(event = %event.id(), %failure, "unhandled failure");
                Err(SimError::Unhandled {
                    event: event.id(),
                    failure,
                })
            }
            _ => Ok(()),
        }
    }

    /// Step until `until` is reached.
    ///
    /// * [`Until::Forever`]: until the calendar is empty.
    /// * [`Until::Time`]: every entry at or before `t` is processed, then the
    ///   clock is set to `t`.
    /// * [`Until::Event`]: until the event is processed; returns its value.
    pub fn run(&self, until: impl Into<Until>) -> SimResult<Option<Value>> {
        match until.into() {
            Until::Forever => {
                while !self.kernel.borrow().calendar.is_empty() {
                    self.step()?;
                }
                Ok(None)
            }
            Until::Time(t) => {
                let now = self.now();
                if t.is_nan() || t < now {
                    return Err(SimError::InvalidUntil { until: t, now });
                }
                while let Some(next) = self.peek() {
                    if next > t {
                        break;
                    }
                    self.step()?;
                }
                self.kernel.borrow_mut().now = t;
                Ok(None)
            }
            Until::Event(event) => {
                if !event.belongs_to(self) {
                    return Err(SimError::ForeignEvent(event.id()));
                }
                while !event.is_processed() {
                    match self.step() {
                        Err(SimError::EmptyCalendar) => {
                            return Err(SimError::UntilNotReached(event.id()));
                        }
                        other => other?,
                    }
                }
                match event.outcome() {
                    Some(Ok(value)) => Ok(Some(value)),
                    Some(Err(failure)) => Err(SimError::Unhandled {
                        event: event.id(),
                        failure,
                    }),
                    None => Err(SimError::UntilNotReached(event.id())),
                }
            }
        }
    }

    /// Abandon every live process and clear the calendar.
    ///
    /// Process bodies are dropped with [`Environment::is_tearing_down`] set,
    /// so scoped acquisitions skip their release. Also breaks the reference
    /// cycles between suspended processes and the environment.
    pub fn teardown(&self) {
        let (slots, entries) = {
            let mut k = self.kernel.borrow_mut();
            k.tearing_down = true;
            k.active = None;
            (std::mem::take(&mut k.processes), k.calendar.drain())
        };
        let abandoned = slots.len();
        for (pid, mut slot) in slots {
            if let Some(target) = slot.target.take() {
                target.remove_resume(pid);
            }
            drop(slot);
        }
        drop(entries);
        self.kernel.borrow_mut().tearing_down = false;
        tracing::info!(abandoned, "environment torn down");
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let k = self.kernel.borrow();
        f.debug_struct("Environment")
            .field("now", &k.now)
            .field("pending", &k.calendar.len())
            .field("processes", &k.processes.len())
            .finish_non_exhaustive()
    }
}
