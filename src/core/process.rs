//! Processes: `async` bodies driven by the environment.
//!
//! A process is suspended whenever it awaits an event that has not been
//! processed yet. The event's `Resume` callback polls it again. The future is
//! taken out of its slot while it is polled, so a process body may touch the
//! environment freely.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::ops::Deref;
use std::rc::Weak;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;

use crate::core::calendar::Priority;
use crate::core::environment::{Environment, Kernel};
use crate::core::error::{SimError, SimResult};
use crate::core::event::{Callback, Event, EventFuture};
use crate::core::value::{Interrupt, Outcome, Value};

/// Identifier of a process, unique within one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Return the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{}", self.0)
    }
}

/// Kernel-side bookkeeping for a live process.
pub(crate) struct ProcessSlot {
    pub(crate) name: String,
    pub(crate) future: Option<LocalBoxFuture<'static, Outcome>>,
    pub(crate) target: Option<Event>,
    pub(crate) interrupts: VecDeque<Interrupt>,
    pub(crate) event: Event,
}

/// Handle to a process. Derefs to its completion event.
#[derive(Clone)]
pub struct Process {
    id: ProcessId,
    name: String,
    event: Event,
    env: Weak<RefCell<Kernel>>,
}

impl Process {
    /// The process identifier.
    #[must_use]
    pub const fn id(&self) -> ProcessId {
        self.id
    }

    /// The process name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The completion event; succeeds with the body's value or fails with
    /// its error.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// `true` until the body has returned.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.event.is_triggered()
    }

    /// The event the process is currently suspended on.
    #[must_use]
    pub fn target(&self) -> Option<Event> {
        Environment::upgrade(&self.env).and_then(|env| env.process_target(self.id))
    }

    /// Raise an [`Interrupt`] carrying `cause` inside the process.
    ///
    /// The interrupt is delivered at the process's current (or next)
    /// suspension point. Fails with [`SimError::InvalidInterrupt`] if the
    /// process has already terminated.
    pub fn interrupt(&self, cause: Value) -> SimResult<()> {
        if !self.is_alive() {
            return Err(SimError::InvalidInterrupt(format!("{} ({})", self.id, self.name)));
        }
        let env = Environment::upgrade(&self.env).ok_or(SimError::EnvironmentDropped)?;
        env.interrupt_process(self.id, cause)
    }

    /// A future resolving to the process outcome.
    #[must_use]
    pub fn wait(&self) -> EventFuture {
        self.event.wait()
    }
}

impl Deref for Process {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

impl IntoFuture for Process {
    type Output = Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.event.wait()
    }
}

impl IntoFuture for &Process {
    type Output = Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.event.wait()
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Environment {
    /// Start a process running `body`.
    ///
    /// The first step happens at the current time, before any normal event
    /// scheduled for the same time.
    pub fn process<F>(&self, body: F) -> Process
    where
        F: Future<Output = Outcome> + 'static,
    {
        self.process_named("process", body)
    }

    /// Start a named process running `body`.
    pub fn process_named<F>(&self, name: impl Into<String>, body: F) -> Process
    where
        F: Future<Output = Outcome> + 'static,
    {
        let name = name.into();
        let event = Event::new(self, "process");
        let init = Event::new(self, "init");
        let id = {
            let mut k = self.kernel().borrow_mut();
            let id = ProcessId(k.next_process_id);
            k.next_process_id += 1;
            id
        };
        init.add_callback(Callback::Resume(id));
        self.kernel().borrow_mut().processes.insert(
            id,
            ProcessSlot {
                name: name.clone(),
                future: Some(body.boxed_local()),
                target: Some(init.clone()),
                interrupts: VecDeque::new(),
                event: event.clone(),
            },
        );
        // `init` is fresh and local, scheduling it at delay 0 cannot fail.
        if let Err(e) = self.schedule(&init, Ok(Value::none()), 0.0, Priority::Urgent) {
            tracing::warn!(process = %id, error = %e, "failed to schedule process start");
        }
        tracing::info!(process = %id, name = %name, time = self.now(), "process started");
        Process {
            id,
            name,
            event,
            env: self.downgrade(),
        }
    }

    pub(crate) fn process_target(&self, pid: ProcessId) -> Option<Event> {
        self.kernel()
            .borrow()
            .processes
            .get(&pid)
            .and_then(|slot| slot.target.clone())
    }

    pub(crate) fn set_target(&self, pid: ProcessId, target: Option<Event>) {
        if let Some(slot) = self.kernel().borrow_mut().processes.get_mut(&pid) {
            slot.target = target;
        }
    }

    pub(crate) fn take_interrupt(&self, pid: ProcessId) -> Option<Interrupt> {
        self.kernel()
            .borrow_mut()
            .processes
            .get_mut(&pid)
            .and_then(|slot| slot.interrupts.pop_front())
    }

    /// Queue an interrupt for `pid` and schedule its delivery.
    pub(crate) fn interrupt_process(&self, pid: ProcessId, cause: Value) -> SimResult<()> {
        {
            let mut k = self.kernel().borrow_mut();
            let slot = k
                .processes
                .get_mut(&pid)
                .ok_or_else(|| SimError::InvalidInterrupt(pid.to_string()))?;
            slot.interrupts.push_back(Interrupt::new(cause));
        }
        let delivery = Event::new(self, "interruption");
        delivery.add_callback(Callback::Hook(Box::new(move |env, _| {
            env.deliver_interrupt(pid);
        })));
        tracing::debug!(process = %pid, "interrupt queued");
        self.schedule(&delivery, Ok(Value::none()), 0.0, Priority::Urgent)
    }

    /// Detach `pid` from its target and resume it so a queued interrupt is
    /// raised at its suspension point.
    fn deliver_interrupt(&self, pid: ProcessId) {
        let target = {
            let mut k = self.kernel().borrow_mut();
            let Some(slot) = k.processes.get_mut(&pid) else {
                return;
            };
            if slot.interrupts.is_empty() {
                return;
            }
            slot.target.take()
        };
        if let Some(target) = target {
            target.remove_resume(pid);
        }
        self.resume(pid);
    }

    /// Poll process `pid` once.
    pub(crate) fn resume(&self, pid: ProcessId) {
        let (mut future, previous) = {
            let mut k = self.kernel().borrow_mut();
            let Some(slot) = k.processes.get_mut(&pid) else {
                return;
            };
            let Some(future) = slot.future.take() else {
                return;
            };
            slot.target = None;
            (future, k.active.replace(pid))
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = future.as_mut().poll(&mut cx);

        match poll {
            Poll::Pending => {
                let orphan = {
                    let mut k = self.kernel().borrow_mut();
                    k.active = previous;
                    match k.processes.get_mut(&pid) {
                        Some(slot) => {
                            slot.future = Some(future);
                            None
                        }
                        None => Some(future),
                    }
                };
                drop(orphan);
            }
            Poll::Ready(outcome) => {
                let slot = {
                    let mut k = self.kernel().borrow_mut();
                    k.active = previous;
                    k.processes.remove(&pid)
                };
                drop(future);
                let Some(slot) = slot else {
                    return;
                };
                tracing::info!(
                    process = %pid,
                    name = %slot.name,
                    time = self.now(),
                    ok = outcome.is_ok(),
                    "process finished"
                );
                if let Err(e) = self.schedule(&slot.event, outcome, 0.0, Priority::Normal) {
                    tracing::warn!(process = %pid, error = %e, "failed to schedule process completion");
                }
            }
        }
    }
}
