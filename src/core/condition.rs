//! Conditions: events composed from other events.

use std::cell::Cell;
use std::fmt;
use std::future::IntoFuture;
use std::ops::{BitAnd, BitOr, Deref};
use std::rc::Rc;

use crate::core::calendar::Priority;
use crate::core::environment::Environment;
use crate::core::error::{SimError, SimResult};
use crate::core::event::{Callback, Event, EventFuture, EventId};
use crate::core::value::Value;

/// How a condition combines its sub-events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluator {
    /// Every sub-event must succeed.
    All,
    /// One successful sub-event is enough.
    Any,
}

impl Evaluator {
    const fn satisfied(self, done: usize, total: usize) -> bool {
        match self {
            Self::All => done == total,
            Self::Any => done > 0,
        }
    }
}

/// Values of the sub-events that had succeeded when a condition fired, in
/// sub-event order.
#[derive(Debug, Clone, Default)]
pub struct ConditionValue {
    entries: Vec<(EventId, Value)>,
}

impl ConditionValue {
    /// Number of recorded sub-events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value of `event`, if it had succeeded when the condition fired.
    #[must_use]
    pub fn get(&self, event: &Event) -> Option<&Value> {
        let id = event.id();
        self.entries.iter().find(|(e, _)| *e == id).map(|(_, v)| v)
    }

    /// Whether `event` is recorded.
    #[must_use]
    pub fn contains(&self, event: &Event) -> bool {
        self.get(event).is_some()
    }

    /// Recorded event ids, in sub-event order.
    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Recorded `(id, value)` pairs, in sub-event order.
    pub fn iter(&self) -> impl Iterator<Item = (EventId, &Value)> + '_ {
        self.entries.iter().map(|(id, v)| (*id, v))
    }
}

struct ConditionState {
    event: Event,
    evaluator: Evaluator,
    events: Vec<Event>,
    done: Cell<usize>,
}

impl ConditionState {
    fn snapshot(&self) -> ConditionValue {
        ConditionValue {
            entries: self
                .events
                .iter()
                .filter(|e| e.is_processed())
                .filter_map(|e| e.value().map(|v| (e.id(), v)))
                .collect(),
        }
    }

    fn check(&self, env: &Environment, sub: &Event) {
        if self.event.is_triggered() {
            return;
        }
        self.done.set(self.done.get() + 1);

        let outcome = match sub.failure() {
            Some(failure) => {
                sub.defuse();
                Err(failure)
            }
            None if self.evaluator.satisfied(self.done.get(), self.events.len()) => {
                Ok(Value::new(self.snapshot()))
            }
            None => return,
        };
        tracing::debug!(
            condition = %self.event.id(),
            sub = %sub.id(),
            ok = outcome.is_ok(),
            "condition fired"
        );
        if let Err(e) = env.schedule(&self.event, outcome, 0.0, Priority::Normal) {
            tracing::warn!(condition = %self.event.id(), error = %e, "failed to trigger condition");
        }
    }
}

/// An event that fires when its sub-events satisfy an [`Evaluator`].
///
/// Succeeds with a [`ConditionValue`]. A failing sub-event fails the
/// condition with the same cause unless the condition has already fired.
#[derive(Clone)]
pub struct Condition {
    state: Rc<ConditionState>,
}

impl Condition {
    pub(crate) fn new(env: &Environment, evaluator: Evaluator, events: Vec<Event>) -> SimResult<Self> {
        if let Some(foreign) = events.iter().find(|e| !e.belongs_to(env)) {
            return Err(SimError::ForeignEvent(foreign.id()));
        }
        let state = Rc::new(ConditionState {
            event: Event::new(env, "condition"),
            evaluator,
            events,
            done: Cell::new(0),
        });

        if state.events.is_empty() && evaluator == Evaluator::All {
            env.schedule(&state.event, Ok(Value::new(ConditionValue::default())), 0.0, Priority::Normal)?;
        }

        for sub in &state.events {
            if sub.is_processed() {
                state.check(env, sub);
            } else {
                let st = Rc::clone(&state);
                sub.add_callback(Callback::Hook(Box::new(move |env, ev| st.check(env, ev))));
            }
        }
        Ok(Self { state })
    }

    /// The evaluator.
    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        self.state.evaluator
    }

    /// The sub-events.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    /// The condition's own event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.state.event
    }
}

impl Deref for Condition {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.state.event
    }
}

impl IntoFuture for Condition {
    type Output = crate::core::value::Outcome;
    type IntoFuture = EventFuture;

    fn into_future(self) -> EventFuture {
        self.state.event.wait()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("event", &self.state.event)
            .field("evaluator", &self.state.evaluator)
            .field("events", &self.state.events.len())
            .finish()
    }
}

fn combine(evaluator: Evaluator, a: &Event, b: &Event) -> SimResult<Condition> {
    let env = a.env()?;
    Condition::new(&env, evaluator, vec![a.clone(), b.clone()])
}

impl BitAnd for Event {
    type Output = SimResult<Condition>;

    fn bitand(self, rhs: Self) -> Self::Output {
        combine(Evaluator::All, &self, &rhs)
    }
}

impl BitAnd for &Event {
    type Output = SimResult<Condition>;

    fn bitand(self, rhs: Self) -> Self::Output {
        combine(Evaluator::All, self, rhs)
    }
}

impl BitOr for Event {
    type Output = SimResult<Condition>;

    fn bitor(self, rhs: Self) -> Self::Output {
        combine(Evaluator::Any, &self, &rhs)
    }
}

impl BitOr for &Event {
    type Output = SimResult<Condition>;

    fn bitor(self, rhs: Self) -> Self::Output {
        combine(Evaluator::Any, self, rhs)
    }
}
