//! The event calendar: a deterministic min-heap of pending activations.
//!
//! Uses a `BinaryHeap` with reversed `Ord` on `Entry` to act as a min-heap
//! keyed by `(time, priority, sequence)`. Sequence numbers are strictly
//! increasing, so two runs issuing the same `schedule` calls always pop
//! entries in the same order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::event::Event;

/// Priority class of a calendar entry. Urgent entries at a given time run
/// before normal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Process start-up and interrupt delivery.
    Urgent = 0,
    /// Everything else.
    Normal = 1,
}

/// A scheduled activation of an event.
pub(crate) struct Entry {
    pub(crate) time: OrderedFloat<f64>,
    pub(crate) priority: Priority,
    pub(crate) sequence: u64,
    pub(crate) event: Event,
}

impl Entry {
    const fn key(&self) -> (OrderedFloat<f64>, Priority, u64) {
        (self.time, self.priority, self.sequence)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

/// Ordering: smallest `(time, priority, sequence)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the pending entries and the insertion counter.
#[derive(Default)]
pub(crate) struct Calendar {
    queue: BinaryHeap<Entry>,
    next_sequence: u64,
}

impl Calendar {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert `event` at absolute time `at`. Returns its sequence number.
    pub(crate) fn schedule(&mut self, at: f64, priority: Priority, event: Event) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Entry {
            time: OrderedFloat(at),
            priority,
            sequence,
            event,
        });
        sequence
    }

    /// Pop the next entry (earliest time, most urgent, oldest).
    pub(crate) fn pop_next(&mut self) -> Option<Entry> {
        self.queue.pop()
    }

    /// Time of the next entry.
    pub(crate) fn peek_time(&self) -> Option<f64> {
        self.queue.peek().map(|e| e.time.into_inner())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Remove every entry, returning them so they can be dropped outside
    /// any kernel borrow.
    pub(crate) fn drain(&mut self) -> Vec<Entry> {
        self.queue.drain().collect()
    }
}
