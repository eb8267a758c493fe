//! Step trace sinks.
//!
//! Provides a bounded in-memory recorder of processed calendar entries.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::core::calendar::Priority;
use crate::core::event::EventId;

/// One processed calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// Simulation time of the step.
    pub time: f64,
    /// Priority class of the entry.
    pub priority: Priority,
    /// Insertion sequence of the entry.
    pub sequence: u64,
    /// The processed event.
    #[serde(serialize_with = "serialize_event_id")]
    pub event: EventId,
    /// What produced the event (`"timeout"`, `"process"`, ...).
    pub kind: &'static str,
    /// Whether the event succeeded.
    pub ok: bool,
}

fn serialize_event_id<S: serde::Serializer>(id: &EventId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(id.raw())
}

/// Step trace abstraction.
pub trait TraceSink {
    /// Record a processed step.
    fn record(&mut self, record: StepRecord);
}

/// In-memory trace sink for testing and debugging.
///
/// Clones share the same buffer, so one clone can be handed to the
/// environment and another kept for inspection.
#[derive(Clone)]
pub struct InMemoryTraceSink {
    records: Rc<RefCell<VecDeque<StepRecord>>>,
    max_records: usize,
}

impl InMemoryTraceSink {
    /// Create a new in-memory sink keeping at most `max_records` steps.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Rc::new(RefCell::new(VecDeque::with_capacity(max_records))),
            max_records,
        }
    }

    /// Retrieve a snapshot of stored records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<StepRecord> {
        self.records.borrow().iter().cloned().collect()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Serialize the stored records as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records())
    }
}

impl TraceSink for InMemoryTraceSink {
    fn record(&mut self, record: StepRecord) {
        let mut records = self.records.borrow_mut();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        if self.max_records > 0 {
            records.push_back(record);
        }
    }
}

impl std::fmt::Debug for InMemoryTraceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTraceSink")
            .field("len", &self.len())
            .field("max_records", &self.max_records)
            .finish()
    }
}
