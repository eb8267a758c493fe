//! Bounded first-in, first-out queue.

use std::collections::VecDeque;

use crate::core::{SimError, SimResult};
use crate::infra::queue::AdmissionQueue;

/// FIFO queue with an optional maximum length.
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
    maxlen: Option<usize>,
}

impl<T> FifoQueue<T> {
    /// Create an unbounded queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
            maxlen: None,
        }
    }

    /// Create a queue holding at most `maxlen` items.
    #[must_use]
    pub fn with_maxlen(maxlen: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(maxlen.min(1024)),
            maxlen: Some(maxlen),
        }
    }

    /// Iterate in service order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq + Clone> AdmissionQueue<T> for FifoQueue<T> {
    fn enqueue(&mut self, item: T) -> SimResult<()> {
        if let Some(max) = self.maxlen {
            if self.items.len() >= max {
                return Err(SimError::QueueFull(format!("fifo queue maxlen {max} reached")));
            }
        }
        self.items.push_back(item);
        Ok(())
    }

    fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn remove(&mut self, item: &T) -> SimResult<T> {
        let pos = self
            .items
            .iter()
            .position(|i| i == item)
            .ok_or_else(|| SimError::NotFound("item not in fifo queue".into()))?;
        self.items
            .remove(pos)
            .ok_or_else(|| SimError::NotFound(format!("fifo index {pos}")))
    }

    fn max_depth(&self) -> Option<usize> {
        self.maxlen
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
