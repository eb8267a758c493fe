//! Bounded heap-ordered queue with arbitrary removal.

use std::cmp::Ordering;

use crate::core::{SimError, SimResult};
use crate::infra::queue::{AdmissionQueue, Keyed};

/// Wrapper making an item orderable by `(key, insertion counter)`.
#[derive(Debug, Clone)]
struct Slot<T: Keyed> {
    key: T::Key,
    counter: u64,
    item: T,
}

impl<T: Keyed> Slot<T> {
    fn order(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.counter.cmp(&other.counter))
    }
}

/// Min-heap of [`Keyed`] items; equal keys are served in insertion order.
///
/// Removing the root is `O(log n)`. Removing any other position re-heapifies
/// the whole queue, which is linear.
#[derive(Debug, Clone)]
pub struct SortedQueue<T: Keyed> {
    heap: Vec<Slot<T>>,
    counter: u64,
    maxlen: Option<usize>,
}

impl<T: Keyed> SortedQueue<T> {
    /// Create an unbounded queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heap: Vec::new(),
            counter: 0,
            maxlen: None,
        }
    }

    /// Create a queue holding at most `maxlen` items.
    #[must_use]
    pub fn with_maxlen(maxlen: usize) -> Self {
        Self {
            heap: Vec::with_capacity(maxlen.min(1024)),
            counter: 0,
            maxlen: Some(maxlen),
        }
    }

    /// The configured bound.
    #[must_use]
    pub const fn maxlen(&self) -> Option<usize> {
        self.maxlen
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert `item`, failing with [`SimError::QueueFull`] at the bound.
    pub fn append(&mut self, item: T) -> SimResult<()> {
        if let Some(max) = self.maxlen {
            if self.heap.len() >= max {
                return Err(SimError::QueueFull(format!("sorted queue maxlen {max} reached")));
            }
        }
        let slot = Slot {
            key: item.key(),
            counter: self.counter,
            item,
        };
        self.counter += 1;
        self.heap.push(slot);
        self.sift_up(self.heap.len() - 1);
        Ok(())
    }

    /// The minimum item.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.heap.first().map(|s| &s.item)
    }

    /// Remove and return the minimum item.
    pub fn pop_min(&mut self) -> Option<T> {
        self.pop(0).ok()
    }

    /// Remove and return the item at heap index `index`.
    ///
    /// Index 0 is the minimum. Fails with [`SimError::NotFound`] when out of
    /// range.
    pub fn pop(&mut self, index: usize) -> SimResult<T> {
        let len = self.heap.len();
        if index >= len {
            return Err(SimError::NotFound(format!("heap index {index} out of range ({len})")));
        }
        self.heap.swap(index, len - 1);
        let slot = self
            .heap
            .pop()
            .ok_or_else(|| SimError::NotFound(format!("heap index {index}")))?;
        if index < self.heap.len() {
            if index == 0 {
                self.sift_down(0);
            } else {
                self.heapify();
            }
        }
        Ok(slot.item)
    }

    /// Iterate in heap order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.heap.iter().map(|s| &s.item)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.heap[a].order(&self.heap[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.heap.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.heap.swap(pos, smallest);
            pos = smallest;
        }
    }

    fn heapify(&mut self) {
        for pos in (0..self.heap.len() / 2).rev() {
            self.sift_down(pos);
        }
    }
}

impl<T: Keyed + PartialEq> SortedQueue<T> {
    /// Remove `item`, failing with [`SimError::NotFound`] if absent.
    pub fn remove(&mut self, item: &T) -> SimResult<T> {
        let index = self
            .heap
            .iter()
            .position(|s| &s.item == item)
            .ok_or_else(|| SimError::NotFound("item not in sorted queue".into()))?;
        self.pop(index)
    }
}

impl<T: Keyed> Default for SortedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + PartialEq + Clone> AdmissionQueue<T> for SortedQueue<T> {
    fn enqueue(&mut self, item: T) -> SimResult<()> {
        self.append(item)
    }

    fn peek(&self) -> Option<&T> {
        Self::peek(self)
    }

    fn dequeue(&mut self) -> Option<T> {
        self.pop_min()
    }

    fn remove(&mut self, item: &T) -> SimResult<T> {
        Self::remove(self, item)
    }

    fn max_depth(&self) -> Option<usize> {
        self.maxlen
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn to_vec(&self) -> Vec<T> {
        let mut slots: Vec<&Slot<T>> = self.heap.iter().collect();
        slots.sort_by(|a, b| a.order(b));
        slots.into_iter().map(|s| s.item.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Job {
        name: &'static str,
        priority: i64,
    }

    impl Keyed for Job {
        type Key = i64;

        fn key(&self) -> i64 {
            self.priority
        }
    }

    fn job(name: &'static str, priority: i64) -> Job {
        Job { name, priority }
    }

    fn drain(q: &mut SortedQueue<Job>) -> Vec<&'static str> {
        std::iter::from_fn(|| q.pop_min()).map(|j| j.name).collect()
    }

    #[test]
    fn test_priority_ordering() {
        let mut q = SortedQueue::new();
        q.append(job("low", 9)).unwrap();
        q.append(job("critical", 0)).unwrap();
        q.append(job("normal", 5)).unwrap();
        q.append(job("high", 2)).unwrap();
        assert_eq!(q.peek().map(|j| j.name), Some("critical"));
        assert_eq!(drain(&mut q), vec!["critical", "high", "normal", "low"]);
    }

    #[test]
    fn test_fifo_within_key() {
        let mut q = SortedQueue::new();
        for name in ["a", "b", "c", "d"] {
            q.append(job(name, 1)).unwrap();
        }
        assert_eq!(drain(&mut q), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_maxlen_then_remove_then_append() {
        let mut q = SortedQueue::with_maxlen(2);
        q.append(job("a", 1)).unwrap();
        q.append(job("b", 2)).unwrap();
        assert!(matches!(q.append(job("c", 0)), Err(SimError::QueueFull(_))));
        assert_eq!(q.len(), 2);

        q.remove(&job("a", 1)).unwrap();
        q.append(job("c", 0)).unwrap();
        assert_eq!(drain(&mut q), vec!["c", "b"]);
    }

    #[test]
    fn test_pop_interior_keeps_heap_order() {
        let mut q = SortedQueue::new();
        for p in [7, 3, 9, 1, 5, 8, 2, 6] {
            q.append(job("x", p)).unwrap();
        }
        let removed = q.pop(3).unwrap();
        let mut rest: Vec<i64> = std::iter::from_fn(|| q.pop_min()).map(|j| j.priority).collect();
        assert!(rest.windows(2).all(|w| w[0] <= w[1]));
        rest.push(removed.priority);
        rest.sort_unstable();
        assert_eq!(rest, vec![1, 2, 3, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_not_found() {
        let mut q = SortedQueue::new();
        q.append(job("a", 1)).unwrap();
        assert!(matches!(q.pop(1), Err(SimError::NotFound(_))));
        assert!(matches!(q.remove(&job("zz", 4)), Err(SimError::NotFound(_))));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_to_vec_is_sorted() {
        let mut q = SortedQueue::new();
        for p in [4, 2, 8, 1] {
            q.append(job("x", p)).unwrap();
        }
        let keys: Vec<i64> = q.to_vec().iter().map(|j| j.priority).collect();
        assert_eq!(keys, vec![1, 2, 4, 8]);
    }
}
