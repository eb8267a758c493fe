//! Queue backends.
//!
//! Resources keep their pending requests in an [`AdmissionQueue`]. Plain
//! resources use a [`FifoQueue`], priority resources a [`SortedQueue`].

pub mod fifo;
pub mod sorted;

pub use fifo::FifoQueue;
pub use sorted::SortedQueue;

use crate::core::SimResult;

/// Items that order themselves in a [`SortedQueue`].
pub trait Keyed {
    /// Sort key; smaller is served first.
    type Key: Ord + Clone + std::fmt::Debug;

    /// The item's key.
    fn key(&self) -> Self::Key;
}

/// Abstraction for admission queue backends.
pub trait AdmissionQueue<T: PartialEq + Clone> {
    /// Enqueue an item if space permits.
    fn enqueue(&mut self, item: T) -> SimResult<()>;
    /// The next item to be served.
    fn peek(&self) -> Option<&T>;
    /// Remove and return the next item to be served.
    fn dequeue(&mut self) -> Option<T>;
    /// Remove a specific item.
    fn remove(&mut self, item: &T) -> SimResult<T>;
    /// Maximum depth allowed for this queue, if bounded.
    fn max_depth(&self) -> Option<usize>;
    /// Current depth.
    fn len(&self) -> usize;
    /// `true` if nothing is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Snapshot of the queued items in service order.
    fn to_vec(&self) -> Vec<T>;
}
