//! Infrastructure adapters: admission queues used by the resource family.

pub mod queue;

pub use queue::{AdmissionQueue, FifoQueue, Keyed, SortedQueue};
