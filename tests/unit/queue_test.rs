//! Tests for admission queues

use prometheus_des::core::SimError;
use prometheus_des::infra::{AdmissionQueue, FifoQueue, Keyed, SortedQueue};

#[derive(Debug, Clone, PartialEq)]
struct Customer {
    id: u32,
    priority: i64,
}

impl Keyed for Customer {
    type Key = i64;

    fn key(&self) -> i64 {
        self.priority
    }
}

fn customer(id: u32, priority: i64) -> Customer {
    Customer { id, priority }
}

#[test]
fn test_sorted_queue_maxlen_scenario() {
    let mut q = SortedQueue::with_maxlen(2);
    q.append(customer(1, 3)).unwrap();
    q.append(customer(2, 1)).unwrap();

    let err = q.append(customer(3, 2)).unwrap_err();
    assert!(matches!(err, SimError::QueueFull(_)));
    assert_eq!(q.len(), 2);

    let removed = q.remove(&customer(1, 3)).unwrap();
    assert_eq!(removed.id, 1);
    q.append(customer(3, 2)).unwrap();

    assert_eq!(q.pop_min().map(|c| c.id), Some(2));
    assert_eq!(q.pop_min().map(|c| c.id), Some(3));
    assert!(q.pop_min().is_none());
}

#[test]
fn test_sorted_queue_pop_by_index() {
    let mut q = SortedQueue::new();
    for (id, p) in [(1, 5), (2, 1), (3, 4), (4, 2), (5, 3)] {
        q.append(customer(id, p)).unwrap();
    }
    assert_eq!(q.peek().map(|c| c.id), Some(2));
    let popped = q.pop(0).unwrap();
    assert_eq!(popped.id, 2);

    let interior = q.pop(2).unwrap();
    let mut remaining: Vec<i64> = std::iter::from_fn(|| q.pop_min())
        .map(|c| c.priority)
        .collect();
    assert!(remaining.windows(2).all(|w| w[0] <= w[1]));
    remaining.push(interior.priority);
    remaining.sort_unstable();
    assert_eq!(remaining, vec![2, 3, 4, 5]);

    assert!(matches!(q.pop(0), Err(SimError::NotFound(_))));
}

#[test]
fn test_sorted_queue_iter_and_maxlen() {
    let mut q = SortedQueue::new();
    assert_eq!(q.maxlen(), None);
    assert!(q.is_empty());
    q.append(customer(1, 2)).unwrap();
    q.append(customer(2, 2)).unwrap();
    let mut ids: Vec<u32> = q.iter().map(|c| c.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_queues_behind_trait_object() {
    let mut queues: Vec<Box<dyn AdmissionQueue<Customer>>> = vec![
        Box::new(FifoQueue::with_maxlen(3)),
        Box::new(SortedQueue::with_maxlen(3)),
    ];
    for q in &mut queues {
        q.enqueue(customer(1, 9)).unwrap();
        q.enqueue(customer(2, 0)).unwrap();
        q.enqueue(customer(3, 5)).unwrap();
        assert!(matches!(q.enqueue(customer(4, 1)), Err(SimError::QueueFull(_))));
        assert_eq!(q.max_depth(), Some(3));
    }

    let fifo: Vec<u32> = queues[0].to_vec().iter().map(|c| c.id).collect();
    let sorted: Vec<u32> = queues[1].to_vec().iter().map(|c| c.id).collect();
    assert_eq!(fifo, vec![1, 2, 3]);
    assert_eq!(sorted, vec![2, 3, 1]);

    for q in &mut queues {
        q.remove(&customer(3, 5)).unwrap();
        assert_eq!(q.len(), 2);
        assert!(matches!(q.remove(&customer(3, 5)), Err(SimError::NotFound(_))));
    }
    assert_eq!(queues[0].dequeue().map(|c| c.id), Some(1));
    assert_eq!(queues[1].dequeue().map(|c| c.id), Some(2));
}
