// crates/server-jobs/src/queue.rs
//! Pending-job queue ordered by priority, then submission order.
//!
//! `BinaryHeap` is a max-heap, so entries are wrapped in `Reverse` to pop the
//! smallest `(priority, sequence)` first.
//!
//! Removing a specific job (cancel while queued) is a linear scan followed by
//! a rebuild of the heap, O(n). Queues hold tens of jobs and cancelling before
//! dispatch is rare, so no index is kept.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::types::{JobId, Priority};

/// Field order defines the ordering: priority, then sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    priority: Priority,
    sequence: u64,
    id: JobId,
}

#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(log n). `sequence` must be unique and increasing per submission.
    pub fn push(&mut self, priority: Priority, sequence: u64, id: JobId) {
        self.heap.push(Reverse(QueueEntry {
            priority,
            sequence,
            id,
        }));
    }

    /// Remove and return the best job. O(log n).
    pub fn pop(&mut self) -> Option<JobId> {
        self.heap.pop().map(|Reverse(entry)| entry.id)
    }

    /// The job `pop` would return next.
    pub fn peek(&self) -> Option<&JobId> {
        self.heap.peek().map(|Reverse(entry)| &entry.id)
    }

    /// Remove `id` wherever it sits. O(n): scan plus heap rebuild.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse(entry)| entry.id.as_str() != id);
        self.heap.len() != before
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(queue: &mut PriorityQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop())
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_pops_by_priority() {
        let mut queue = PriorityQueue::new();
        queue.push(Priority::Low, 0, "low".into());
        queue.push(Priority::High, 1, "high".into());
        queue.push(Priority::Normal, 2, "normal".into());
        queue.push(Priority::Critical, 3, "critical".into());

        assert_eq!(queue.len(), 4);
        assert_eq!(queue.peek().map(|id| id.as_str()), Some("critical"));
        assert_eq!(drain(&mut queue), vec!["critical", "high", "normal", "low"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut queue = PriorityQueue::new();
        queue.push(Priority::Normal, 10, "first".into());
        queue.push(Priority::Normal, 11, "second".into());
        queue.push(Priority::High, 12, "urgent".into());
        queue.push(Priority::Normal, 13, "third".into());

        assert_eq!(drain(&mut queue), vec!["urgent", "first", "second", "third"]);
    }

    #[test]
    fn test_remove_keeps_heap_order() {
        let mut queue = PriorityQueue::new();
        for (seq, (prio, id)) in [
            (Priority::Low, "a"),
            (Priority::Critical, "b"),
            (Priority::Normal, "c"),
            (Priority::Critical, "d"),
            (Priority::High, "e"),
        ]
        .into_iter()
        .enumerate()
        {
            queue.push(prio, seq as u64, id.into());
        }

        assert!(queue.remove("b"));
        assert!(!queue.remove("b"));
        assert!(!queue.remove("missing"));
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&mut queue), vec!["d", "e", "c", "a"]);
    }

    #[test]
    fn test_pop_empty() {
        let mut queue = PriorityQueue::new();
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.peek(), None);
    }
}
