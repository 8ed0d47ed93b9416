//! Pending single-shot timers, ordered by deadline.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Instant;

use crate::Task;

struct TimerEntry {
    deadline: Instant,

    // Timers with equal deadlines expire in the order they were scheduled.
    sequence: u64,

    task: Task,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Min-heap of timers keyed by `(deadline, sequence)`.
#[derive(Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    next_sequence: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, deadline: Instant, task: Task) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        self.heap.push(Reverse(TimerEntry {
            deadline,
            sequence,
            task,
        }));
    }

    /// Removes every timer whose deadline is at or before `now`, returning their tasks in
    /// expiry order.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<Task> {
        let mut due = Vec::new();

        while self
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.deadline <= now)
        {
            let Some(Reverse(entry)) = self.heap.pop() else {
                break;
            };

            due.push(entry.task);
        }

        due
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.deadline)
    }

    pub(crate) fn has_due(&self, now: Instant) -> bool {
        self.next_deadline().is_some_and(|deadline| deadline <= now)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("len", &self.heap.len())
            .field("next_deadline", &self.next_deadline())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    fn recording_task(log: &Rc<RefCell<Vec<u32>>>, value: u32) -> Task {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(value))
    }

    #[test]
    fn pops_only_due_timers_in_deadline_order() {
        let start = Instant::now();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TimerQueue::new();

        queue.push(start + Duration::from_millis(30), recording_task(&log, 3));
        queue.push(start + Duration::from_millis(10), recording_task(&log, 1));
        queue.push(start + Duration::from_millis(20), recording_task(&log, 2));

        let due = queue.pop_due(start + Duration::from_millis(20));
        assert_eq!(due.len(), 2);

        for task in due {
            task();
        }

        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.next_deadline(),
            Some(start + Duration::from_millis(30))
        );
    }

    #[test]
    fn equal_deadlines_expire_in_scheduling_order() {
        let start = Instant::now();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TimerQueue::new();

        for value in 0..5 {
            queue.push(start, recording_task(&log, value));
        }

        for task in queue.pop_due(start) {
            task();
        }

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_queue_has_nothing_due() {
        let queue = TimerQueue::new();

        assert!(!queue.has_due(Instant::now()));
        assert_eq!(queue.next_deadline(), None);
        assert_eq!(queue.len(), 0);
    }
}
