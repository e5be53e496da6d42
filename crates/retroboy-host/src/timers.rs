use retroboy_sync::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Deadline {
    at: Instant,
    seq: u64,
    timer: StepTimer,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal deadlines fire in arming order
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Step timers for a thread that sleeps until the earliest deadline.
///
/// Timers are never cancelled here; the controller discards the stale ones
/// when they fire.
#[derive(Debug, Default)]
pub struct DeadlineTimers {
    heap: BinaryHeap<Reverse<Deadline>>,
    next_seq: u64,
}

impl DeadlineTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_at(&mut self, now: Instant, delay: Duration, timer: StepTimer) {
        let deadline = Deadline {
            at: now + delay,
            seq: self.next_seq,
            timer,
        };
        self.next_seq += 1;
        self.heap.push(Reverse(deadline));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(d)| d.at)
    }

    /// Remove and return the earliest timer whose deadline is not after `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<StepTimer> {
        match self.heap.peek() {
            Some(Reverse(d)) if d.at <= now => self.heap.pop().map(|Reverse(d)| d.timer),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl StepTimers for DeadlineTimers {
    fn arm(&mut self, delay: Duration, timer: StepTimer) {
        self.arm_at(Instant::now(), delay, timer);
    }
}
