//! Virtual-time queue backing the lab scheduler.
//!
//! Entries are keyed by `(deadline, sequence)` in an ordered map, so the
//! queue never reads a clock and always yields entries in the same order:
//! earliest deadline first, scheduling order within a deadline. Time moves
//! only when the caller advances it.
//!
//! ```
//! use flowq::lab::TimerQueue;
//!
//! let mut queue = TimerQueue::new();
//! queue.push(100, "late");
//! queue.push(50, "early");
//!
//! let due = queue.advance_to(75);
//! assert_eq!(due.len(), 1);
//! assert_eq!(due[0].payload, "early");
//! assert_eq!(queue.now(), 75);
//!
//! assert_eq!(queue.pop_due(u64::MAX).map(|d| d.payload), Some("late"));
//! ```

use std::collections::BTreeMap;

/// Position of an entry in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey {
    /// Tick at which the entry falls due.
    pub deadline: u64,
    /// Scheduling sequence number, unique per queue.
    pub seq: u64,
}

/// An entry taken off the queue because it fell due.
#[derive(Debug)]
pub struct Due<P> {
    /// Where the entry sat in the queue.
    pub key: QueueKey,
    /// The stored payload.
    pub payload: P,
}

/// Deterministic virtual-time queue of payloads.
#[derive(Debug)]
pub struct TimerQueue<P> {
    entries: BTreeMap<QueueKey, P>,
    now: u64,
    next_seq: u64,
}

impl<P> Default for TimerQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TimerQueue<P> {
    /// Creates an empty queue at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an empty queue at `tick`.
    #[must_use]
    pub fn starting_at(tick: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            now: tick,
            next_seq: 0,
        }
    }

    /// Current virtual tick.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queues `payload` at `deadline`. A deadline in the past becomes now.
    pub fn push(&mut self, deadline: u64, payload: P) -> QueueKey {
        let key = QueueKey {
            deadline: deadline.max(self.now),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, payload);
        key
    }

    /// Drops the entry at `key`. Returns `false` if it already fell due or
    /// was already removed.
    pub fn remove(&mut self, key: QueueKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Deadline of the earliest entry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.keys().next().map(|key| key.deadline)
    }

    /// Takes the earliest entry due at or before `limit`, moving the
    /// current tick up to its deadline.
    pub fn pop_due(&mut self, limit: u64) -> Option<Due<P>> {
        if self.next_deadline()? > limit {
            return None;
        }
        let (key, payload) = self.entries.pop_first()?;
        self.now = self.now.max(key.deadline);
        Some(Due { key, payload })
    }

    /// Takes every entry due at or before `target` and moves the tick to
    /// `target`. Time never moves backwards.
    pub fn advance_to(&mut self, target: u64) -> Vec<Due<P>> {
        let target = target.max(self.now);
        let due = std::iter::from_fn(|| self.pop_due(target)).collect();
        self.now = target;
        due
    }
}
