//! Slot bookkeeping shared by the group combinators.
//!
//! Slot `i` belongs to operand `i` for the whole life of the group. Each slot
//! is written once, by its own completion callback.

use crate::types::Settled;

#[derive(Debug)]
pub(crate) struct GroupState<T, E> {
    results: Vec<Option<T>>,
    errors: Vec<Option<E>>,
    settled: usize,
    succeeded: usize,
    failed: usize,
}

impl<T: Clone, E: Clone> GroupState<T, E> {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            results: (0..total).map(|_| None).collect(),
            errors: (0..total).map(|_| None).collect(),
            settled: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Stores the outcome of `slot`. Returns false if the slot was already
    /// written.
    pub(crate) fn record(&mut self, slot: usize, outcome: &Settled<T, E>) -> bool {
        if self.results[slot].is_some() || self.errors[slot].is_some() {
            return false;
        }
        match outcome {
            Settled::Resolved(v) => {
                self.results[slot] = Some(v.clone());
                self.succeeded += 1;
            }
            Settled::Rejected(e) => {
                self.errors[slot] = Some(e.clone());
                self.failed += 1;
            }
        }
        self.settled += 1;
        true
    }

    pub(crate) fn total(&self) -> usize {
        self.results.len()
    }

    pub(crate) const fn settled(&self) -> usize {
        self.settled
    }

    pub(crate) const fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub(crate) const fn failed(&self) -> usize {
        self.failed
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.settled == self.total()
    }

    /// Ordered results; `None` where the slot is pending or rejected.
    pub(crate) fn snapshot(&self) -> Vec<Option<T>> {
        self.results.clone()
    }

    /// Rejection reasons in operand order, skipping slots without one.
    pub(crate) fn errors(&self) -> Vec<E> {
        self.errors.iter().flatten().cloned().collect()
    }

    /// Every result, if every slot resolved.
    pub(crate) fn all_results(&self) -> Option<Vec<T>> {
        self.results.iter().cloned().collect()
    }
}
