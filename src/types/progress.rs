//! Progress snapshots emitted by multi-step combinators.
//!
//! A [`Progress`] value is informational only. It never gates completion and
//! may be emitted zero or more times before the final settlement.

use core::fmt;
use serde::{Deserialize, Serialize};

/// An immutable progress snapshot.
///
/// `snapshot` carries the combinator-specific payload: the current step
/// result for a pipe, the ordered slot results for a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress<S> {
    /// Percentage complete in `0.0..=100.0`.
    pub percent: f64,
    /// Number of completed units.
    pub done: usize,
    /// Total number of units.
    pub total: usize,
    /// Combinator-specific payload.
    pub snapshot: S,
}

impl<S> Progress<S> {
    /// Creates a snapshot for `done` of `total` units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(done: usize, total: usize, snapshot: S) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            100.0 * done as f64 / total as f64
        };
        Self {
            percent,
            done,
            total,
            snapshot,
        }
    }

    /// Returns true when every unit has completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.done >= self.total
    }

    /// Short `done/total` label.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}/{}", self.done, self.total)
    }

    /// Maps the payload, keeping the counters.
    pub fn map<U, F: FnOnce(S) -> U>(self, f: F) -> Progress<U> {
        Progress {
            percent: self.percent,
            done: self.done,
            total: self.total,
            snapshot: f(self.snapshot),
        }
    }
}

impl<S> fmt::Display for Progress<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}% ({}/{})", self.percent, self.done, self.total)
    }
}
