//! The "run later" seam between combinators and their host.
//!
//! Combinators never block and never spawn threads. Whenever something must
//! happen after a delay (a [`wait`](super::wait()) timer, the fallback
//! observation tick, the callback adapter's timeout) they hand a task to a
//! [`Scheduler`]. The host decides how time passes: the
//! [`LabScheduler`](crate::lab::LabScheduler) advances virtual time on
//! demand, an embedding event loop would map it onto its own timers.

use core::fmt;
use std::time::Duration;

/// A unit of work queued on a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// Handle for a scheduled task, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    id: u64,
    deadline: Duration,
}

impl TimerHandle {
    /// Creates a handle. Schedulers mint these; callers only pass them back.
    #[must_use]
    pub const fn new(id: u64, deadline: Duration) -> Self {
        Self { id, deadline }
    }

    /// Returns the scheduler-assigned id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the time at which the task is due.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}@{:?}", self.id, self.deadline)
    }
}

/// Cooperative "run later" primitive.
///
/// Implementations must run each task at most once, never before its
/// deadline, and never while holding a lock the task could need. Tasks
/// scheduled with the same deadline run in scheduling order.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Queues `task` to run after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Cancels a queued task. Returns `false` if it already ran or was
    /// already cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;

    /// Current time as seen by this scheduler.
    fn now(&self) -> Duration;
}
