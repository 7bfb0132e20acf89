//! Deterministic virtual-time implementation of [`Scheduler`].
//!
//! Tasks are stored in a [`TimerQueue`] keyed by nanosecond deadline.
//! Nothing runs until the test (or embedding host) drives the scheduler:
//!
//! - [`LabScheduler::run_ready`] runs tasks due now without moving time
//! - [`LabScheduler::advance_by`] moves time forward, running what falls due
//! - [`LabScheduler::run_until_idle`] keeps jumping to the next deadline
//!   until no task is left
//!
//! Tasks always run with the queue unlocked, so a task may schedule or cancel
//! further tasks. Tasks are popped one at a time: a task cancelled by an
//! earlier task at the same deadline never runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::config::{LabConfig, StepLimit};
use super::timer_queue::{QueueKey, TimerQueue};
use crate::time::{Scheduler, Task, TimerHandle};
use crate::tracing_compat::{trace, warn};

fn to_ticks(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Virtual-time scheduler for tests and deterministic embedding.
pub struct LabScheduler {
    queue: Mutex<TimerQueue<Task>>,
    config: LabConfig,
    steps: AtomicU64,
}

impl Default for LabScheduler {
    fn default() -> Self {
        Self::new(LabConfig::default())
    }
}

impl core::fmt::Debug for LabScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("LabScheduler")
            .field("now", &Duration::from_nanos(queue.now()))
            .field("pending", &queue.len())
            .field("steps", &self.steps.load(Ordering::Relaxed))
            .finish()
    }
}

impl LabScheduler {
    /// Creates a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: LabConfig) -> Self {
        Self {
            queue: Mutex::new(TimerQueue::starting_at(to_ticks(config.start))),
            config,
            steps: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true when no task is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Total number of tasks run so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Runs every task due at the current time. Returns the number run.
    pub fn run_ready(&self) -> usize {
        self.advance_by(Duration::ZERO)
    }

    /// Advances virtual time by `by`, running every task that falls due, in
    /// deadline order. Returns the number of tasks run.
    pub fn advance_by(&self, by: Duration) -> usize {
        let target = self.queue.lock().now().saturating_add(to_ticks(by));
        let ran = self.drain(target);
        self.queue.lock().advance_to(target);
        ran
    }

    /// Runs tasks, jumping virtual time forward to each next deadline, until
    /// none remain. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        self.drain(u64::MAX)
    }

    fn drain(&self, target: u64) -> usize {
        let mut ran = 0_usize;
        loop {
            if let Some(limit) = self.config.max_steps {
                if ran as u64 >= limit {
                    warn!(limit, "lab scheduler step limit reached");
                    match self.config.on_step_limit {
                        StepLimit::Panic => panic!("lab scheduler exceeded {limit} steps"),
                        StepLimit::Stop => return ran,
                    }
                }
            }

            let Some(due) = self.queue.lock().pop_due(target) else {
                return ran;
            };
            trace!(seq = due.key.seq, at_ns = due.key.deadline, "lab task run");
            (due.payload)();
            self.steps.fetch_add(1, Ordering::Relaxed);
            ran += 1;
        }
    }
}

impl Scheduler for LabScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut queue = self.queue.lock();
        let deadline = queue.now().saturating_add(to_ticks(delay));
        let key = queue.push(deadline, task);
        TimerHandle::new(key.seq, Duration::from_nanos(key.deadline))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.queue.lock().remove(QueueKey {
            deadline: to_ticks(handle.deadline()),
            seq: handle.id(),
        })
    }

    fn now(&self) -> Duration {
        Duration::from_nanos(self.queue.lock().now())
    }
}
