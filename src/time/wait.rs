//! Delay primitive: a promise that resolves after a duration.

use std::sync::Arc;
use std::time::Duration;

use crate::promise::{Deferred, Promise};
use crate::time::{Scheduler, TimerHandle};
use crate::tracing_compat::trace;
use crate::types::Payload;

/// A pending delay created by [`wait`].
///
/// The promise resolves with the configured value once the scheduler runs
/// the timer. [`Delay::cancel`] withdraws the timer; the promise then stays
/// pending forever.
#[derive(Debug, Clone)]
pub struct Delay<T, E> {
    promise: Promise<T, E>,
    handle: TimerHandle,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: Payload, E: Payload> Delay<T, E> {
    /// Returns the delayed promise.
    #[must_use]
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }

    /// Consumes the handle, returning the promise.
    #[must_use]
    pub fn into_promise(self) -> Promise<T, E> {
        self.promise
    }

    /// Returns the underlying timer handle.
    #[must_use]
    pub const fn handle(&self) -> TimerHandle {
        self.handle
    }

    /// Cancels the timer. Returns `false` if it already fired.
    pub fn cancel(&self) -> bool {
        let cancelled = self.scheduler.cancel(self.handle);
        trace!(timer = %self.handle, cancelled, "wait cancelled");
        cancelled
    }
}

/// Resolves with `value` after `duration`.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use flowq::lab::LabScheduler;
/// use flowq::time::wait;
///
/// let lab = Arc::new(LabScheduler::default());
/// let delay = wait::<_, ()>(lab.clone(), Duration::from_millis(200), "tick");
/// lab.advance_by(Duration::from_millis(199));
/// assert!(delay.promise().settled().is_none());
/// lab.advance_by(Duration::from_millis(1));
/// assert_eq!(delay.promise().settled().map(|s| s.into_result()), Some(Ok("tick")));
/// ```
pub fn wait<T: Payload, E: Payload>(
    scheduler: Arc<dyn Scheduler>,
    duration: Duration,
    value: T,
) -> Delay<T, E> {
    let deferred = Deferred::new();
    let promise = deferred.promise();
    let handle = scheduler.schedule(
        duration,
        Box::new(move || {
            deferred.resolve(value);
        }),
    );
    trace!(
        timer = %handle,
        delay_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        "wait scheduled"
    );
    Delay {
        promise,
        handle,
        scheduler,
    }
}
