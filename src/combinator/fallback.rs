//! Default-value modifier: a promise that always resolves.
//!
//! `fallback` starts the wrapped operand immediately but only looks at its
//! outcome one scheduler tick later. That window lets the caller attach a
//! fallback value with [`Fallback::or`] after construction:
//!
//! ```text
//! let f = fallback(&sched, risky, tick);
//! f.or(default);             // any time before the outcome is committed
//!
//! risky ok(v)   ─▶ resolve(v)
//! risky err(_)  ─▶ resolve(default)      (or T::default() if none was set)
//! ```
//!
//! The result never rejects and carries no progress.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::operand::Operand;
use crate::promise::{Deferred, Promise};
use crate::time::Scheduler;
use crate::tracing_compat::{debug, trace};
use crate::types::{Payload, Settled};

#[derive(Debug)]
struct FallbackCell<T> {
    value: T,
    committed: bool,
}

/// A promise that resolves with the wrapped outcome or a fallback value.
#[derive(Debug, Clone)]
pub struct Fallback<T, E> {
    cell: Arc<Mutex<FallbackCell<T>>>,
    promise: Promise<T, E>,
}

/// Wraps `operand` so that a rejection resolves with a fallback value.
///
/// The operand is invoked now, without a flow value. Its outcome is
/// committed `tick` later; until then [`Fallback::or`] may set the value
/// used on rejection.
pub fn fallback<T, E, P>(scheduler: &dyn Scheduler, operand: Operand<T, E, P>, tick: Duration) -> Fallback<T, E>
where
    T: Payload + Default,
    E: Payload,
    P: Payload,
{
    fallback_or(scheduler, operand, tick, T::default())
}

/// [`fallback`] with the fallback value configured up front.
pub fn fallback_or<T, E, P>(
    scheduler: &dyn Scheduler,
    operand: Operand<T, E, P>,
    tick: Duration,
    value: T,
) -> Fallback<T, E>
where
    T: Payload,
    E: Payload,
    P: Payload,
{
    let source = operand.invoke(None);
    let cell = Arc::new(Mutex::new(FallbackCell {
        value,
        committed: false,
    }));
    let deferred: Deferred<T, E> = Deferred::new();

    let commit_cell = Arc::clone(&cell);
    let settler = deferred.clone();
    let handle = scheduler.schedule(
        tick,
        Box::new(move || {
            source.on_settle(move |outcome| {
                let value = {
                    let mut cell = commit_cell.lock();
                    cell.committed = true;
                    match outcome {
                        Settled::Resolved(v) => v.clone(),
                        Settled::Rejected(_) => cell.value.clone(),
                    }
                };
                trace!(
                    combinator = "fallback",
                    rejected = outcome.is_rejected(),
                    "committing outcome"
                );
                settler.resolve(value);
            });
        }),
    );
    debug!(combinator = "fallback", %handle, "outcome scheduled");

    Fallback {
        cell,
        promise: deferred.promise(),
    }
}

impl<T: Payload, E: Payload> Fallback<T, E> {
    /// Sets the value used if the wrapped operand rejects.
    ///
    /// Ignored once the outcome has been committed.
    pub fn or(&self, value: T) -> &Self {
        let mut cell = self.cell.lock();
        if cell.committed {
            trace!(combinator = "fallback", "fallback set after commit, ignored");
        } else {
            cell.value = value;
        }
        self
    }

    /// Returns true once the outcome has been committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.cell.lock().committed
    }

    /// Returns the promise.
    #[must_use]
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }
}

impl<T: Payload, E: Payload, I> From<Fallback<T, E>> for Operand<T, E, (), I> {
    fn from(fallback: Fallback<T, E>) -> Self {
        Self::Ready(fallback.promise)
    }
}
