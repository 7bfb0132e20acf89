//! Callback-to-promise adapter.
//!
//! Wraps a callable that reports through callbacks, in the old
//! `f(args..., on_success, on_error)` style, and returns a promise.
//!
//! # Callback slots
//!
//! The callable declares an arity: how many positional parameters it takes,
//! callbacks included. The adapter fills them as follows:
//!
//! ```text
//! remaining ← arity - len(args)
//! needed    ← 1 if handles_error == Some(false) else 2
//! while remaining > needed: args.push(None)       (pad)
//! remaining == 0            → error: no success callback
//! success slot
//! another slot left         → error slot, rejects with Reported(e)
//! handles_error == Some(true) → error: missing error callback
//! timeout configured        → timer rejects with TimedOut
//! ```
//!
//! The timer is cancelled as soon as the promise settles by any path. An
//! `Err` returned by the callable and a panic inside it both become
//! rejections; neither reaches the caller.

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::promise::{Deferred, Promise};
use crate::time::Scheduler;
use crate::tracing_compat::{debug, trace, warn};
use crate::types::Payload;

/// Default timeout armed when the callable has no error callback slot.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a deferred call rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeferError<E> {
    /// The callable invoked its error callback.
    #[error("callback reported an error: {0:?}")]
    Reported(E),
    /// The callable returned `Err` synchronously.
    #[error("call failed synchronously: {0:?}")]
    Thrown(E),
    /// The callable panicked.
    #[error("call panicked: {0}")]
    Panicked(String),
    /// Neither callback fired before the timeout.
    #[error("no callback after {0:?}")]
    TimedOut(Duration),
}

impl<E> DeferError<E> {
    /// Returns true for a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// The reason the callable produced, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&E> {
        match self {
            Self::Reported(e) | Self::Thrown(e) => Some(e),
            Self::Panicked(_) | Self::TimedOut(_) => None,
        }
    }
}

/// Success callback handed to the callable. Clone freely; the first
/// settlement wins.
pub struct OnSuccess<T, E> {
    deferred: Deferred<T, DeferError<E>>,
}

/// Error callback handed to the callable.
pub struct OnError<T, E> {
    deferred: Deferred<T, DeferError<E>>,
}

impl<T: Payload, E: Payload> OnSuccess<T, E> {
    /// Resolves the promise with `value`.
    pub fn call(&self, value: T) {
        self.deferred.resolve(value);
    }
}

impl<T: Payload, E: Payload> OnError<T, E> {
    /// Rejects the promise with [`DeferError::Reported`].
    pub fn call(&self, reason: E) {
        self.deferred.reject(DeferError::Reported(reason));
    }
}

impl<T, E> Clone for OnSuccess<T, E> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T, E> Clone for OnError<T, E> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T, E> fmt::Debug for OnSuccess<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnSuccess")
    }
}

impl<T, E> fmt::Debug for OnError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnError")
    }
}

/// The callbacks filled into the callable's trailing slots.
#[derive(Debug, Clone)]
pub struct Callbacks<T, E> {
    /// Always present.
    pub on_success: OnSuccess<T, E>,
    /// Present when the callable declared room for it.
    pub on_error: Option<OnError<T, E>>,
}

type Callable<A, T, E> =
    Box<dyn FnOnce(Vec<Option<A>>, Callbacks<T, E>) -> core::result::Result<(), E> + Send>;

/// Builder for a deferred call.
pub struct Defer<A, T, E> {
    scheduler: Arc<dyn Scheduler>,
    arity: usize,
    args: Vec<A>,
    timeout: Option<Duration>,
    handles_error: Option<bool>,
    callable: Callable<A, T, E>,
}

impl<A, T, E> fmt::Debug for Defer<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer")
            .field("arity", &self.arity)
            .field("args", &self.args.len())
            .field("timeout", &self.timeout)
            .field("handles_error", &self.handles_error)
            .finish_non_exhaustive()
    }
}

impl<A, T, E> Defer<A, T, E>
where
    A: Send + 'static,
    T: Payload,
    E: Payload,
{
    /// Wraps `callable`, which declares `arity` positional parameters.
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, arity: usize, callable: F) -> Self
    where
        F: FnOnce(Vec<Option<A>>, Callbacks<T, E>) -> core::result::Result<(), E> + Send + 'static,
    {
        Self {
            scheduler,
            arity,
            args: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            handles_error: None,
            callable: Box::new(callable),
        }
    }

    /// Appends one leading argument.
    #[must_use]
    pub fn arg(mut self, arg: A) -> Self {
        self.args.push(arg);
        self
    }

    /// Appends leading arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = A>) -> Self {
        self.args.extend(args);
        self
    }

    /// Sets the timeout armed when there is no error callback slot.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables the timeout.
    #[must_use]
    pub fn no_timeout(self) -> Self {
        self.timeout(None)
    }

    /// Declares whether the callable reports errors through a callback.
    ///
    /// `true` makes a missing error slot a construction error; `false`
    /// reserves only a success slot when padding.
    #[must_use]
    pub fn handles_error(mut self, handles: bool) -> Self {
        self.handles_error = Some(handles);
        self
    }

    /// Fills the callback slots and calls the callable.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidArguments`] if no slot is left for the success
    /// callback, [`ErrorKind::MissingErrorCallback`] if `handles_error(true)`
    /// was set and no slot is left for the error callback.
    pub fn start(self) -> Result<Promise<T, DeferError<E>>> {
        let Self {
            scheduler,
            arity,
            args,
            timeout,
            handles_error,
            callable,
        } = self;

        let mut slots: Vec<Option<A>> = args.into_iter().map(Some).collect();
        let mut remaining = arity.saturating_sub(slots.len());
        let needed = if handles_error == Some(false) { 1 } else { 2 };
        while remaining > needed {
            slots.push(None);
            remaining -= 1;
        }

        if remaining == 0 {
            return Err(Error::invalid_arguments(
                "invalid argument list: no success callback",
            ));
        }
        remaining -= 1;

        let deferred: Deferred<T, DeferError<E>> = Deferred::new();
        let on_error = if remaining > 0 {
            Some(OnError {
                deferred: deferred.clone(),
            })
        } else if handles_error == Some(true) {
            return Err(Error::new(ErrorKind::MissingErrorCallback)
                .with_message("invalid argument list: no error callback"));
        } else {
            None
        };

        if on_error.is_none() {
            if let Some(after) = timeout {
                arm_timeout(&scheduler, &deferred, after);
            }
        }

        let callbacks = Callbacks {
            on_success: OnSuccess {
                deferred: deferred.clone(),
            },
            on_error,
        };
        debug!(
            arity,
            padded = slots.len(),
            error_slot = callbacks.on_error.is_some(),
            "calling deferred callable"
        );

        match panic::catch_unwind(AssertUnwindSafe(move || callable(slots, callbacks))) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                trace!("deferred callable failed synchronously");
                deferred.reject(DeferError::Thrown(reason));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "deferred callable panicked");
                deferred.reject(DeferError::Panicked(message));
            }
        }

        Ok(deferred.promise())
    }
}

fn arm_timeout<T: Payload, E: Payload>(
    scheduler: &Arc<dyn Scheduler>,
    deferred: &Deferred<T, DeferError<E>>,
    after: Duration,
) {
    let expiring = deferred.clone();
    let handle = scheduler.schedule(
        after,
        Box::new(move || {
            if expiring.reject(DeferError::TimedOut(after)) {
                debug!(?after, "deferred call timed out");
            }
        }),
    );
    let canceller = Arc::clone(scheduler);
    deferred.promise().on_settle(move |_| {
        if canceller.cancel(handle) {
            trace!(timer = %handle, "timeout disarmed");
        }
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
