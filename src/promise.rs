//! Single-assignment promise with a progress side channel.
//!
//! A [`Deferred`] is the writer half and a [`Promise`] the reader half of
//! the same shared cell. The cell moves from `Pending` to exactly one of
//! `Resolved(T)` or `Rejected(E)` and never changes again.
//!
//! # Semantics
//!
//! - `resolve`/`reject` are single-assignment: the first call wins, later
//!   calls return `false` and change nothing.
//! - `notify` publishes a progress value of type `P` while pending. It may be
//!   called any number of times; after settlement it is ignored.
//! - Subscriptions registered after settlement are invoked immediately with
//!   the settled value (replay). A progress subscriber registered after a
//!   notification immediately receives the most recent one.
//! - Callbacks run with no internal lock held, so a callback may freely
//!   subscribe to, settle or notify any promise, including its own.
//!
//! [`Promise`] also implements [`Future`] with `Output = Result<T, E>`, so it
//! can be awaited from any executor.
//!
//! # Example
//!
//! ```
//! use flowq::{Deferred, PromiseState};
//!
//! let deferred: Deferred<u32, String> = Deferred::new();
//! let promise = deferred.promise();
//!
//! promise.on_success(|v| assert_eq!(v, 7));
//! assert!(deferred.resolve(7));
//! assert!(!deferred.reject("late".into()));
//! assert_eq!(promise.state(), PromiseState::Resolved);
//! ```

use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::types::{Payload, PromiseState, Settled};

type SettleCallback<T, E> = Box<dyn FnOnce(&Settled<T, E>) + Send>;
type ProgressCallback<P> = Arc<dyn Fn(&P) + Send + Sync>;

struct Inner<T, E, P> {
    settled: Option<Settled<T, E>>,
    on_settle: Vec<SettleCallback<T, E>>,
    on_progress: Vec<ProgressCallback<P>>,
    last_progress: Option<P>,
    wakers: Vec<Waker>,
}

impl<T, E, P> Inner<T, E, P> {
    const fn new() -> Self {
        Self {
            settled: None,
            on_settle: Vec::new(),
            on_progress: Vec::new(),
            last_progress: None,
            wakers: Vec::new(),
        }
    }
}

type Shared<T, E, P> = Arc<Mutex<Inner<T, E, P>>>;

/// Writer half of a promise.
///
/// Cloning a `Deferred` yields another writer for the same cell.
pub struct Deferred<T, E, P = ()> {
    shared: Shared<T, E, P>,
}

/// Reader half of a promise.
///
/// Cloning a `Promise` is cheap and every clone observes the same outcome.
pub struct Promise<T, E, P = ()> {
    shared: Shared<T, E, P>,
}

impl<T, E, P> Clone for Deferred<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E, P> Clone for Promise<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Payload, E: Payload, P: Payload> Default for Deferred<T, E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, E: Payload, P: Payload> Deferred<T, E, P> {
    /// Creates a new pending cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Inner::new())),
        }
    }

    /// Returns the reader half.
    #[must_use]
    pub fn promise(&self) -> Promise<T, E, P> {
        Promise {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolves with `value`. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Settled::Resolved(value))
    }

    /// Rejects with `reason`. Returns `false` if already settled.
    pub fn reject(&self, reason: E) -> bool {
        self.settle(Settled::Rejected(reason))
    }

    /// Settles with the given outcome. Returns `false` if already settled.
    pub fn settle(&self, outcome: Settled<T, E>) -> bool {
        let (callbacks, wakers) = {
            let mut inner = self.shared.lock();
            if inner.settled.is_some() {
                return false;
            }
            inner.settled = Some(outcome.clone());
            inner.on_progress.clear();
            (
                std::mem::take(&mut inner.on_settle),
                std::mem::take(&mut inner.wakers),
            )
        };

        for callback in callbacks {
            callback(&outcome);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Publishes a progress value. Returns `false` if already settled.
    pub fn notify(&self, progress: P) -> bool {
        let callbacks = {
            let mut inner = self.shared.lock();
            if inner.settled.is_some() {
                return false;
            }
            inner.last_progress = Some(progress.clone());
            inner.on_progress.clone()
        };

        for callback in &callbacks {
            callback(&progress);
        }
        true
    }

    /// Returns true once resolve or reject has succeeded.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.lock().settled.is_some()
    }

    /// Mirrors `source` into this cell: its progress and its outcome.
    pub fn follow<Q: Payload>(&self, source: &Promise<T, E, Q>)
    where
        P: From<Q>,
    {
        let progress = self.clone();
        source.on_progress(move |p: &Q| {
            progress.notify(P::from(p.clone()));
        });
        let settle = self.clone();
        source.on_settle(move |outcome| {
            settle.settle(outcome.clone());
        });
    }
}

impl<T: Payload, E: Payload, P: Payload> Promise<T, E, P> {
    /// A promise already resolved with `value`.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::from_settled(Settled::Resolved(value))
    }

    /// A promise already rejected with `reason`.
    #[must_use]
    pub fn rejected(reason: E) -> Self {
        Self::from_settled(Settled::Rejected(reason))
    }

    /// A promise that never settles.
    #[must_use]
    pub fn pending() -> Self {
        Deferred::new().promise()
    }

    /// A promise already in the given terminal state.
    #[must_use]
    pub fn from_settled(outcome: Settled<T, E>) -> Self {
        let mut inner = Inner::new();
        inner.settled = Some(outcome);
        Self {
            shared: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PromiseState {
        self.shared
            .lock()
            .settled
            .as_ref()
            .map_or(PromiseState::Pending, Settled::state)
    }

    /// Returns a copy of the outcome, if settled.
    #[must_use]
    pub fn settled(&self) -> Option<Settled<T, E>> {
        self.shared.lock().settled.clone()
    }

    /// Returns the most recent progress value, if any was published.
    #[must_use]
    pub fn last_progress(&self) -> Option<P> {
        self.shared.lock().last_progress.clone()
    }

    /// Returns true if both handles observe the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Runs `f` once with the outcome. Runs immediately if already settled.
    pub fn on_settle<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Settled<T, E>) + Send + 'static,
    {
        let settled = {
            let mut inner = self.shared.lock();
            match &inner.settled {
                Some(outcome) => outcome.clone(),
                None => {
                    inner.on_settle.push(Box::new(f));
                    return self;
                }
            }
        };
        f(&settled);
        self
    }

    /// Runs `f` with the value if (or once) the promise resolves.
    pub fn on_success<F>(&self, f: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_settle(move |outcome| {
            if let Settled::Resolved(v) = outcome {
                f(v.clone());
            }
        })
    }

    /// Runs `f` with the reason if (or once) the promise rejects.
    pub fn on_failure<F>(&self, f: F) -> &Self
    where
        F: FnOnce(E) + Send + 'static,
    {
        self.on_settle(move |outcome| {
            if let Settled::Rejected(e) = outcome {
                f(e.clone());
            }
        })
    }

    /// Runs `f` for every progress value published while pending.
    ///
    /// If a notification was already published, `f` receives the most recent
    /// one immediately.
    pub fn on_progress<F>(&self, f: F) -> &Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let callback: ProgressCallback<P> = Arc::new(f);
        let replay = {
            let mut inner = self.shared.lock();
            if inner.settled.is_none() {
                inner.on_progress.push(Arc::clone(&callback));
            }
            inner.last_progress.clone()
        };
        if let Some(progress) = replay {
            callback(&progress);
        }
        self
    }

    /// Derives a new promise by mapping this one's outcome and progress.
    pub fn transform<U, F2, Q, S, G>(&self, on_settle: S, on_progress: G) -> Promise<U, F2, Q>
    where
        U: Payload,
        F2: Payload,
        Q: Payload,
        S: FnOnce(Settled<T, E>) -> Settled<U, F2> + Send + 'static,
        G: Fn(&P) -> Option<Q> + Send + Sync + 'static,
    {
        let derived = Deferred::new();
        let notifier = derived.clone();
        self.on_progress(move |p| {
            if let Some(q) = on_progress(p) {
                notifier.notify(q);
            }
        });
        let settler = derived.clone();
        self.on_settle(move |outcome| {
            settler.settle(on_settle(outcome.clone()));
        });
        derived.promise()
    }

    /// Maps the success value, forwarding progress unchanged.
    pub fn map<U, F>(&self, f: F) -> Promise<U, E, P>
    where
        U: Payload,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.transform(move |s| s.map(f), |p| Some(p.clone()))
    }

    /// Maps the rejection reason, forwarding progress unchanged.
    pub fn map_err<F2, F>(&self, f: F) -> Promise<T, F2, P>
    where
        F2: Payload,
        F: FnOnce(E) -> F2 + Send + 'static,
    {
        self.transform(move |s| s.map_err(f), |p| Some(p.clone()))
    }

    /// Swaps success and failure, forwarding progress unchanged.
    #[must_use]
    pub fn inverted(&self) -> Promise<E, T, P> {
        self.transform(Settled::swap, |p| Some(p.clone()))
    }

    /// Maps progress values, keeping the outcome.
    pub fn map_progress<Q, G>(&self, f: G) -> Promise<T, E, Q>
    where
        Q: Payload,
        G: Fn(&P) -> Q + Send + Sync + 'static,
    {
        self.transform(|s| s, move |p| Some(f(p)))
    }

    /// Drops the progress channel, keeping the outcome.
    #[must_use]
    pub fn discard_progress(&self) -> Promise<T, E> {
        self.transform(|s| s, |_| None)
    }
}

impl<T: Payload, E: Payload, P: Payload> Future for Promise<T, E, P> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.shared.lock();
        if let Some(outcome) = &inner.settled {
            return Poll::Ready(outcome.clone().into_result());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T, E, P> fmt::Debug for Promise<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        let state = inner
            .settled
            .as_ref()
            .map_or(PromiseState::Pending, Settled::state);
        f.debug_struct("Promise")
            .field("state", &state)
            .field("subscribers", &inner.on_settle.len())
            .finish()
    }
}

impl<T, E, P> fmt::Debug for Deferred<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settled = self.shared.lock().settled.is_some();
        f.debug_struct("Deferred").field("settled", &settled).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn resolve_is_single_assignment() {
        init_test("resolve_is_single_assignment");
        let d: Deferred<i32, &str> = Deferred::new();
        assert!(d.resolve(1));
        assert!(!d.resolve(2));
        assert!(!d.reject("no"));
        assert_eq!(d.promise().settled(), Some(Settled::Resolved(1)));
        crate::test_complete!("resolve_is_single_assignment");
    }

    #[test]
    fn subscribers_run_once_in_registration_order() {
        init_test("subscribers_run_once_in_registration_order");
        let d: Deferred<i32, ()> = Deferred::new();
        let p = d.promise();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = Arc::clone(&log);
        let l2 = Arc::clone(&log);
        p.on_success(move |v| l1.lock().push(("first", v)))
            .on_success(move |v| l2.lock().push(("second", v)));

        d.resolve(5);
        d.resolve(6);
        assert_eq!(*log.lock(), vec![("first", 5), ("second", 5)]);
        crate::test_complete!("subscribers_run_once_in_registration_order");
    }

    #[test]
    fn late_subscribers_get_replay() {
        init_test("late_subscribers_get_replay");
        let p: Promise<i32, &str> = Promise::rejected("boom");
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        p.on_failure(move |e| *s.lock() = Some(e));
        assert_eq!(*seen.lock(), Some("boom"));

        let hit = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hit);
        p.on_success(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hit.load(Ordering::SeqCst), 0);
        crate::test_complete!("late_subscribers_get_replay");
    }

    #[test]
    fn progress_replays_latest_and_stops_after_settle() {
        init_test("progress_replays_latest_and_stops_after_settle");
        let d: Deferred<(), (), u32> = Deferred::new();
        let p = d.promise();
        assert!(d.notify(1));
        assert!(d.notify(2));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        p.on_progress(move |v| s.lock().push(*v));
        assert!(d.notify(3));
        d.resolve(());
        assert!(!d.notify(4));

        assert_eq!(*seen.lock(), vec![2, 3]);
        assert_eq!(p.last_progress(), Some(3));
        crate::test_complete!("progress_replays_latest_and_stops_after_settle");
    }

    #[test]
    fn callbacks_may_reenter() {
        init_test("callbacks_may_reenter");
        let d: Deferred<i32, ()> = Deferred::new();
        let p = d.promise();
        let inner = p.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        p.on_success(move |_| {
            let s = Arc::clone(&s);
            inner.on_success(move |v| {
                s.store(v as usize, Ordering::SeqCst);
            });
        });
        d.resolve(9);
        assert_eq!(seen.load(Ordering::SeqCst), 9);
        crate::test_complete!("callbacks_may_reenter");
    }

    #[test]
    fn inverted_swaps_polarity() {
        init_test("inverted_swaps_polarity");
        let p: Promise<i32, String> = Promise::resolved(3);
        assert_eq!(p.inverted().settled(), Some(Settled::Rejected(3)));
        assert_eq!(p.inverted().inverted().settled(), Some(Settled::Resolved(3)));
        crate::test_complete!("inverted_swaps_polarity");
    }

    #[test]
    fn transform_maps_progress_and_outcome() {
        init_test("transform_maps_progress_and_outcome");
        let d: Deferred<i32, i32, i32> = Deferred::new();
        let mapped = d.promise().map(|v| v * 2).map_progress(|p| p + 100);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        mapped.on_progress(move |p| s.lock().push(*p));
        d.notify(1);
        d.resolve(21);
        assert_eq!(*seen.lock(), vec![101]);
        assert_eq!(mapped.settled(), Some(Settled::Resolved(42)));
        crate::test_complete!("transform_maps_progress_and_outcome");
    }

    #[test]
    fn follow_mirrors_source() {
        init_test("follow_mirrors_source");
        let source: Deferred<i32, (), u8> = Deferred::new();
        let mirror: Deferred<i32, (), u8> = Deferred::new();
        mirror.follow(&source.promise());
        source.notify(4);
        source.resolve(8);
        assert_eq!(mirror.promise().last_progress(), Some(4));
        assert_eq!(mirror.promise().settled(), Some(Settled::Resolved(8)));
        crate::test_complete!("follow_mirrors_source");
    }

    #[test]
    fn promise_is_a_future() {
        init_test("promise_is_a_future");
        let d: Deferred<&str, ()> = Deferred::new();
        let p = d.promise();
        d.resolve("done");
        let out = futures_lite::future::block_on(p);
        assert_eq!(out, Ok("done"));
        crate::test_complete!("promise_is_a_future");
    }

    #[test]
    fn pending_debug_output() {
        init_test("pending_debug_output");
        let p: Promise<(), ()> = Promise::pending();
        assert_eq!(p.state(), PromiseState::Pending);
        let text = format!("{p:?}");
        assert!(text.contains("Pending"), "{text}");
        crate::test_complete!("pending_debug_output");
    }
}
