//! Event-object-to-promise adapter.
//!
//! Some native APIs are objects that report through named event slots: a
//! loader with `onload`, `onerror` and `onprogress`, say. [`defer_object`]
//! binds a handler to each named slot and returns an [`EventPromise`]:
//!
//! - a success event resolves with the event payload
//! - an error event rejects with [`EventRejection::Event`]
//! - a progress event is published as progress
//!
//! The target stays reachable through the returned value, so the caller can
//! start the operation (`perform`), read properties (`get`) or write them
//! (`set`) after the handlers are in place. A method or property write that
//! fails rejects with [`EventRejection::Fault`].
//!
//! Events raised while `perform` or `set` is inside the target are queued
//! and delivered once the target lock is released, so promise subscribers
//! may read the target from their callbacks.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::promise::{Deferred, Promise};
use crate::tracing_compat::{debug, trace};
use crate::types::Payload;

/// Handler bound to one event slot.
pub type Handler<V> = Arc<dyn Fn(V) + Send + Sync>;

/// An object exposing named event slots, methods and properties.
pub trait EventTarget: Send + 'static {
    /// Payload delivered to every event handler.
    type Event: Payload;
    /// Failure raised by a method call or a property write.
    type Fault: Payload;

    /// Installs `handler` on the slot `event`. `scope` names a sub-object
    /// owning the slot, as for an upload channel's progress events.
    fn bind(&mut self, scope: Option<&str>, event: &str, handler: Handler<Self::Event>);

    /// Calls the method `method` with `args`.
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<(), Self::Fault>;

    /// Reads the property `name`.
    fn property(&self, name: &str) -> Option<Value>;

    /// Writes the property `name`.
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), Self::Fault>;
}

/// Event slot names bound by [`defer_object`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    /// Slots that resolve the promise.
    pub success: Vec<String>,
    /// Slots that reject the promise.
    pub error: Vec<String>,
    /// Slots that publish progress.
    pub progress: Vec<String>,
    /// Sub-object owning the progress slots, if not the target itself.
    pub progress_scope: Option<String>,
}

fn split_names(names: &str) -> Vec<String> {
    names.split_whitespace().map(str::to_owned).collect()
}

impl Default for EventNames {
    fn default() -> Self {
        Self::new("onload", "onerror onabort").progress("onprogress onloadend")
    }
}

impl EventNames {
    /// Space separated success and error slot names. No progress slots.
    #[must_use]
    pub fn new(success: &str, error: &str) -> Self {
        Self {
            success: split_names(success),
            error: split_names(error),
            progress: Vec::new(),
            progress_scope: None,
        }
    }

    /// Sets the space separated progress slot names.
    #[must_use]
    pub fn progress(mut self, progress: &str) -> Self {
        self.progress = split_names(progress);
        self
    }

    /// Routes progress slots to the sub-object `scope`.
    #[must_use]
    pub fn progress_scope(mut self, scope: impl Into<String>) -> Self {
        self.progress_scope = Some(scope.into());
        self
    }
}

/// Why an event-object promise rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventRejection<V, F> {
    /// An error event fired.
    #[error("error event: {0:?}")]
    Event(V),
    /// A method call or property write failed.
    #[error("target fault: {0:?}")]
    Fault(F),
}

type EventDeferred<O> = Deferred<
    <O as EventTarget>::Event,
    EventRejection<<O as EventTarget>::Event, <O as EventTarget>::Fault>,
    <O as EventTarget>::Event,
>;

/// What a bound handler asks of the promise.
#[derive(Debug)]
enum Signal<V> {
    Resolve(V),
    Reject(V),
    Progress(V),
}

#[derive(Debug)]
struct RelayState<V> {
    /// Number of `perform`/`set` calls currently inside the target.
    holds: usize,
    queue: VecDeque<Signal<V>>,
}

/// Carries handler signals to the promise, deferring them while the target
/// is locked by [`EventPromise::perform`] or [`EventPromise::set`].
struct Relay<O: EventTarget> {
    deferred: EventDeferred<O>,
    state: Mutex<RelayState<O::Event>>,
}

impl<O: EventTarget> Relay<O> {
    fn new() -> Self {
        Self {
            deferred: Deferred::new(),
            state: Mutex::new(RelayState {
                holds: 0,
                queue: VecDeque::new(),
            }),
        }
    }

    fn send(&self, signal: Signal<O::Event>) {
        {
            let mut state = self.state.lock();
            state.queue.push_back(signal);
            if state.holds > 0 {
                trace!(queued = state.queue.len(), "event queued until target is released");
                return;
            }
        }
        self.flush();
    }

    fn hold(&self) {
        self.state.lock().holds += 1;
    }

    fn release(&self) {
        {
            let mut state = self.state.lock();
            state.holds = state.holds.saturating_sub(1);
        }
        self.flush();
    }

    fn flush(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.holds > 0 {
                    return;
                }
                state.queue.pop_front()
            };
            match next {
                Some(Signal::Resolve(event)) => {
                    self.deferred.resolve(event);
                }
                Some(Signal::Reject(event)) => {
                    self.deferred.reject(EventRejection::Event(event));
                }
                Some(Signal::Progress(event)) => {
                    self.deferred.notify(event);
                }
                None => return,
            }
        }
    }
}

/// The promise returned by [`defer_object`], with access to its target.
pub struct EventPromise<O: EventTarget> {
    target: Arc<Mutex<O>>,
    relay: Arc<Relay<O>>,
}

impl<O: EventTarget> Clone for EventPromise<O> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            relay: Arc::clone(&self.relay),
        }
    }
}

impl<O: EventTarget> core::fmt::Debug for EventPromise<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventPromise")
            .field("promise", &self.relay.deferred.promise())
            .finish_non_exhaustive()
    }
}

fn bind_all<O, F>(target: &mut O, scope: Option<&str>, names: &[String], relay: &Arc<Relay<O>>, signal: F)
where
    O: EventTarget,
    F: Fn(O::Event) -> Signal<O::Event> + Copy + Send + Sync + 'static,
{
    for name in names {
        let relay = Arc::clone(relay);
        target.bind(scope, name, Arc::new(move |event: O::Event| relay.send(signal(event))));
    }
}

/// Binds `names` on `target` and returns the resulting promise.
pub fn defer_object<O: EventTarget>(mut target: O, names: &EventNames) -> EventPromise<O> {
    let relay = Arc::new(Relay::new());

    bind_all(&mut target, None, &names.success, &relay, Signal::Resolve);
    bind_all(&mut target, None, &names.error, &relay, Signal::Reject);
    bind_all(
        &mut target,
        names.progress_scope.as_deref(),
        &names.progress,
        &relay,
        Signal::Progress,
    );
    debug!(
        success = names.success.len(),
        error = names.error.len(),
        progress = names.progress.len(),
        "event object bound"
    );

    EventPromise {
        target: Arc::new(Mutex::new(target)),
        relay,
    }
}

impl<O: EventTarget> EventPromise<O> {
    /// Shared handle to the target.
    ///
    /// Events the target raises while a caller holds this lock reach the
    /// promise immediately, inside that lock.
    #[must_use]
    pub fn target(&self) -> Arc<Mutex<O>> {
        Arc::clone(&self.target)
    }

    /// Calls each named method in order. The first failure rejects the
    /// promise and skips the remaining calls.
    pub fn perform<S, I>(&self, calls: I) -> &Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, Vec<Value>)>,
    {
        self.relay.hold();
        let failure = {
            let mut target = self.target.lock();
            calls.into_iter().find_map(|(method, args)| {
                trace!(method = method.as_ref(), "invoking target method");
                target.invoke(method.as_ref(), &args).err()
            })
        };
        self.relay.release();
        if let Some(fault) = failure {
            self.relay.deferred.reject(EventRejection::Fault(fault));
        }
        self
    }

    /// Reads a property of the target.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.target.lock().property(name)
    }

    /// Writes each property in order. The first failure rejects the promise
    /// and skips the remaining writes.
    pub fn set<S, I>(&self, properties: I) -> &Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, Value)>,
    {
        self.relay.hold();
        let failure = {
            let mut target = self.target.lock();
            properties
                .into_iter()
                .find_map(|(name, value)| target.set_property(name.as_ref(), value).err())
        };
        self.relay.release();
        if let Some(fault) = failure {
            self.relay.deferred.reject(EventRejection::Fault(fault));
        }
        self
    }

    /// Returns the promise.
    #[must_use]
    pub fn promise(&self) -> Promise<O::Event, EventRejection<O::Event, O::Fault>, O::Event> {
        self.relay.deferred.promise()
    }
}
