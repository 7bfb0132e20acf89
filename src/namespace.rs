//! The `Q` namespace object.
//!
//! [`Q`] bundles the two things every time-aware combinator needs, a
//! [`Scheduler`] and a [`FlowConfig`], and exposes the whole combinator set
//! as methods. It is built once and never changes afterwards; clones share
//! the same scheduler and configuration.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use flowq::combinator::Operand;
//! use flowq::lab::LabScheduler;
//! use flowq::Q;
//!
//! let lab = Arc::new(LabScheduler::default());
//! let q = Q::with_defaults(lab.clone());
//!
//! let flights = q.wait::<_, ()>(Duration::from_millis(20), "LH 400");
//! let hotels = q.wait::<_, ()>(Duration::from_millis(10), "Hilton");
//! let trip = q.all_of(vec![Operand::from(flights), Operand::from(hotels)]).expect("non-empty");
//!
//! lab.run_until_idle();
//! assert_eq!(
//!     trip.settled().map(|s| s.into_result()),
//!     Some(Ok(vec!["LH 400", "Hilton"]))
//! );
//! ```

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::adapter::{defer_object, Callbacks, Defer, EventNames, EventPromise, EventTarget};
use crate::combinator::registry::{self, error_value};
use crate::combinator::{
    self, Arg, DynOperand, DynPromise, Fallback, KeyedSlots, Operand, Operator, Slots,
};
use crate::config::FlowConfig;
use crate::error::{Result, ResultExt};
use crate::promise::Promise;
use crate::time::{wait, Delay, Scheduler};
use crate::tracing_compat::{debug, info};
use crate::types::{Flow, Payload, Progress};

/// The namespace object: scheduler, configuration and every combinator.
#[derive(Debug, Clone)]
pub struct Q {
    scheduler: Arc<dyn Scheduler>,
    config: Arc<FlowConfig>,
}

impl Q {
    /// Builds the namespace over `scheduler` with `config`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidConfig`](crate::ErrorKind::InvalidConfig) if the
    /// configuration fails validation.
    pub fn new(scheduler: Arc<dyn Scheduler>, config: FlowConfig) -> Result<Self> {
        config.validate()?;
        info!(
            defer_timeout = ?config.defer_timeout,
            fallback_tick = ?config.fallback_tick,
            "namespace ready"
        );
        Ok(Self {
            scheduler,
            config: Arc::new(config),
        })
    }

    /// Builds the namespace with the default configuration.
    #[must_use]
    pub fn with_defaults(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            config: Arc::new(FlowConfig::default()),
        }
    }

    /// The scheduler shared by every combinator built here.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// A promise resolving with `value` after `duration`.
    pub fn wait<T: Payload, E: Payload>(&self, duration: Duration, value: T) -> Delay<T, E> {
        wait(Arc::clone(&self.scheduler), duration, value)
    }

    /// Wraps `operand` so a rejection resolves with a fallback value, set
    /// later through [`Fallback::or`].
    pub fn fallback<T, E, P>(&self, operand: Operand<T, E, P>) -> Fallback<T, E>
    where
        T: Payload + Default,
        E: Payload,
        P: Payload,
    {
        combinator::fallback(self.scheduler.as_ref(), operand, self.config.fallback_tick)
    }

    /// Wraps `operand` so a rejection resolves with `value`.
    pub fn fallback_or<T, E, P>(&self, operand: Operand<T, E, P>, value: T) -> Fallback<T, E>
    where
        T: Payload,
        E: Payload,
        P: Payload,
    {
        combinator::fallback_or(
            self.scheduler.as_ref(),
            operand,
            self.config.fallback_tick,
            value,
        )
    }

    /// Starts building a deferred call, with the configured timeout.
    pub fn defer<A, T, E, F>(&self, arity: usize, callable: F) -> Defer<A, T, E>
    where
        A: Send + 'static,
        T: Payload,
        E: Payload,
        F: FnOnce(Vec<Option<A>>, Callbacks<T, E>) -> core::result::Result<(), E>
            + Send
            + 'static,
    {
        Defer::new(Arc::clone(&self.scheduler), arity, callable).timeout(self.config.defer_timeout)
    }

    /// Binds the configured event names on `target`.
    pub fn defer_object<O: EventTarget>(&self, target: O) -> EventPromise<O> {
        defer_object(target, &self.config.event_names())
    }

    /// Binds explicit event names on `target`.
    pub fn defer_object_with<O: EventTarget>(&self, target: O, names: &EventNames) -> EventPromise<O> {
        defer_object(target, names)
    }

    /// Resolves the named operator now and returns an operand that runs it
    /// when invoked. The flow value handed to the operand is ignored.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnknownOperator`](crate::ErrorKind::UnknownOperator) for
    /// an unknown name, and the errors of [`registry::validate`] for a
    /// malformed argument list.
    pub fn op(&self, name: &str, args: Vec<Arg>) -> Result<DynOperand> {
        let op = self.resolve(name, &args)?;
        let q = self.clone();
        Ok(Operand::flow(move |_| q.run_or_reject(op, args, None)))
    }

    /// Like [`Q::op`], but the operand hands its flow value on, re-tagged as
    /// threaded, so a group operator distributes it to every member.
    ///
    /// # Errors
    ///
    /// As for [`Q::op`].
    pub fn use_op(&self, name: &str, args: Vec<Arg>) -> Result<DynOperand> {
        let op = self.resolve(name, &args)?;
        let q = self.clone();
        Ok(Operand::flow(move |flow: Option<Flow<_>>| {
            q.run_or_reject(op, args, flow.map(Flow::threaded))
        }))
    }

    /// Runs `op` over `args` now.
    ///
    /// # Errors
    ///
    /// The errors of [`registry::validate`].
    pub fn invoke(
        &self,
        op: Operator,
        args: Vec<Arg>,
        flow: Option<Flow<serde_json::Value>>,
    ) -> Result<DynPromise> {
        registry::run(op, args, flow, &self.scheduler, &self.config)
    }

    fn resolve(&self, name: &str, args: &[Arg]) -> Result<Operator> {
        let op: Operator = name.parse()?;
        registry::validate(op, args).with_context(|| format!("operator `{name}`"))?;
        debug!(operator = %op, args = args.len(), "named operator resolved");
        Ok(op)
    }

    fn run_or_reject(
        &self,
        op: Operator,
        args: Vec<Arg>,
        flow: Option<Flow<serde_json::Value>>,
    ) -> DynPromise {
        self.invoke(op, args, flow)
            .unwrap_or_else(|err| Promise::rejected(error_value(&err)))
    }

    /// See [`combinator::pipe()`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) for no steps.
    pub fn pipe<T, E, P, It>(&self, steps: It) -> Result<Promise<T, E, Progress<T>>>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        It: IntoIterator<Item = Operand<T, E, P>>,
    {
        combinator::pipe(steps)
    }

    /// See [`combinator::any_of()`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) for no operands.
    pub fn any_of<T, E, P, It>(&self, operands: It) -> Result<Promise<T, Vec<E>>>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        It: IntoIterator<Item = Operand<T, E, P>>,
    {
        combinator::any_of(operands)
    }

    /// See [`combinator::some_of()`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) for no operands.
    pub fn some_of<T, E, P, It>(
        &self,
        operands: It,
    ) -> Result<Promise<Slots<T>, Vec<E>, Progress<Slots<T>>>>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        It: IntoIterator<Item = Operand<T, E, P>>,
    {
        combinator::some_of(operands)
    }

    /// See [`combinator::some_from()`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) for no entries.
    pub fn some_from<T, E, P, K, It>(
        &self,
        entries: It,
    ) -> Result<Promise<KeyedSlots<T>, IndexMap<String, E>, Progress<KeyedSlots<T>>>>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        K: Into<String>,
        It: IntoIterator<Item = (K, Operand<T, E, P>)>,
    {
        combinator::some_from(entries)
    }

    /// See [`combinator::all_of()`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) for no operands.
    pub fn all_of<T, E, P, It>(&self, operands: It) -> Result<Promise<Vec<T>, E, Progress<Slots<T>>>>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        It: IntoIterator<Item = Operand<T, E, P>>,
    {
        combinator::all_of(operands)
    }

    /// See [`combinator::invert()`].
    pub fn invert<T, E, P, I>(&self, operand: Operand<T, E, P, I>) -> Operand<E, T, P, I>
    where
        T: Payload,
        E: Payload,
        P: Payload,
        I: Payload,
    {
        combinator::invert(operand)
    }
}
