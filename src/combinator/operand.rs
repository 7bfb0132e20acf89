//! Operands and the invocation normalizer.
//!
//! Every combinator accepts a mix of promises that already exist and
//! functions that produce a promise when the combinator decides to start
//! them. [`Operand`] is that mix. [`Operand::invoke`] is the normalizer: it
//! turns either form into a promise, handing function operands the flow
//! value the combinator wants them to see.
//!
//! # Forms
//!
//! | Constructor | Receives | Notes |
//! |---|---|---|
//! | `From<Promise>` | nothing | passes through unchanged |
//! | [`Operand::call`] | nothing | flow ignored |
//! | [`Operand::using`] | `Option<I>` | flow value, tag dropped |
//! | [`Operand::flow`] | `Option<Flow<I>>` | raw tagged flow |
//! | [`Operand::bound`] | `&H`, `Option<I>` | closure over a host |
//! | [`Operand::bound_method`] | `&H`, args + flow | name resolved now |
//! | [`Operand::apply`] | flow value as host | name resolved at run time |
//!
//! `I` is the flow type. It defaults to the success type `T`, which is what
//! every combinator that feeds a result forward requires; it differs only
//! for operands produced by [`invert`](super::invert()).

use core::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::host::MethodHost;
use crate::promise::Promise;
use crate::time::Delay;
use crate::types::{Flow, Payload};

/// A deferred call producing a promise from an optional flow value.
pub type Invoke<T, E, P, I> = Box<dyn FnOnce(Option<Flow<I>>) -> Promise<T, E, P> + Send>;

/// Something a combinator can turn into a promise.
pub enum Operand<T, E, P = (), I = T> {
    /// An existing promise, used as-is.
    Ready(Promise<T, E, P>),
    /// A function invoked when the combinator starts this operand.
    Lazy(Invoke<T, E, P, I>),
}

impl<T, E, P, I> Operand<T, E, P, I>
where
    T: Payload,
    E: Payload,
    P: Payload,
    I: Payload,
{
    /// Wraps a zero-argument function. Any flow value is ignored.
    pub fn call<F>(f: F) -> Self
    where
        F: FnOnce() -> Promise<T, E, P> + Send + 'static,
    {
        Self::Lazy(Box::new(move |_| f()))
    }

    /// Wraps a function that receives the flow value, if any.
    pub fn using<F>(f: F) -> Self
    where
        F: FnOnce(Option<I>) -> Promise<T, E, P> + Send + 'static,
    {
        Self::Lazy(Box::new(move |flow| f(flow.map(Flow::into_inner))))
    }

    /// Wraps a function that receives the tagged flow.
    pub fn flow<F>(f: F) -> Self
    where
        F: FnOnce(Option<Flow<I>>) -> Promise<T, E, P> + Send + 'static,
    {
        Self::Lazy(Box::new(f))
    }

    /// Wraps a function whose synchronous `Err` becomes a rejection.
    pub fn try_call<F>(f: F) -> Self
    where
        F: FnOnce(Option<I>) -> core::result::Result<Promise<T, E, P>, E> + Send + 'static,
    {
        Self::using(move |flow| f(flow).unwrap_or_else(Promise::rejected))
    }

    /// Wraps a closure over `host`. The closure receives the host and the
    /// flow value.
    pub fn bound<H, F>(host: H, f: F) -> Self
    where
        H: Send + 'static,
        F: FnOnce(&H, Option<I>) -> Promise<T, E, P> + Send + 'static,
    {
        Self::using(move |flow| f(&host, flow))
    }

    /// Returns true for an existing promise.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Normalizes the operand into a promise.
    ///
    /// A ready promise is returned untouched; a function operand is called
    /// with `flow`.
    pub fn invoke(self, flow: Option<Flow<I>>) -> Promise<T, E, P> {
        match self {
            Self::Ready(promise) => promise,
            Self::Lazy(f) => f(flow),
        }
    }

    /// Maps the promise this operand produces, keeping it lazy.
    pub fn map_promise<U, F2, Q, G>(self, g: G) -> Operand<U, F2, Q, I>
    where
        U: Payload,
        F2: Payload,
        Q: Payload,
        G: FnOnce(Promise<T, E, P>) -> Promise<U, F2, Q> + Send + 'static,
    {
        match self {
            Self::Ready(promise) => Operand::Ready(g(promise)),
            Self::Lazy(f) => Operand::Lazy(Box::new(move |flow| g(f(flow)))),
        }
    }

    /// Re-tags any incoming flow as [`Flow::Threaded`] before invoking.
    #[must_use]
    pub fn threading(self) -> Self {
        match self {
            Self::Ready(promise) => Self::Ready(promise),
            Self::Lazy(f) => Self::Lazy(Box::new(move |flow| f(flow.map(Flow::threaded)))),
        }
    }
}

impl<T, E, P> Operand<T, E, P, T>
where
    T: Payload,
    E: Payload,
    P: Payload,
{
    /// Calls the method `name` on `host`, with `args` followed by the flow
    /// value.
    ///
    /// The name is resolved now; an unknown name is a construction error.
    pub fn bound_method<H>(host: Arc<H>, name: &str, args: Vec<T>) -> Result<Self>
    where
        H: MethodHost<T, E, P> + Send + Sync + 'static,
    {
        let method = host
            .resolve_method(name)
            .ok_or_else(|| Error::unknown_method(name))?;
        Ok(Self::using(move |flow| {
            let mut args = args;
            args.extend(flow);
            method(&host, args)
        }))
    }

    /// Calls the method `name` on the flow value itself, with `args`.
    ///
    /// The host only exists once the previous step has produced it, so a
    /// missing flow value or an unknown name rejects with `E::from(Error)`.
    pub fn apply(name: impl Into<String>, args: Vec<T>) -> Self
    where
        T: MethodHost<T, E, P>,
        E: From<Error>,
    {
        let name = name.into();
        Self::using(move |flow| {
            let Some(host) = flow else {
                return Promise::rejected(E::from(
                    Error::new(ErrorKind::MissingFlow)
                        .with_message(format!("`{name}` needs a value to call it on")),
                ));
            };
            match host.resolve_method(&name) {
                Some(method) => method(&host, args),
                None => Promise::rejected(E::from(Error::unknown_method(&name))),
            }
        })
    }
}

impl<T, E, P, I> From<Promise<T, E, P>> for Operand<T, E, P, I> {
    fn from(promise: Promise<T, E, P>) -> Self {
        Self::Ready(promise)
    }
}

impl<T: Payload, E: Payload, I> From<Delay<T, E>> for Operand<T, E, (), I> {
    fn from(delay: Delay<T, E>) -> Self {
        Self::Ready(delay.into_promise())
    }
}

impl<T, E, P, I> fmt::Debug for Operand<T, E, P, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(promise) => f.debug_tuple("Ready").field(promise).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Collects operands, rejecting an empty list.
pub(crate) fn collect_operands<T, E, P, It>(
    combinator: &'static str,
    operands: It,
) -> Result<Vec<Operand<T, E, P>>>
where
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    let operands: Vec<_> = operands.into_iter().collect();
    if operands.is_empty() {
        return Err(Error::no_operands(combinator));
    }
    Ok(operands)
}

/// Starts every operand of a group.
///
/// A threaded flow value is handed to each function operand as a direct
/// value. A direct flow value joins the group as one more resolved operand.
pub(crate) fn fan_out<T, E, P>(
    operands: Vec<Operand<T, E, P>>,
    flow: Option<Flow<T>>,
) -> Vec<Promise<T, E, P>>
where
    T: Payload,
    E: Payload,
    P: Payload,
{
    let (threaded, appended) = match flow {
        Some(Flow::Threaded(v)) => (Some(v), None),
        Some(Flow::Direct(v)) => (None, Some(v)),
        None => (None, None),
    };

    let mut promises: Vec<_> = operands
        .into_iter()
        .map(|op| op.invoke(threaded.clone().map(Flow::Direct)))
        .collect();
    promises.extend(appended.map(Promise::resolved));
    promises
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Method;
    use crate::test_utils::init_test_logging;
    use crate::types::Settled;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Val {
        Num(i64),
        Text(String),
    }

    impl MethodHost<Val, Error> for Val {
        fn resolve_method(&self, name: &str) -> Option<Method<Self, Val, Error>> {
            match name {
                "len" => Some(|host, _| match host {
                    Val::Text(s) => Promise::resolved(Val::Num(s.len() as i64)),
                    Val::Num(_) => Promise::rejected(Error::type_mismatch("text", "number")),
                }),
                _ => None,
            }
        }
    }

    struct Calc;

    impl MethodHost<i64, String> for Calc {
        fn resolve_method(&self, name: &str) -> Option<Method<Self, i64, String>> {
            match name {
                "sum" => Some(|_, args| Promise::resolved(args.iter().sum())),
                _ => None,
            }
        }
    }

    #[test]
    fn ready_passes_through() {
        init_test("ready_passes_through");
        let p: Promise<i32, ()> = Promise::resolved(1);
        let op: Operand<i32, ()> = p.clone().into();
        assert!(op.is_ready());
        assert!(op.invoke(Some(Flow::Direct(5))).ptr_eq(&p));
        crate::test_complete!("ready_passes_through");
    }

    #[test]
    fn call_ignores_flow_and_using_unwraps_it() {
        init_test("call_ignores_flow_and_using_unwraps_it");
        let call: Operand<i32, ()> = Operand::call(|| Promise::resolved(0));
        assert_eq!(
            call.invoke(Some(Flow::Direct(9))).settled(),
            Some(Settled::Resolved(0))
        );

        let using: Operand<i32, ()> =
            Operand::using(|v| Promise::resolved(v.map_or(-1, |v| v + 1)));
        assert_eq!(
            using.invoke(Some(Flow::Threaded(9))).settled(),
            Some(Settled::Resolved(10))
        );
        crate::test_complete!("call_ignores_flow_and_using_unwraps_it");
    }

    #[test]
    fn try_call_turns_err_into_rejection() {
        init_test("try_call_turns_err_into_rejection");
        let op: Operand<i32, String> = Operand::try_call(|_| Err("sync failure".to_owned()));
        assert_eq!(
            op.invoke(None).settled(),
            Some(Settled::Rejected("sync failure".to_owned()))
        );
        crate::test_complete!("try_call_turns_err_into_rejection");
    }

    #[test]
    fn bound_method_appends_flow() {
        init_test("bound_method_appends_flow");
        let op = Operand::bound_method(Arc::new(Calc), "sum", vec![1, 2]).expect("resolves");
        assert_eq!(
            op.invoke(Some(Flow::Direct(3))).settled(),
            Some(Settled::Resolved(6))
        );

        let missing = Operand::<i64, String>::bound_method(Arc::new(Calc), "nope", vec![]);
        assert_eq!(
            missing.expect_err("unknown").kind(),
            ErrorKind::UnknownMethod
        );
        crate::test_complete!("bound_method_appends_flow");
    }

    #[test]
    fn bound_closure_sees_host() {
        init_test("bound_closure_sees_host");
        let op: Operand<i64, ()> =
            Operand::bound(100_i64, |base, v| Promise::resolved(base + v.unwrap_or(0)));
        assert_eq!(
            op.invoke(Some(Flow::Direct(5))).settled(),
            Some(Settled::Resolved(105))
        );
        crate::test_complete!("bound_closure_sees_host");
    }

    #[test]
    fn apply_resolves_on_flow_value() {
        init_test("apply_resolves_on_flow_value");
        let op: Operand<Val, Error> = Operand::apply("len", vec![]);
        let out = op.invoke(Some(Flow::Direct(Val::Text("four".into()))));
        assert_eq!(out.settled(), Some(Settled::Resolved(Val::Num(4))));

        let unknown: Operand<Val, Error> = Operand::apply("shout", vec![]);
        match unknown.invoke(Some(Flow::Direct(Val::Num(1)))).settled() {
            Some(Settled::Rejected(e)) => assert_eq!(e.kind(), ErrorKind::UnknownMethod),
            other => panic!("expected rejection, got {other:?}"),
        }

        let no_flow: Operand<Val, Error> = Operand::apply("len", vec![]);
        match no_flow.invoke(None).settled() {
            Some(Settled::Rejected(e)) => assert_eq!(e.kind(), ErrorKind::MissingFlow),
            other => panic!("expected rejection, got {other:?}"),
        }
        crate::test_complete!("apply_resolves_on_flow_value");
    }

    #[test]
    fn fan_out_threads_or_appends() {
        init_test("fan_out_threads_or_appends");
        let echo = || Operand::<i32, ()>::using(|v| Promise::resolved(v.unwrap_or(0)));

        let threaded = fan_out(vec![echo(), echo()], Some(Flow::Threaded(7)));
        let values: Vec<_> = threaded.iter().map(Promise::settled).collect();
        assert_eq!(values, vec![Some(Settled::Resolved(7)); 2]);

        let direct = fan_out(vec![echo()], Some(Flow::Direct(7)));
        let values: Vec<_> = direct.iter().map(Promise::settled).collect();
        assert_eq!(
            values,
            vec![Some(Settled::Resolved(0)), Some(Settled::Resolved(7))]
        );
        crate::test_complete!("fan_out_threads_or_appends");
    }

    #[test]
    fn empty_operand_list_is_rejected() {
        init_test("empty_operand_list_is_rejected");
        let err = collect_operands::<i32, (), (), _>("any_of", Vec::new()).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NoOperands);
        crate::test_complete!("empty_operand_list_is_rejected");
    }
}
