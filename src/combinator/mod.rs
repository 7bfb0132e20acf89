//! Promise combinators.
//!
//! This module provides:
//!
//! - [`operand`]: the [`Operand`] mix of promises and promise-producing functions
//! - [`pipe`](mod@pipe): run steps in order, feeding each result forward
//! - [`any_of`](mod@any_of): first success wins
//! - [`some_of`](mod@some_of): settle all, succeed if any did (keyed: [`some_from`])
//! - [`all_of`](mod@all_of): settle all, succeed only if all did
//! - [`invert`](mod@invert): swap success and failure
//! - [`fallback`](mod@fallback): resolve with a default on failure
//! - [`registry`]: the same operators by name, over JSON payloads
//!
//! Group combinators and [`pipe()`] come in a plain form and a `*_with_flow`
//! form that takes the value handed over by an enclosing combinator. Every
//! combinator refuses an empty operand list with
//! [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) at construction.

pub mod all_of;
pub mod any_of;
pub mod fallback;
mod group;
pub mod invert;
pub mod operand;
pub mod pipe;
pub mod registry;
pub mod some_of;

pub use all_of::{all_of, all_of_with_flow};
pub use any_of::{any_of, any_of_with_flow};
pub use fallback::{fallback, fallback_or, Fallback};
pub use invert::invert;
pub use operand::{Invoke, Operand};
pub use pipe::{pipe, pipe_with_flow};
pub use registry::{Arg, DynOperand, DynPromise, Operator};
pub use some_of::{some_from, some_from_with_flow, some_of, some_of_with_flow, KeyedSlots, Slots};

/// Macro for running operands and resolving with the first success.
///
/// Each argument is anything convertible into an
/// [`Operand`](crate::combinator::Operand).
///
/// ```
/// use flowq::{any_of, Promise};
///
/// let p = any_of!(
///     Promise::<i32, &str>::rejected("down"),
///     Promise::resolved(2),
/// )
/// .expect("non-empty");
/// assert_eq!(p.settled().map(|s| s.into_result()), Some(Ok(2)));
/// ```
#[macro_export]
macro_rules! any_of {
    ($($op:expr),+ $(,)?) => {
        $crate::combinator::any_of(vec![$($crate::combinator::Operand::from($op)),+])
    };
}

/// Macro for settling every operand and keeping the successes.
#[macro_export]
macro_rules! some_of {
    ($($op:expr),+ $(,)?) => {
        $crate::combinator::some_of(vec![$($crate::combinator::Operand::from($op)),+])
    };
}

/// Macro for requiring every operand to succeed.
///
/// ```
/// use flowq::{all_of, Promise};
///
/// let p = all_of!(Promise::<_, ()>::resolved(1), Promise::resolved(2)).expect("non-empty");
/// assert_eq!(p.settled().map(|s| s.into_result()), Some(Ok(vec![1, 2])));
/// ```
#[macro_export]
macro_rules! all_of {
    ($($op:expr),+ $(,)?) => {
        $crate::combinator::all_of(vec![$($crate::combinator::Operand::from($op)),+])
    };
}

/// Macro for chaining steps.
#[macro_export]
macro_rules! pipe {
    ($($op:expr),+ $(,)?) => {
        $crate::combinator::pipe(vec![$($crate::combinator::Operand::from($op)),+])
    };
}
