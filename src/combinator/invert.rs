//! Polarity modifier: swap success and failure.
//!
//! `invert` turns a resolution into a rejection carrying the same value and
//! vice versa. Progress passes through unchanged. A function operand stays
//! lazy; it is inverted when the enclosing combinator invokes it.
//!
//! Inverting twice is observationally the identity.

use super::operand::Operand;
use crate::types::Payload;

/// Swaps the success and failure channels of `operand`.
///
/// ```
/// use flowq::combinator::{invert, Operand};
/// use flowq::{Promise, Settled};
///
/// let op: Operand<i32, &str> = Promise::rejected("nope").into();
/// let flipped = invert(op).invoke(None);
/// assert_eq!(flipped.settled(), Some(Settled::Resolved("nope")));
/// ```
pub fn invert<T, E, P, I>(operand: Operand<T, E, P, I>) -> Operand<E, T, P, I>
where
    T: Payload,
    E: Payload,
    P: Payload,
    I: Payload,
{
    operand.map_promise(|promise| promise.inverted())
}
