//! First-success group combinator.
//!
//! `any_of` starts every operand at once and resolves with the first value
//! to arrive. It rejects only when every operand has rejected, with the
//! reasons collected in operand order: slot `i` of the aggregate is the
//! reason of operand `i`, whichever rejection arrived first.
//!
//! ```text
//! any_of([a, b, c]):
//!   a ok(1) ───▶ resolve(1)      (b, c are still observed, then ignored)
//!   all rejected ─▶ reject([ea, eb, ec])
//! ```
//!
//! No progress is published.

use std::sync::Arc;

use parking_lot::Mutex;

use super::group::GroupState;
use super::operand::{collect_operands, fan_out, Operand};
use crate::error::Result;
use crate::promise::{Deferred, Promise};
use crate::tracing_compat::{combinator_span, debug, trace};
use crate::types::{Flow, Payload, Settled};

/// Resolves with the first success among `operands`.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn any_of<T, E, P, It>(operands: It) -> Result<Promise<T, Vec<E>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    any_of_with_flow(operands, None)
}

/// [`any_of`] with an incoming flow value.
///
/// A threaded value is handed to every function operand; a direct value
/// joins the group as one more resolved operand.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn any_of_with_flow<T, E, P, It>(
    operands: It,
    flow: Option<Flow<T>>,
) -> Result<Promise<T, Vec<E>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    let operands = collect_operands("any_of", operands)?;
    let promises = fan_out(operands, flow);
    let total = promises.len();
    let span = combinator_span("any_of", total);
    let _guard = span.enter();
    debug!(combinator = "any_of", total, "fan-out");

    let deferred: Deferred<T, Vec<E>> = Deferred::new();
    let state = Arc::new(Mutex::new(GroupState::<T, E>::new(total)));

    for (slot, promise) in promises.iter().enumerate() {
        let deferred = deferred.clone();
        let state = Arc::clone(&state);
        promise.on_settle(move |outcome| {
            if let Settled::Resolved(value) = outcome {
                if deferred.resolve(value.clone()) {
                    trace!(combinator = "any_of", slot, total, "first success wins");
                }
                return;
            }
            let exhausted = {
                let mut group = state.lock();
                group.record(slot, outcome);
                (group.failed() == group.total()).then(|| group.errors())
            };
            trace!(combinator = "any_of", slot, total, "slot rejected");
            if let Some(errors) = exhausted {
                debug!(combinator = "any_of", total, "every operand rejected");
                deferred.reject(errors);
            }
        });
    }

    Ok(deferred.promise())
}
