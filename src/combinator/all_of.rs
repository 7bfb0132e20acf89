//! All-success group combinator.
//!
//! `all_of` resolves with every result, in operand order, once every operand
//! has resolved. The first rejection to arrive rejects the group with that
//! reason unchanged; operands still running are left to finish on their own.
//!
//! A [`Progress`] is published after every success with the current slot
//! vector as its snapshot.
//!
//! ```text
//! all_of([ok(1) @30ms, ok(2) @10ms])  ─▶ resolve([1, 2]) @30ms
//! all_of([err(a) @30ms, err(b) @10ms]) ─▶ reject(b) @10ms
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use super::group::GroupState;
use super::operand::{collect_operands, fan_out, Operand};
use super::some_of::Slots;
use crate::error::Result;
use crate::promise::{Deferred, Promise};
use crate::tracing_compat::{combinator_span, debug, trace};
use crate::types::{Flow, Payload, Progress, Settled};

/// Resolves once every operand has resolved.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn all_of<T, E, P, It>(operands: It) -> Result<Promise<Vec<T>, E, Progress<Slots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    all_of_with_flow(operands, None)
}

/// [`all_of`] with an incoming flow value.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn all_of_with_flow<T, E, P, It>(
    operands: It,
    flow: Option<Flow<T>>,
) -> Result<Promise<Vec<T>, E, Progress<Slots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    let operands = collect_operands("all_of", operands)?;
    let promises = fan_out(operands, flow);
    let total = promises.len();
    let span = combinator_span("all_of", total);
    let _guard = span.enter();
    debug!(combinator = "all_of", total, "fan-out");

    let deferred = Deferred::new();
    let state = Arc::new(Mutex::new(GroupState::<T, E>::new(total)));

    for (slot, promise) in promises.iter().enumerate() {
        let deferred = deferred.clone();
        let state = Arc::clone(&state);
        promise.on_settle(move |outcome| match outcome {
            Settled::Resolved(_) => {
                let (progress, results) = {
                    let mut group = state.lock();
                    if !group.record(slot, outcome) {
                        return;
                    }
                    let progress = Progress::new(group.succeeded(), total, group.snapshot());
                    (progress, group.all_results())
                };
                trace!(combinator = "all_of", slot, done = progress.done, total, "slot resolved");
                deferred.notify(progress);
                if let Some(results) = results {
                    debug!(combinator = "all_of", total, "every operand resolved");
                    deferred.resolve(results);
                }
            }
            Settled::Rejected(reason) => {
                if deferred.reject(reason.clone()) {
                    debug!(combinator = "all_of", slot, total, "first rejection wins");
                }
            }
        });
    }

    Ok(deferred.promise())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lab::LabScheduler;
    use crate::test_utils::{init_test_logging, record_progress, settle_after, test_lab};
    use std::time::Duration;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn delayed(
        lab: &LabScheduler,
        ms: u64,
        outcome: core::result::Result<i32, &'static str>,
    ) -> Operand<i32, &'static str> {
        settle_after(lab, Duration::from_millis(ms), outcome).into()
    }

    #[test]
    fn all_of_all_succeed() {
        init_test("all_of_all_succeed");
        let lab = test_lab();
        let p = all_of(vec![
            delayed(&lab, 30, Ok(1)),
            delayed(&lab, 10, Ok(2)),
            delayed(&lab, 20, Ok(3)),
        ])
        .expect("non-empty");
        let progress = record_progress(&p);

        lab.run_until_idle();
        crate::assert_resolved!(p, vec![1, 2, 3]);
        let done: Vec<_> = progress.lock().iter().map(|p| p.done).collect();
        assert_eq!(done, vec![1, 2, 3]);
        assert_eq!(
            progress.lock()[0].snapshot,
            vec![None, Some(2), None],
            "snapshot keeps operand order"
        );
        crate::test_complete!("all_of_all_succeed");
    }

    #[test]
    fn all_of_first_rejection_in_settle_order() {
        init_test("all_of_first_rejection_in_settle_order");
        let lab = test_lab();
        let p = all_of(vec![
            delayed(&lab, 30, Err("late")),
            delayed(&lab, 10, Err("early")),
            delayed(&lab, 5, Ok(3)),
        ])
        .expect("non-empty");

        lab.advance_by(Duration::from_millis(10));
        crate::assert_rejected!(p, "early");
        lab.run_until_idle();
        crate::assert_rejected!(p, "early");
        crate::test_complete!("all_of_first_rejection_in_settle_order");
    }

    #[test]
    fn all_of_presettled_operands() {
        init_test("all_of_presettled_operands");
        let p = all_of(vec![
            Operand::<_, ()>::from(Promise::resolved("a")),
            Operand::from(Promise::resolved("b")),
        ])
        .expect("non-empty");
        crate::assert_resolved!(p, vec!["a", "b"]);
        crate::test_complete!("all_of_presettled_operands");
    }

    #[test]
    fn all_of_threaded_flow_reaches_each_operand() {
        init_test("all_of_threaded_flow_reaches_each_operand");
        let double = || Operand::<i32, ()>::using(|v| Promise::resolved(v.unwrap_or(0) * 2));
        let triple = || Operand::<i32, ()>::using(|v| Promise::resolved(v.unwrap_or(0) * 3));
        let p = all_of_with_flow(vec![double(), triple()], Some(Flow::Threaded(5)))
            .expect("non-empty");
        crate::assert_resolved!(p, vec![10, 15]);
        crate::test_complete!("all_of_threaded_flow_reaches_each_operand");
    }

    #[test]
    fn all_of_rejects_empty_group() {
        init_test("all_of_rejects_empty_group");
        let err = all_of::<i32, (), (), _>(Vec::new()).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NoOperands);
        crate::test_complete!("all_of_rejects_empty_group");
    }
}
