//! Settle-all group combinators: `some_of` and its keyed form `some_from`.
//!
//! `some_of` waits for every operand. It resolves with the ordered slot
//! results (`None` at rejected slots) when at least one operand succeeded,
//! and rejects with every reason, in operand order, when none did.
//!
//! After every slot settles, successful or not, a [`Progress`] is published
//! whose snapshot is the current slot vector.
//!
//! ```text
//! some_of([ok(1), err(x), ok(3)])  ─▶ resolve([Some(1), None, Some(3)])
//! some_of([err(x), err(y)])        ─▶ reject([x, y])
//! ```
//!
//! `some_from` is the same combinator over named operands. Results, errors
//! and progress snapshots are maps keyed by operand name, in insertion order.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use super::group::GroupState;
use super::operand::{collect_operands, fan_out, Operand};
use crate::error::{Error, Result};
use crate::promise::{Deferred, Promise};
use crate::tracing_compat::{combinator_span, debug, trace};
use crate::types::{Flow, Payload, Progress, Settled};

/// Ordered slot results of a group.
pub type Slots<T> = Vec<Option<T>>;

/// Named slot results of a keyed group.
pub type KeyedSlots<T> = IndexMap<String, Option<T>>;

/// Waits for every operand; succeeds if at least one did.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn some_of<T, E, P, It>(operands: It) -> Result<Promise<Slots<T>, Vec<E>, Progress<Slots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    some_of_with_flow(operands, None)
}

/// [`some_of`] with an incoming flow value.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `operands` is empty.
pub fn some_of_with_flow<T, E, P, It>(
    operands: It,
    flow: Option<Flow<T>>,
) -> Result<Promise<Slots<T>, Vec<E>, Progress<Slots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    let operands = collect_operands("some_of", operands)?;
    let promises = fan_out(operands, flow);
    let total = promises.len();
    let span = combinator_span("some_of", total);
    let _guard = span.enter();
    debug!(combinator = "some_of", total, "fan-out");

    let deferred = Deferred::new();
    let state = Arc::new(Mutex::new(GroupState::<T, E>::new(total)));

    for (slot, promise) in promises.iter().enumerate() {
        let deferred = deferred.clone();
        let state = Arc::clone(&state);
        promise.on_settle(move |outcome| {
            let (progress, finished) = {
                let mut group = state.lock();
                if !group.record(slot, outcome) {
                    return;
                }
                let done = group.settled();
                let progress = Progress::new(done, group.total(), group.snapshot());
                let finished = group.is_complete().then(|| {
                    if group.succeeded() > 0 {
                        Settled::Resolved(group.snapshot())
                    } else {
                        Settled::Rejected(group.errors())
                    }
                });
                (progress, finished)
            };
            trace!(
                combinator = "some_of",
                slot,
                done = progress.done,
                total,
                "slot settled"
            );
            deferred.notify(progress);
            if let Some(outcome) = finished {
                debug!(
                    combinator = "some_of",
                    total,
                    resolved = outcome.is_resolved(),
                    "group complete"
                );
                deferred.settle(outcome);
            }
        });
    }

    Ok(deferred.promise())
}

/// Keyed [`some_of`]: each operand is named, and results, errors and
/// progress snapshots are maps in insertion order.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `entries` is empty and
/// [`ErrorKind::InvalidArguments`](crate::ErrorKind::InvalidArguments) when
/// two entries share a key.
pub fn some_from<T, E, P, K, It>(
    entries: It,
) -> Result<Promise<KeyedSlots<T>, IndexMap<String, E>, Progress<KeyedSlots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    K: Into<String>,
    It: IntoIterator<Item = (K, Operand<T, E, P>)>,
{
    some_from_with_flow(entries, None)
}

/// [`some_from`] with an incoming flow value.
///
/// The flow value is handed to every function operand whatever its tag,
/// since a keyed group has no name for an extra operand.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `entries` is empty and
/// [`ErrorKind::InvalidArguments`](crate::ErrorKind::InvalidArguments) when
/// two entries share a key.
pub fn some_from_with_flow<T, E, P, K, It>(
    entries: It,
    flow: Option<Flow<T>>,
) -> Result<Promise<KeyedSlots<T>, IndexMap<String, E>, Progress<KeyedSlots<T>>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    K: Into<String>,
    It: IntoIterator<Item = (K, Operand<T, E, P>)>,
{
    let (keys, operands): (Vec<String>, Vec<_>) =
        entries.into_iter().map(|(k, op)| (k.into(), op)).unzip();
    if keys.is_empty() {
        return Err(Error::no_operands("some_from"));
    }
    let mut seen = IndexSet::with_capacity(keys.len());
    if let Some(duplicate) = keys.iter().find(|key| !seen.insert(key.as_str())) {
        return Err(Error::invalid_arguments(format!(
            "some_from: duplicate key `{duplicate}`"
        )));
    }
    let keys = Arc::new(keys);
    let settle_keys = Arc::clone(&keys);

    let slots = some_of_with_flow(operands, flow.map(Flow::threaded))?;
    Ok(slots.transform(
        move |outcome| match outcome {
            Settled::Resolved(results) => Settled::Resolved(keyed(&settle_keys, results)),
            Settled::Rejected(errors) => {
                Settled::Rejected(settle_keys.iter().cloned().zip(errors).collect())
            }
        },
        move |progress: &Progress<Slots<T>>| Some(progress.clone().map(|s| keyed(&keys, s))),
    ))
}

fn keyed<V>(keys: &[String], values: Vec<V>) -> IndexMap<String, V> {
    keys.iter().cloned().zip(values).collect()
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
    fn some_of_partial_success() {
        init_test("some_of_partial_success");
        let lab = test_lab();
        let p = some_of(vec![
            delayed(&lab, 10, Ok(1)),
            delayed(&lab, 30, Err("x")),
            delayed(&lab, 20, Ok(3)),
        ])
        .expect("non-empty");
        let progress = record_progress(&p);

        lab.run_until_idle();
        crate::assert_resolved!(p, vec![Some(1), None, Some(3)]);

        let snapshots: Vec<_> = progress.lock().iter().map(|p| p.snapshot.clone()).collect();
        let expected = vec![
            vec![Some(1), None, None],
            vec![Some(1), None, Some(3)],
            vec![Some(1), None, Some(3)],
        ];
        crate::assert_with_log!(
            snapshots == expected,
            "progress after every slot",
            expected,
            snapshots
        );
        crate::test_complete!("some_of_partial_success");
    }

    #[test]
    fn some_of_all_fail() {
        init_test("some_of_all_fail");
        let lab = test_lab();
        let p = some_of(vec![delayed(&lab, 20, Err("a")), delayed(&lab, 10, Err("b"))])
            .expect("non-empty");
        lab.run_until_idle();
        crate::assert_rejected!(p, vec!["a", "b"]);
        crate::test_complete!("some_of_all_fail");
    }

    #[test]
    fn some_of_waits_for_every_slot() {
        init_test("some_of_waits_for_every_slot");
        let lab = test_lab();
        let p = some_of(vec![delayed(&lab, 5, Ok(1)), delayed(&lab, 50, Ok(2))])
            .expect("non-empty");
        lab.advance_by(Duration::from_millis(10));
        crate::assert_pending!(p);
        assert_eq!(p.last_progress().map(|p| p.done), Some(1));
        lab.run_until_idle();
        crate::assert_resolved!(p, vec![Some(1), Some(2)]);
        crate::test_complete!("some_of_waits_for_every_slot");
    }

    #[test]
    fn some_from_keys_results() {
        init_test("some_from_keys_results");
        let lab = test_lab();
        let p = some_from(vec![
            ("flights", delayed(&lab, 20, Ok(7))),
            ("hotels", delayed(&lab, 10, Err("down"))),
        ])
        .expect("non-empty");
        let progress = record_progress(&p);
        lab.run_until_idle();

        let mut expected = IndexMap::new();
        expected.insert("flights".to_owned(), Some(7));
        expected.insert("hotels".to_owned(), None);
        crate::assert_resolved!(p, expected);

        let first = progress.lock().first().cloned().expect("progress");
        assert_eq!(first.done, 1);
        assert_eq!(first.snapshot.get("hotels"), Some(&None));
        assert_eq!(
            first.snapshot.keys().collect::<Vec<_>>(),
            vec!["flights", "hotels"]
        );
        crate::test_complete!("some_from_keys_results");
    }

    #[test]
    fn some_from_all_fail_keys_errors() {
        init_test("some_from_all_fail_keys_errors");
        let p = some_from(vec![
            ("a", Operand::<i32, &str>::from(Promise::rejected("ea"))),
            ("b", Operand::from(Promise::rejected("eb"))),
        ])
        .expect("non-empty");
        let mut expected = IndexMap::new();
        expected.insert("a".to_owned(), "ea");
        expected.insert("b".to_owned(), "eb");
        crate::assert_rejected!(p, expected);
        crate::test_complete!("some_from_all_fail_keys_errors");
    }

    #[test]
    fn some_from_rejects_empty_map() {
        init_test("some_from_rejects_empty_map");
        let entries: Vec<(String, Operand<i32, ()>)> = Vec::new();
        let err = some_from(entries).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NoOperands);
        crate::test_complete!("some_from_rejects_empty_map");
    }

    #[test]
    fn some_from_rejects_duplicate_keys() {
        init_test("some_from_rejects_duplicate_keys");
        let err = some_from(vec![
            ("a", Operand::<i32, ()>::from(Promise::resolved(1))),
            ("b", Operand::from(Promise::resolved(2))),
            ("a", Operand::from(Promise::resolved(3))),
        ])
        .expect_err("duplicate key");
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert!(err.to_string().contains("`a`"), "{err}");
        crate::test_complete!("some_from_rejects_duplicate_keys");
    }
}
