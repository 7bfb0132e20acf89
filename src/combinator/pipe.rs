//! Pipe combinator: run steps in order, feeding each result forward.
//!
//! # Semantics
//!
//! ```text
//! pipe([s0, s1, ..., sn-1]):
//!   v ← invoke(s0, initial flow)
//!   for k in 0..n:
//!     on reject(e): reject pipe with e; stop
//!     on resolve(v):
//!       notify { done: k+1, total: n, snapshot: v }
//!       if k+1 == n: resolve pipe with v
//!       else: v ← invoke(s(k+1), Direct(v))
//! ```
//!
//! Steps are started lazily: step `k+1` is not invoked until step `k` has
//! resolved, so a rejection leaves every later function step untouched. A
//! step that is already a promise was obviously started by its creator; its
//! outcome is still only observed in order.
//!
//! The progress of the steps themselves is not forwarded; the pipe publishes
//! one [`Progress`] per completed step.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::operand::{collect_operands, Operand};
use crate::error::Result;
use crate::promise::{Deferred, Promise};
use crate::tracing_compat::{combinator_span, debug, trace};
use crate::types::{Flow, Payload, Progress, Settled};

struct PipeState<T, E, P> {
    steps: Mutex<VecDeque<Operand<T, E, P>>>,
    total: usize,
    deferred: Deferred<T, E, Progress<T>>,
}

/// Runs `steps` in order, starting the first with no flow value.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `steps` is empty.
pub fn pipe<T, E, P, It>(steps: It) -> Result<Promise<T, E, Progress<T>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    pipe_with_flow(steps, None)
}

/// Runs `steps` in order, handing `flow` to the first step.
///
/// # Errors
///
/// Returns [`ErrorKind::NoOperands`](crate::ErrorKind::NoOperands) when
/// `steps` is empty.
pub fn pipe_with_flow<T, E, P, It>(
    steps: It,
    flow: Option<Flow<T>>,
) -> Result<Promise<T, E, Progress<T>>>
where
    T: Payload,
    E: Payload,
    P: Payload,
    It: IntoIterator<Item = Operand<T, E, P>>,
{
    let steps = collect_operands("pipe", steps)?;
    let total = steps.len();
    let span = combinator_span("pipe", total);
    let _guard = span.enter();
    debug!(combinator = "pipe", total, "starting pipe");

    let state = Arc::new(PipeState {
        steps: Mutex::new(steps.into()),
        total,
        deferred: Deferred::new(),
    });
    let promise = state.deferred.promise();
    run_step(state, 0, flow);
    Ok(promise)
}

fn run_step<T, E, P>(state: Arc<PipeState<T, E, P>>, mut step: usize, mut flow: Option<Flow<T>>)
where
    T: Payload,
    E: Payload,
    P: Payload,
{
    // Steps that settle synchronously are drained here instead of nesting
    // one subscription per step.
    loop {
        let Some(operand) = state.steps.lock().pop_front() else {
            return;
        };
        trace!(combinator = "pipe", step, "invoking step");
        let current = operand.invoke(flow);
        if let Some(outcome) = current.settled() {
            match finish_step(&state, step, &outcome) {
                Some(next) => {
                    step += 1;
                    flow = Some(next);
                    continue;
                }
                None => return,
            }
        }
        current.on_settle(move |outcome| {
            if let Some(next) = finish_step(&state, step, outcome) {
                run_step(state, step + 1, Some(next));
            }
        });
        return;
    }
}

/// Records the outcome of `step`. Returns the flow for the next step, or
/// `None` once the pipe has settled.
fn finish_step<T, E, P>(
    state: &PipeState<T, E, P>,
    step: usize,
    outcome: &Settled<T, E>,
) -> Option<Flow<T>>
where
    T: Payload,
    E: Payload,
    P: Payload,
{
    match outcome {
        Settled::Resolved(value) => {
            let done = step + 1;
            trace!(combinator = "pipe", done, total = state.total, "step resolved");
            state
                .deferred
                .notify(Progress::new(done, state.total, value.clone()));
            if done == state.total {
                state.deferred.resolve(value.clone());
                None
            } else {
                Some(Flow::Direct(value.clone()))
            }
        }
        Settled::Rejected(reason) => {
            debug!(combinator = "pipe", step, "step rejected, short-circuiting");
            state.steps.lock().clear();
            state.deferred.reject(reason.clone());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lab::LabScheduler;
    use crate::test_utils::{init_test_logging, record_progress, test_lab};
    use crate::time::{wait, Scheduler};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn after(lab: &Arc<LabScheduler>, ms: u64, v: i32) -> Promise<i32, String> {
        let sched: Arc<dyn Scheduler> = lab.clone();
        wait(sched, Duration::from_millis(ms), v).into_promise()
    }

    #[test]
    fn pipe_threads_results_forward() {
        init_test("pipe_threads_results_forward");
        let lab = test_lab();
        let l1 = Arc::clone(&lab);
        let l2 = Arc::clone(&lab);

        let p = pipe(vec![
            Operand::call(move || after(&l1, 10, 1)),
            Operand::using(move |v: Option<i32>| after(&l2, 10, v.unwrap_or(0) + 1)),
            Operand::using(|v: Option<i32>| Promise::resolved(v.unwrap_or(0) * 10)),
        ])
        .expect("non-empty");
        let progress = record_progress(&p);

        crate::assert_pending!(p);
        lab.run_until_idle();
        crate::assert_resolved!(p, 20);

        let seen: Vec<_> = progress
            .lock()
            .iter()
            .map(|p| (p.done, p.total, p.snapshot))
            .collect();
        crate::assert_with_log!(
            seen == vec![(1, 3, 1), (2, 3, 2), (3, 3, 20)],
            "one progress per step",
            vec![(1, 3, 1), (2, 3, 2), (3, 3, 20)],
            seen
        );
        crate::test_complete!("pipe_threads_results_forward");
    }

    #[test]
    fn pipe_short_circuits_on_rejection() {
        init_test("pipe_short_circuits_on_rejection");
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let p: Promise<i32, String, _> = pipe(vec![
            Operand::<i32, String, ()>::call(|| Promise::resolved(1)),
            Operand::call(|| Promise::rejected("boom".to_owned())),
            Operand::call(move || {
                flag.store(true, Ordering::SeqCst);
                Promise::resolved(3)
            }),
        ])
        .expect("non-empty");

        crate::assert_rejected!(p, "boom".to_owned());
        assert!(!ran.load(Ordering::SeqCst), "later step must not run");
        assert_eq!(p.last_progress().map(|p| p.done), Some(1));
        crate::test_complete!("pipe_short_circuits_on_rejection");
    }

    #[test]
    fn pipe_initial_flow_reaches_first_step() {
        init_test("pipe_initial_flow_reaches_first_step");
        let p: Promise<i32, (), _> = pipe_with_flow(
            vec![Operand::<i32, ()>::using(|v| Promise::resolved(v.unwrap_or(0) + 1))],
            Some(Flow::Direct(41)),
        )
        .expect("non-empty");
        crate::assert_resolved!(p, 42);
        crate::test_complete!("pipe_initial_flow_reaches_first_step");
    }

    #[test]
    fn pipe_of_synchronous_steps_runs_without_nesting() {
        init_test("pipe_of_synchronous_steps_runs_without_nesting");
        const STEPS: usize = 5_000;
        let steps = (0..STEPS)
            .map(|_| Operand::<usize, ()>::using(|v| Promise::resolved(v.unwrap_or(0) + 1)));
        let p = pipe(steps).expect("non-empty");
        crate::assert_resolved!(p, STEPS);
        assert_eq!(p.last_progress().map(|p| p.done), Some(STEPS));
        crate::test_complete!("pipe_of_synchronous_steps_runs_without_nesting");
    }

    #[test]
    fn pipe_mixes_pending_and_synchronous_steps() {
        init_test("pipe_mixes_pending_and_synchronous_steps");
        let lab = test_lab();
        let l1 = Arc::clone(&lab);
        let mut steps = vec![Operand::call(move || after(&l1, 5, 0))];
        steps.extend((0..3_000).map(|_| {
            Operand::using(|v: Option<i32>| Promise::resolved(v.unwrap_or(0) + 1))
        }));
        let p = pipe(steps).expect("non-empty");
        crate::assert_pending!(p);
        lab.run_until_idle();
        crate::assert_resolved!(p, 3_000);
        crate::test_complete!("pipe_mixes_pending_and_synchronous_steps");
    }

    #[test]
    fn pipe_rejects_empty_step_list() {
        init_test("pipe_rejects_empty_step_list");
        let err = pipe::<i32, (), (), _>(Vec::new()).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NoOperands);
        crate::test_complete!("pipe_rejects_empty_step_list");
    }

    #[test]
    fn pipe_single_presettled_step() {
        init_test("pipe_single_presettled_step");
        let p: Promise<&str, ()> = Promise::resolved("only");
        let out = pipe(vec![Operand::from(p)]).expect("non-empty");
        crate::assert_resolved!(out, "only");
        let last = out.last_progress().expect("progress");
        assert!(last.is_complete());
        assert_eq!(last.message(), "1/1");
        crate::test_complete!("pipe_single_presettled_step");
    }
}
