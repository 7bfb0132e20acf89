#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use flowq::combinator::Operand;
use flowq::lab::{LabConfig, LabScheduler};
use flowq::time::Scheduler;
use flowq::{Deferred, Payload, Promise, Q};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();

/// Seed used for property tests under CI when `FLOWQ_PROPTEST_SEED` is unset.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

/// Proptest settings for `cases` cases.
///
/// `FLOWQ_PROPTEST_SEED` pins the RNG seed; under CI a fixed default is
/// used. An explicit `PROPTEST_RNG_SEED` still wins.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    let seed = std::env::var("FLOWQ_PROPTEST_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .or_else(|| std::env::var("CI").is_ok().then_some(DEFAULT_PROPTEST_SEED));
    if let (RngSeed::Random, Some(seed)) = (&config.rng_seed, seed) {
        config.rng_seed = RngSeed::Fixed(seed);
    }
    config
}

/// Installs a trace-level test subscriber once per test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Create a lab scheduler for testing.
#[must_use]
pub fn test_lab() -> Arc<LabScheduler> {
    Arc::new(LabScheduler::new(LabConfig::default()))
}

/// Create a lab scheduler and a namespace object running on it.
#[must_use]
pub fn test_q() -> (Arc<LabScheduler>, Q) {
    let lab = test_lab();
    let q = Q::with_defaults(lab.clone());
    (lab, q)
}

/// A promise settling with `outcome` after `ms` of lab time.
pub fn settle_after<T: Payload, E: Payload>(
    lab: &LabScheduler,
    ms: u64,
    outcome: Result<T, E>,
) -> Promise<T, E> {
    let deferred = Deferred::new();
    let settler = deferred.clone();
    lab.schedule(
        Duration::from_millis(ms),
        Box::new(move || {
            settler.settle(outcome.into());
        }),
    );
    deferred.promise()
}

/// An operand settling with `outcome` after `ms` of lab time.
pub fn delayed<T: Payload, E: Payload>(
    lab: &LabScheduler,
    ms: u64,
    outcome: Result<T, E>,
) -> Operand<T, E> {
    settle_after(lab, ms, outcome).into()
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that a promise has resolved with a specific value.
#[macro_export]
macro_rules! assert_resolved {
    ($promise:expr, $expected:expr) => {
        match $promise.settled() {
            Some(::flowq::Settled::Resolved(v)) => assert_eq!(v, $expected),
            other => panic!("expected Resolved({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise has rejected with a specific reason.
#[macro_export]
macro_rules! assert_rejected {
    ($promise:expr, $expected:expr) => {
        match $promise.settled() {
            Some(::flowq::Settled::Rejected(e)) => assert_eq!(e, $expected),
            other => panic!("expected Rejected({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise is still pending.
#[macro_export]
macro_rules! assert_pending {
    ($promise:expr) => {
        match $promise.settled() {
            None => {}
            Some(other) => panic!("expected pending, got {:?}", other),
        }
    };
}
