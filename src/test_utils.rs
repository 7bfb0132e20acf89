//! Test utilities for flowq.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase macros for readable test output
//! - Lab scheduler constructors
//! - Settlement assertion macros
//!
//! # Example
//! ```
//! use flowq::test_utils::{init_test_logging, test_lab};
//!
//! init_test_logging();
//! let lab = test_lab();
//! lab.run_until_idle();
//! ```

use crate::lab::{LabConfig, LabScheduler};
use crate::promise::{Deferred, Promise};
use crate::time::Scheduler;
use crate::types::Payload;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Create a lab scheduler with the default configuration.
#[must_use]
pub fn test_lab() -> Arc<LabScheduler> {
    Arc::new(LabScheduler::new(LabConfig::default()))
}

/// A promise that settles with `outcome` once `delay` of lab time passes.
pub fn settle_after<T: Payload, E: Payload>(
    lab: &LabScheduler,
    delay: Duration,
    outcome: core::result::Result<T, E>,
) -> Promise<T, E> {
    let deferred = Deferred::new();
    let settler = deferred.clone();
    lab.schedule(
        delay,
        Box::new(move || {
            settler.settle(outcome.into());
        }),
    );
    deferred.promise()
}

/// Records every progress value published on `promise`.
pub fn record_progress<T: Payload, E: Payload, P: Payload>(
    promise: &Promise<T, E, P>,
) -> Arc<parking_lot::Mutex<Vec<P>>> {
    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    promise.on_progress(move |p| sink.lock().push(p.clone()));
    log
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
            Some($crate::types::Settled::Resolved(v)) => assert_eq!(v, $expected),
            other => unreachable!("expected Resolved({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise has rejected with a specific reason.
#[macro_export]
macro_rules! assert_rejected {
    ($promise:expr, $expected:expr) => {
        match $promise.settled() {
            Some($crate::types::Settled::Rejected(e)) => assert_eq!(e, $expected),
            other => unreachable!("expected Rejected({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a promise is still pending.
#[macro_export]
macro_rules! assert_pending {
    ($promise:expr) => {
        match $promise.settled() {
            None => {}
            Some(other) => unreachable!("expected pending, got {:?}", other),
        }
    };
}
