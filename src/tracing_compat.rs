//! Tracing compatibility layer for structured logging.
//!
//! Combinators log through this module rather than through `tracing`
//! directly, so the dependency stays optional:
//!
//! - **With `tracing-integration`** (the default): re-exports the `tracing`
//!   macros.
//! - **Without it**: no-op macros that expand to nothing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use flowq::tracing_compat::{debug, trace};
//!
//! debug!(combinator = "all_of", total = 3, "fan-out");
//! trace!(combinator = "all_of", slot = 1, "slot resolved");
//! ```
//!
//! Field names used across the crate: `combinator`, `slot`, `total`, `done`,
//! `step`, `delay_ms`.

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, debug_span, info, trace, warn, Span};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    //! Expands every logging call to nothing.

    /// No-op `trace!`.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op `debug!`.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op `info!`.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// No-op `warn!`.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    /// Evaluates to a [`Span`](crate::tracing_compat::Span) that records nothing.
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::tracing_compat::Span
        };
    }

    pub use crate::{debug, debug_span, info, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;

/// Stand-in span when tracing is off.
#[cfg(not(feature = "tracing-integration"))]
#[derive(Debug, Clone, Copy)]
pub struct Span;

#[cfg(not(feature = "tracing-integration"))]
impl Span {
    /// Enters nothing.
    #[inline]
    #[must_use]
    pub const fn enter(&self) -> SpanGuard {
        SpanGuard
    }
}

/// Guard returned by the stand-in [`Span::enter`].
#[cfg(not(feature = "tracing-integration"))]
#[derive(Debug)]
pub struct SpanGuard;

/// Opens the span every group combinator runs its fan-out in.
#[inline]
#[must_use]
#[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
pub fn combinator_span(combinator: &'static str, total: usize) -> Span {
    debug_span!("combinator", combinator, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    #[test]
    fn logging_macros_accept_fields() {
        init_test("logging_macros_accept_fields");
        trace!(combinator = "pipe", step = 1, "step resolved");
        debug!(combinator = "all_of", total = 3, "fan-out");
        info!("plain message");
        warn!(slot = 2, "late notify ignored");
        crate::test_complete!("logging_macros_accept_fields");
    }

    #[test]
    fn combinator_span_can_be_entered() {
        init_test("combinator_span_can_be_entered");
        let span = combinator_span("some_of", 4);
        {
            let _guard = span.enter();
            trace!(slot = 0, "inside the span");
        }
        crate::test_complete!("combinator_span_can_be_entered");
    }
}
