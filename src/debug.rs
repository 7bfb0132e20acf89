//! Pre-settled and never-settling promises for tests and examples.
//!
//! ```
//! use flowq::debug::{failure, pending, success};
//! use flowq::PromiseState;
//!
//! assert_eq!(success::<_, ()>(1).state(), PromiseState::Resolved);
//! assert_eq!(failure::<(), _>("x").state(), PromiseState::Rejected);
//! assert_eq!(pending::<(), ()>().state(), PromiseState::Pending);
//! ```

use crate::promise::Promise;
use crate::types::Payload;

/// A promise already resolved with `value`.
#[must_use]
pub fn success<T: Payload, E: Payload>(value: T) -> Promise<T, E> {
    Promise::resolved(value)
}

/// A promise already rejected with `reason`.
#[must_use]
pub fn failure<T: Payload, E: Payload>(reason: E) -> Promise<T, E> {
    Promise::rejected(reason)
}

/// A promise that never settles.
#[must_use]
pub fn pending<T: Payload, E: Payload>() -> Promise<T, E> {
    Promise::pending()
}
