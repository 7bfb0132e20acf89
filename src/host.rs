//! Named-method lookup on host objects.
//!
//! Pipelines sometimes name the step to call instead of passing a closure:
//! "call `details` on the flights service", or "call `details` on whatever
//! the previous step produced". [`MethodHost`] is how a type exposes such
//! methods. Resolution returns a plain function pointer, so a host stays an
//! ordinary struct and the lookup table is usually a `match` on the name.
//!
//! ```
//! use flowq::host::{Method, MethodHost};
//! use flowq::Promise;
//!
//! struct Counter { base: i64 }
//!
//! impl MethodHost<i64, String> for Counter {
//!     fn resolve_method(&self, name: &str) -> Option<Method<Self, i64, String>> {
//!         match name {
//!             "add" => Some(|host, args| Promise::resolved(host.base + args.iter().sum::<i64>())),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let counter = Counter { base: 10 };
//! let add = counter.resolve_method("add").expect("known method");
//! assert_eq!(add(&counter, vec![1, 2]).settled().map(|s| s.into_result()), Some(Ok(13)));
//! ```

use crate::promise::Promise;

/// A resolved method: receives the host and the positional arguments.
pub type Method<H, T, E, P = ()> = fn(&H, Vec<T>) -> Promise<T, E, P>;

/// A type whose methods can be looked up by name.
pub trait MethodHost<T, E, P = ()>: Sized {
    /// Returns the method called `name`, if the host has one.
    fn resolve_method(&self, name: &str) -> Option<Method<Self, T, E, P>>;
}
