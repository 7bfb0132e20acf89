//! Adapters from callback-style APIs to promises.
//!
//! - [`defer`]: a callable that reports through success/error callbacks
//! - [`event_object`]: an object that reports through named event slots

pub mod defer;
pub mod event_object;

pub use defer::{Callbacks, Defer, DeferError, OnError, OnSuccess, DEFAULT_TIMEOUT};
pub use event_object::{
    defer_object, EventNames, EventPromise, EventRejection, EventTarget, Handler,
};
