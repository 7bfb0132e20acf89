//! flowq: promise combinators for single-value asynchronous computations.
//!
//! # Overview
//!
//! flowq composes promises. A [`Promise`] settles once, as resolved or
//! rejected, and may publish progress before it does. On top of that
//! primitive the crate provides higher-order helpers that combine promises
//! into pipelines, fan-out/fan-in groups and modified outcomes, plus
//! adapters that turn callback-style APIs into promises.
//!
//! # Core Guarantees
//!
//! - **Single settlement**: a promise settles at most once; late writes are no-ops
//! - **Replay**: subscribers registered after settlement still see the outcome
//! - **Ordered slots**: group results keep operand order whatever the settle order
//! - **No blocking**: anything delayed goes through a [`time::Scheduler`]
//! - **Deterministic testing**: the [`lab`] scheduler runs on virtual time
//!
//! # Module Structure
//!
//! - [`types`]: settled outcomes, progress snapshots, flow values
//! - [`promise`]: the [`Deferred`]/[`Promise`] pair
//! - [`time`]: the scheduler seam and the `wait` delay
//! - [`lab`]: deterministic virtual-time scheduler
//! - [`combinator`]: pipe, groups, modifiers and the named-operator registry
//! - [`adapter`]: callback and event-object adapters
//! - [`namespace`]: the [`Q`] object bundling everything
//! - [`host`]: named-method lookup for operands
//! - [`debug`]: pre-settled promises for tests
//! - [`config`]: tunables and layered loading
//! - [`error`]: construction errors
//! - [`tracing_compat`]: optional structured logging

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod adapter;
pub mod combinator;
pub mod config;
pub mod debug;
pub mod error;
pub mod host;
pub mod lab;
pub mod namespace;
pub mod promise;
pub mod time;
pub mod tracing_compat;
pub mod types;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use config::{ConfigError, ConfigLoader, FlowConfig};
pub use error::{Error, ErrorCategory, ErrorKind, Result, ResultExt};
pub use namespace::Q;
pub use promise::{Deferred, Promise};
pub use types::{Flow, Payload, Progress, PromiseState, Settled};
