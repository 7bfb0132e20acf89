//! Core value types shared by the promise primitive and the combinators.
//!
//! - [`settled`]: terminal outcome (`Resolved`/`Rejected`) and promise state
//! - [`progress`]: progress snapshots emitted before settlement
//! - [`flow`]: tagged flow values threaded through pipes and groups

pub mod flow;
pub mod progress;
pub mod settled;

pub use flow::Flow;
pub use progress::Progress;
pub use settled::{PromiseState, Settled};

/// Bound shared by every value carried through a promise.
///
/// Values are cloned once per subscriber, and promises may be handed to a
/// scheduler running on another thread.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}
