//! Time primitives: the scheduler seam and the delay promise.
//!
//! - [`Scheduler`]: host-provided "run later" primitive
//! - [`wait`]: a promise that resolves with a value after a duration
//!
//! # Virtual vs Wall Time
//!
//! Nothing in this crate reads a clock directly. All delays go through a
//! [`Scheduler`], so the same combinator code runs on virtual time in the
//! lab and on whatever timer facility an embedding host provides.

mod scheduler;
mod wait;

pub use scheduler::{Scheduler, Task, TimerHandle};
pub use wait::{wait, Delay};
