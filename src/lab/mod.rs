//! Deterministic lab scheduler for testing.
//!
//! The lab provides:
//!
//! - Virtual time (no wall-clock dependencies)
//! - Deterministic task order (deadline, then scheduling order)
//! - A step limit that turns runaway rescheduling into a test failure

pub mod config;
pub mod scheduler;
pub mod timer_queue;

pub use config::{LabConfig, StepLimit};
pub use scheduler::LabScheduler;
pub use timer_queue::{Due, QueueKey, TimerQueue};
