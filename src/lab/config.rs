//! Lab scheduler settings.
//!
//! A [`LabConfig`] fixes where virtual time starts and how many tasks one
//! drain may run before the scheduler assumes a task keeps rescheduling
//! itself.

use std::time::Duration;

/// What the lab scheduler does when a drain hits its step limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepLimit {
    /// Fail the test.
    #[default]
    Panic,
    /// Stop draining and return the tasks run so far.
    Stop,
}

/// Lab scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Virtual time at which the scheduler starts.
    pub start: Duration,
    /// Tasks one drain may run; `None` for no limit.
    pub max_steps: Option<u64>,
    /// Reaction to reaching `max_steps`.
    pub on_step_limit: StepLimit,
}

/// Steps per drain unless configured otherwise.
pub const DEFAULT_MAX_STEPS: u64 = 100_000;

impl LabConfig {
    /// Starts at virtual time zero with [`DEFAULT_MAX_STEPS`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start: Duration::ZERO,
            max_steps: Some(DEFAULT_MAX_STEPS),
            on_step_limit: StepLimit::Panic,
        }
    }

    /// Starts virtual time at `start`.
    #[must_use]
    pub const fn start_at(mut self, start: Duration) -> Self {
        self.start = start;
        self
    }

    /// Limits one drain to `steps` tasks.
    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Lets a drain run any number of tasks.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Sets the reaction to the step limit.
    #[must_use]
    pub const fn on_step_limit(mut self, reaction: StepLimit) -> Self {
        self.on_step_limit = reaction;
        self
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_panic_at_the_step_limit() {
        let config = LabConfig::default();
        assert_eq!(config.start, Duration::ZERO);
        assert_eq!(config.max_steps, Some(DEFAULT_MAX_STEPS));
        assert_eq!(config.on_step_limit, StepLimit::Panic);
    }

    #[test]
    fn builders_chain() {
        let config = LabConfig::new()
            .start_at(Duration::from_secs(1))
            .max_steps(10)
            .on_step_limit(StepLimit::Stop);
        assert_eq!(config.start, Duration::from_secs(1));
        assert_eq!(config.max_steps, Some(10));
        assert_eq!(config.on_step_limit, StepLimit::Stop);
        assert_eq!(config.unbounded().max_steps, None);
    }
}
