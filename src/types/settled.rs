//! Two-valued settlement of a promise.
//!
//! A promise is either still pending or it has settled exactly once:
//!
//! - `Resolved(T)`: success with a value
//! - `Rejected(E)`: failure with a reason
//!
//! [`PromiseState`] is the value-free view used for state queries.

use core::fmt;
use serde::{Deserialize, Serialize};

/// The observable state of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    /// Not settled yet.
    Pending,
    /// Settled successfully.
    Resolved,
    /// Settled with a failure.
    Rejected,
}

impl PromiseState {
    /// Returns true once the promise has left `Pending`.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// The terminal outcome of a promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settled<T, E> {
    /// Success with a value.
    Resolved(T),
    /// Failure with a reason.
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    /// Returns the state this outcome corresponds to.
    #[must_use]
    pub const fn state(&self) -> PromiseState {
        match self {
            Self::Resolved(_) => PromiseState::Resolved,
            Self::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// Returns true if this is `Resolved`.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns true if this is `Rejected`.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Resolved(v) => Ok(v),
            Self::Rejected(e) => Err(e),
        }
    }

    /// Swaps the two polarities: a success becomes a failure and vice versa.
    #[must_use]
    pub fn swap(self) -> Settled<E, T> {
        match self {
            Self::Resolved(v) => Settled::Rejected(v),
            Self::Rejected(e) => Settled::Resolved(e),
        }
    }

    /// Maps the success value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Settled<U, E> {
        match self {
            Self::Resolved(v) => Settled::Resolved(f(v)),
            Self::Rejected(e) => Settled::Rejected(e),
        }
    }

    /// Maps the failure reason.
    pub fn map_err<F2, G: FnOnce(E) -> F2>(self, g: G) -> Settled<T, F2> {
        match self {
            Self::Resolved(v) => Settled::Resolved(v),
            Self::Rejected(e) => Settled::Rejected(g(e)),
        }
    }

    /// Returns the success value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Resolved(v) => v,
            Self::Rejected(_) => default,
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Resolved(v),
            Err(e) => Self::Rejected(e),
        }
    }
}

impl<T, E> From<Settled<T, E>> for Result<T, E> {
    fn from(settled: Settled<T, E>) -> Self {
        settled.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_matches_variant() {
        let ok: Settled<i32, &str> = Settled::Resolved(1);
        let err: Settled<i32, &str> = Settled::Rejected("no");
        assert_eq!(ok.state(), PromiseState::Resolved);
        assert_eq!(err.state(), PromiseState::Rejected);
        assert!(ok.state().is_settled());
        assert!(!PromiseState::Pending.is_settled());
    }

    #[test]
    fn swap_twice_is_identity() {
        let ok: Settled<i32, &str> = Settled::Resolved(7);
        assert_eq!(ok.clone().swap().swap(), ok);

        let swapped = Settled::<i32, &str>::Rejected("gone").swap();
        assert_eq!(swapped, Settled::Resolved("gone"));
    }

    #[test]
    fn result_conversions() {
        let settled: Settled<i32, String> = Ok(3).into();
        assert!(settled.is_resolved());
        let back: Result<i32, String> = settled.into();
        assert_eq!(back, Ok(3));

        let failed: Settled<i32, &str> = Err("x").into();
        assert!(failed.is_rejected());
        assert_eq!(failed.unwrap_or(9), 9);
    }

    #[test]
    fn map_and_map_err() {
        let ok: Settled<i32, i32> = Settled::Resolved(2);
        assert_eq!(ok.map(|v| v * 10), Settled::Resolved(20));

        let err: Settled<i32, i32> = Settled::Rejected(2);
        assert_eq!(err.map_err(|e| e + 1), Settled::Rejected(3));
    }

    #[test]
    fn state_display() {
        assert_eq!(PromiseState::Pending.to_string(), "pending");
        assert_eq!(PromiseState::Rejected.to_string(), "rejected");
    }
}
