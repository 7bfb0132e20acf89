//! Flow values threaded between combinator steps.
//!
//! A pipe hands each step the previous step's result. Whether that value is
//! an input for the step itself or something to fan out to the step's own
//! operands is carried explicitly by the tag:
//!
//! - [`Flow::Direct`]: the value is the step's argument. A group combinator
//!   receiving a direct value treats it as one more, already resolved operand.
//! - [`Flow::Threaded`]: the value is distributed to every operand of the
//!   receiving group combinator.

use serde::{Deserialize, Serialize};

/// A value flowing from one step into the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow<T> {
    /// Passed to the next step as its argument.
    Direct(T),
    /// Distributed to every operand of the next combinator.
    Threaded(T),
}

impl<T> Flow<T> {
    /// Returns the carried value, dropping the tag.
    pub fn into_inner(self) -> T {
        match self {
            Self::Direct(v) | Self::Threaded(v) => v,
        }
    }

    /// Borrows the carried value.
    pub const fn value(&self) -> &T {
        match self {
            Self::Direct(v) | Self::Threaded(v) => v,
        }
    }

    /// Returns true for [`Flow::Threaded`].
    #[must_use]
    pub const fn is_threaded(&self) -> bool {
        matches!(self, Self::Threaded(_))
    }

    /// Re-tags the value as threaded.
    #[must_use]
    pub fn threaded(self) -> Self {
        Self::Threaded(self.into_inner())
    }

    /// Maps the carried value, keeping the tag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Flow<U> {
        match self {
            Self::Direct(v) => Flow::Direct(f(v)),
            Self::Threaded(v) => Flow::Threaded(f(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_preserved_by_map() {
        let f = Flow::Threaded(2).map(|v| v + 1);
        assert_eq!(f, Flow::Threaded(3));
        assert!(f.is_threaded());
        assert_eq!(Flow::Direct("a").map(str::len), Flow::Direct(1));
    }

    #[test]
    fn threaded_retags_direct() {
        let f = Flow::Direct(5).threaded();
        assert!(f.is_threaded());
        assert_eq!(*f.value(), 5);
        assert_eq!(f.into_inner(), 5);
    }
}
