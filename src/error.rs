//! Error types and error handling strategy for flowq.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - **Construction errors** ([`Error`]): the call that builds a combinator
//!   was malformed (no operands, unknown operator or method name, an argument
//!   list with no room for a success callback). These are returned
//!   synchronously as `Err` and never become a rejection.
//! - **Rejections**: an operand failed at run time. Rejection values are the
//!   caller's own `E` type and flow through the combinators untouched
//!   (aggregated only where the combinator's policy says so).
//!
//! # Error Categories
//!
//! - **Construction**: empty operand lists, malformed arguments
//! - **Dispatch**: operator and method names that do not resolve
//! - **Adapter**: callback adapter contract violations
//! - **Config**: invalid configuration values
//! - **Internal**: library bugs and invalid states

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Construction ===
    /// A combinator was given zero operands.
    NoOperands,
    /// An argument list was malformed.
    InvalidArguments,
    /// A dynamic value did not have the expected shape.
    TypeMismatch,

    // === Dispatch ===
    /// An operator name did not resolve against the registry.
    UnknownOperator,
    /// A method name did not resolve on the host object.
    UnknownMethod,
    /// A flow value was required but none was supplied.
    MissingFlow,

    // === Adapter ===
    /// The callable promised to report errors but left no room for the callback.
    MissingErrorCallback,

    // === Config ===
    /// A configuration value was rejected.
    InvalidConfig,

    // === Internal ===
    /// Internal library error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NoOperands | Self::InvalidArguments | Self::TypeMismatch => {
                ErrorCategory::Construction
            }
            Self::UnknownOperator | Self::UnknownMethod | Self::MissingFlow => {
                ErrorCategory::Dispatch
            }
            Self::MissingErrorCallback => ErrorCategory::Adapter,
            Self::InvalidConfig => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns true if the error was detected before anything ran.
    ///
    /// Everything except [`ErrorKind::MissingFlow`] is raised synchronously
    /// by a constructor.
    #[must_use]
    pub const fn is_construction_time(&self) -> bool {
        !matches!(self, Self::MissingFlow)
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed combinator construction.
    Construction,
    /// Name resolution failures.
    Dispatch,
    /// Callback adapter contract violations.
    Adapter,
    /// Configuration failures.
    Config,
    /// Internal library errors.
    Internal,
}

/// The main error type for flowq operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates the error returned when a combinator receives no operands.
    #[must_use]
    pub fn no_operands(combinator: &str) -> Self {
        Self::new(ErrorKind::NoOperands)
            .with_message(format!("{combinator} requires at least one operand"))
    }

    /// Creates an unknown-operator error.
    #[must_use]
    pub fn unknown_operator(name: &str) -> Self {
        Self::new(ErrorKind::UnknownOperator).with_message(format!("no operator named `{name}`"))
    }

    /// Creates an unknown-method error.
    #[must_use]
    pub fn unknown_method(name: &str) -> Self {
        Self::new(ErrorKind::UnknownMethod).with_message(format!("no method named `{name}`"))
    }

    /// Creates an invalid-arguments error.
    #[must_use]
    pub fn invalid_arguments(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments).with_message(detail)
    }

    /// Creates a type-mismatch error for the dynamic layer.
    #[must_use]
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Self::new(ErrorKind::TypeMismatch).with_message(format!("expected {expected}, found {found}"))
    }

    /// Creates an internal error (library bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    fn prefixed(self, context: String) -> Self {
        let message = match &self.message {
            Some(msg) => format!("{context}: {msg}"),
            None => context,
        };
        self.with_message(message)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(e.to_string())
            .with_source(e)
    }
}

/// Extension trait for adding context to Results.
///
/// The context is prefixed to any message the error already carries.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().prefixed(msg.into()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().prefixed(f()))
    }
}

/// A specialized Result type for flowq operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Underlying;

    impl fmt::Display for Underlying {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "underlying")
        }
    }

    impl std::error::Error for Underlying {}

    #[test]
    fn display_without_message() {
        let err = Error::new(ErrorKind::Internal);
        assert_eq!(err.to_string(), "Internal");
    }

    #[test]
    fn display_with_message() {
        let err = Error::no_operands("all_of");
        assert_eq!(
            err.to_string(),
            "NoOperands: all_of requires at least one operand"
        );
    }

    #[test]
    fn source_chain_is_exposed() {
        let err = Error::internal("outer").with_source(Underlying);
        let source = err.source().expect("source missing");
        assert_eq!(source.to_string(), "underlying");
    }

    #[test]
    fn categories() {
        assert_eq!(
            ErrorKind::NoOperands.category(),
            ErrorCategory::Construction
        );
        assert_eq!(ErrorKind::UnknownMethod.category(), ErrorCategory::Dispatch);
        assert_eq!(
            ErrorKind::MissingErrorCallback.category(),
            ErrorCategory::Adapter
        );
        assert!(ErrorKind::UnknownOperator.is_construction_time());
        assert!(!ErrorKind::MissingFlow.is_construction_time());
    }

    #[test]
    fn result_ext_adds_message() {
        let res: core::result::Result<(), Error> = Err(Error::new(ErrorKind::InvalidArguments));
        let err = res.context("bad call").expect_err("expected err");
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert_eq!(err.to_string(), "InvalidArguments: bad call");

        let res: core::result::Result<(), Error> = Err(Error::unknown_method("shout"));
        let err = res.with_context(|| "operator `pipe`".to_owned()).expect_err("expected err");
        assert_eq!(err.kind(), ErrorKind::UnknownMethod);
        assert!(err.to_string().starts_with("UnknownMethod: operator `pipe`: "), "{err}");
    }

    #[test]
    fn equality_ignores_source() {
        let a = Error::unknown_operator("nope");
        let b = Error::unknown_operator("nope").with_source(Underlying);
        assert_eq!(a, b);
        assert_ne!(a, Error::unknown_method("nope"));
    }
}
