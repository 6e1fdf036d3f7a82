//! Error types for fan-out checks.
//!
//! Failures surface synchronously to the caller of an entry point; nothing
//! is retried or masked internally.
//!
//! # Error Categories
//!
//! - **TimedOut**: an await-style check did not settle within its timeout.
//!   This usually means a producer never reported, or reported too slowly.
//! - **InvalidConfig**: a configuration source was rejected.
//!
//! Panics raised by a policy predicate are not errors of this crate. They
//! unwind the reporting thread and are the caller's responsibility.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigError;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The completion gate did not settle before the timeout elapsed.
    TimedOut,
    /// Configuration was invalid or could not be loaded.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns a short, stable name for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimedOut => "timed out",
            Self::InvalidConfig => "invalid config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`CompletionGate::wait`](crate::sync::CompletionGate::wait)
/// when the gate is still pending at the deadline.
///
/// Producers are not cancelled when this is returned; they may keep
/// reporting into a gate nobody waits on anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    timeout: Duration,
}

impl TimedOut {
    /// Creates a new `TimedOut` for the given wait bound.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the bound that was exceeded.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no verdict within {}ms", self.timeout.as_millis())
    }
}

impl std::error::Error for TimedOut {}

/// The main error type for fan-out checks.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    timeout: Option<Duration>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            timeout: None,
        }
    }

    /// Creates a timeout error for the given wait bound.
    #[must_use]
    pub const fn timed_out(timeout: Duration) -> Self {
        Self {
            kind: ErrorKind::TimedOut,
            message: None,
            source: None,
            timeout: Some(timeout),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut)
    }

    /// Returns the wait bound for timeout errors.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attaches the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(timeout) = self.timeout {
            write!(f, " after {}ms", timeout.as_millis())?;
        }
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

impl From<TimedOut> for Error {
    fn from(err: TimedOut) -> Self {
        Self::timed_out(err.timeout())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(err.to_string())
            .with_source(err)
    }
}

/// A specialized `Result` type for fan-out checks.
pub type Result<T> = core::result::Result<T, Error>;
