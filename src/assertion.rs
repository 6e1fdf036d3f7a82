//! Assertion adapter for test frameworks.
//!
//! `check_*` turn a check into `Result<(), AssertionFailure>`, which a test
//! can return or inspect. `assert_*` (and the matching macros) panic with a
//! readable message instead, which is what `#[test]` treats as failure.
//! A timeout is always a failure, never a pass.

use std::time::Duration;

use crate::check::Checker;
use crate::error::Error;
use crate::producer::ProducerSet;

/// Why an assertion over reports failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssertionFailure {
    /// No report satisfied the predicate.
    #[error("expected at least one report to satisfy the predicate, none did")]
    NoMatch,
    /// Some report violated the predicate.
    #[error("expected every report to satisfy the predicate, one did not")]
    Violation,
    /// The check never reached a verdict.
    #[error("no verdict within {}ms", .timeout.as_millis())]
    TimedOut {
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The check failed for another reason.
    #[error("check failed: {0}")]
    Check(Error),
}

impl AssertionFailure {
    /// Returns true if the check timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

impl From<Error> for AssertionFailure {
    fn from(err: Error) -> Self {
        match err.timeout() {
            Some(timeout) if err.is_timeout() => Self::TimedOut { timeout },
            _ => Self::Check(err),
        }
    }
}

/// Passes iff at least one report satisfies `predicate`.
pub fn check_any<V, F>(
    checker: &Checker,
    predicate: F,
    producers: ProducerSet<V>,
) -> Result<(), AssertionFailure>
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    if checker.exists(predicate, producers)? {
        Ok(())
    } else {
        Err(AssertionFailure::NoMatch)
    }
}

/// Passes iff every report satisfies `predicate`.
pub fn check_every<V, F>(
    checker: &Checker,
    predicate: F,
    producers: ProducerSet<V>,
) -> Result<(), AssertionFailure>
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    if checker.forall(predicate, producers)? {
        Ok(())
    } else {
        Err(AssertionFailure::Violation)
    }
}

/// Panics unless at least one report satisfies `predicate`.
///
/// Uses the process-wide default timeout.
#[track_caller]
pub fn assert_any_report<V, F>(predicate: F, producers: ProducerSet<V>)
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    if let Err(failure) = check_any(&Checker::from_global(), predicate, producers) {
        panic!("assert_any_report failed: {failure}");
    }
}

/// Panics unless every report satisfies `predicate`.
///
/// Uses the process-wide default timeout.
#[track_caller]
pub fn assert_every_report<V, F>(predicate: F, producers: ProducerSet<V>)
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    if let Err(failure) = check_every(&Checker::from_global(), predicate, producers) {
        panic!("assert_every_report failed: {failure}");
    }
}

/// Asserts that at least one report satisfies a predicate.
///
/// ```
/// use fanout_check::{assert_reports_any, Producer, ProducerSet};
///
/// let producers = ProducerSet::from(vec![Producer::reporting([1, 2]), Producer::reporting([3])]);
/// assert_reports_any!(|v: &i32| *v == 3, producers);
/// ```
#[macro_export]
macro_rules! assert_reports_any {
    ($predicate:expr, $producers:expr $(,)?) => {
        $crate::assertion::assert_any_report($predicate, $producers)
    };
}

/// Asserts that every report satisfies a predicate.
#[macro_export]
macro_rules! assert_reports_all {
    ($predicate:expr, $producers:expr $(,)?) => {
        $crate::assertion::assert_every_report($predicate, $producers)
    };
}
