//! Fanout-check: deterministic verdicts over concurrent, callback-driven producers.
//!
//! # Overview
//!
//! A check starts a set of independent producers, each handed a reporter
//! it may call any number of times from any thread, and folds everything
//! reported into one verdict under a bounded wait. It lets a caller observe
//! the effects of concurrently running units of work without races or
//! missed results.
//!
//! # Core Guarantees
//!
//! - **Exactly-once settlement**: the verdict is fixed by one atomic
//!   fold-check-settle step; racing reporters cannot both settle it
//! - **Bounded waits**: await-style checks fail with a timeout instead of
//!   hanging on a silent producer
//! - **Stable verdicts**: reports arriving after the verdict is fixed are
//!   accepted and dropped, never reflected in the result
//! - **No cancellation**: producers keep running after the verdict; the
//!   timeout bounds the caller's patience, not their lifetime
//!
//! # Module Structure
//!
//! - [`producer`]: Producers, reporters and ordered producer sets
//! - [`policy`]: Aggregation policies (`Exists`, `ForAll`, `CaptureAll`)
//! - [`sync`]: Completion gate and lock-guarded tally
//! - [`strategy`]: Fire-and-forget, await-completion and fixed-delay waits
//! - [`check`]: Entry points and the config-threaded [`Checker`]
//! - [`assertion`]: Pass/fail adapter for test frameworks
//! - [`config`]: Timeout configuration and layered loading
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use fanout_check::{Checker, Producer, ProducerSet};
//! use std::time::Duration;
//!
//! let producers = ProducerSet::from(vec![
//!     Producer::reporting([1, 1]),
//!     Producer::new(|reporter| reporter.report(2)),
//! ]);
//! let checker = Checker::with_timeout(Duration::from_secs(2));
//! assert!(!checker.forall(|v: &i32| *v == 1, producers).unwrap());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod assertion;
pub mod check;
pub mod config;
pub mod error;
pub mod policy;
pub mod producer;
pub mod strategy;
pub mod sync;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use assertion::{
    assert_any_report, assert_every_report, check_any, check_every, AssertionFailure,
};
pub use check::{
    capture_all, delayed_capture, delayed_exists, delayed_forall, exists, forall, start, Checker,
};
pub use config::{
    default_timeout, reset_default_timeout, set_default_timeout, CheckConfig, ConfigError,
    ConfigLoader, DEFAULT_TIMEOUT, MIN_TIMEOUT,
};
pub use error::{Error, ErrorKind, Result, TimedOut};
pub use policy::{AggregationPolicy, CaptureAll, Exists, ForAll};
pub use producer::{Producer, ProducerSet, ProducerSetBuilder, Reporter};
pub use strategy::{launch, Invocation, InvocationState, WaitStrategy};
pub use sync::{CompletionGate, GatePhase, Tally, TallyMode};
