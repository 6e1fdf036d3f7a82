//! Test utilities for fan-out checks.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Producer constructors with controlled latency
//!
//! # Example
//! ```ignore
//! use fanout_check::test_utils::{delayed, init_test_logging};
//!
//! init_test_logging();
//! let producer = delayed(std::time::Duration::from_millis(100), "late");
//! ```

use std::sync::Once;
use std::thread;
use std::time::Duration;

use tracing_subscriber::fmt::format::FmtSpan;

use crate::producer::{Producer, Reporter};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// A producer that reports `value` once, `delay` after it starts, from
/// its own thread.
pub fn delayed<V: Send + 'static>(delay: Duration, value: V) -> Producer<V> {
    Producer::new(move |reporter: Reporter<V>| {
        thread::sleep(delay);
        reporter.report(value);
    })
}

/// A producer that reports each value from its own thread, sleeping
/// `gap` before each one.
pub fn paced<V: Send + 'static>(gap: Duration, values: Vec<V>) -> Producer<V> {
    Producer::new(move |reporter: Reporter<V>| {
        for value in values {
            thread::sleep(gap);
            reporter.report(value);
        }
    })
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}
