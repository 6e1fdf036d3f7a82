#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Logging init, latency-controlled producers and the phase macros come
//! from `fanout_check::test_utils` (enabled through the self
//! dev-dependency's `test-internals` feature).
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use fanout_check::test_utils::{delayed, init_test_logging, init_test_logging_with_level, paced};
pub use fanout_check::{test_complete, test_phase, test_section};

use fanout_check::{Producer, ProducerSet};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::time::{Duration, Instant};

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "FANOUT_CHECK_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// One synchronous single-report producer per value.
pub fn single_reports<V: Clone + Send + 'static>(values: &[V]) -> ProducerSet<V> {
    values
        .iter()
        .cloned()
        .map(|value| Producer::reporting([value]))
        .collect()
}

/// Runs `f` and returns its result with the elapsed wall time.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
