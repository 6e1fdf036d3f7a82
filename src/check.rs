//! Entry points: run a producer set under a policy and a wait strategy.
//!
//! [`Checker`] carries its timeout explicitly, so two checkers with
//! different bounds never interfere. The free functions build a checker
//! from a snapshot of the process-wide default taken at call start.
//!
//! | Operation | Strategy | Result |
//! |-----------|----------|--------|
//! | [`start`] | fire-and-forget | `()` |
//! | [`exists`], [`forall`], [`capture_all`] | await-completion | `Result<_>` |
//! | [`delayed_exists`], [`delayed_forall`], [`delayed_capture`] | fixed-delay | value |
//!
//! Every operation accepts an empty producer set and returns the policy's
//! empty-set verdict at once: `false`, `true`, `[]`.
//!
//! # Example
//!
//! ```
//! use fanout_check::{Checker, Producer, ProducerSet};
//! use std::time::Duration;
//!
//! let producers = ProducerSet::from(vec![
//!     Producer::reporting(["Case1"]),
//!     Producer::reporting(["Case2"]),
//!     Producer::reporting(["Case3"]),
//! ]);
//! let checker = Checker::with_timeout(Duration::from_millis(500));
//! assert!(checker.exists(|v: &&str| *v == "Case2", producers).unwrap());
//! ```

use std::time::Duration;

use crate::config::CheckConfig;
use crate::error::{Error, Result};
use crate::policy::{AggregationPolicy, CaptureAll, Exists, ForAll};
use crate::producer::ProducerSet;
use crate::strategy;

/// Runs checks with an explicit timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checker {
    config: CheckConfig,
}

impl Checker {
    /// Creates a checker from a config.
    #[must_use]
    pub const fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    /// Creates a checker with the given timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self::new(CheckConfig::new(timeout))
    }

    /// Creates a checker from the current process-wide default.
    #[must_use]
    pub fn from_global() -> Self {
        Self::new(CheckConfig::from_global())
    }

    /// The config this checker runs with.
    #[must_use]
    pub const fn config(&self) -> CheckConfig {
        self.config
    }

    /// The await-completion bound.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Runs `policy` under await-completion.
    pub fn await_policy<V, P>(&self, policy: P, producers: ProducerSet<V>) -> Result<P::Output>
    where
        V: 'static,
        P: AggregationPolicy<V>,
        P::Output: Clone,
    {
        let name = policy.name();
        strategy::await_completion(policy, producers, self.config.timeout)
            .map_err(|err| Error::from(err).with_message(name))
    }

    /// Runs `policy` under fixed-delay.
    pub fn delayed_policy<V, P>(
        &self,
        delay: Duration,
        policy: P,
        producers: ProducerSet<V>,
    ) -> P::Output
    where
        V: 'static,
        P: AggregationPolicy<V>,
    {
        strategy::fixed_delay(policy, producers, delay)
    }

    /// True iff some report satisfies `predicate`.
    pub fn exists<V, F>(&self, predicate: F, producers: ProducerSet<V>) -> Result<bool>
    where
        V: 'static,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.await_policy(Exists::new(predicate), producers)
    }

    /// True iff every report satisfies `predicate`.
    pub fn forall<V, F>(&self, predicate: F, producers: ProducerSet<V>) -> Result<bool>
    where
        V: 'static,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.await_policy(ForAll::new(predicate), producers)
    }

    /// Every report, in arrival order, once each producer has reported.
    pub fn capture_all<V>(&self, producers: ProducerSet<V>) -> Result<Vec<V>>
    where
        V: Clone + Send + 'static,
    {
        self.await_policy(CaptureAll::new(), producers)
    }

    /// True iff some report within `delay` satisfies `predicate`.
    pub fn delayed_exists<V, F>(
        &self,
        delay: Duration,
        predicate: F,
        producers: ProducerSet<V>,
    ) -> bool
    where
        V: 'static,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.delayed_policy(delay, Exists::new(predicate), producers)
    }

    /// True iff every report within `delay` satisfies `predicate`.
    pub fn delayed_forall<V, F>(
        &self,
        delay: Duration,
        predicate: F,
        producers: ProducerSet<V>,
    ) -> bool
    where
        V: 'static,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.delayed_policy(delay, ForAll::new(predicate), producers)
    }

    /// Every report that arrived within `delay`, in arrival order.
    pub fn delayed_capture<V>(&self, delay: Duration, producers: ProducerSet<V>) -> Vec<V>
    where
        V: Clone + Send + 'static,
    {
        self.delayed_policy(delay, CaptureAll::new(), producers)
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::from_global()
    }
}

/// Starts every producer and returns without observing anything.
pub fn start<V: 'static>(producers: ProducerSet<V>) {
    strategy::fire_and_forget(producers);
}

/// True iff some report satisfies `predicate`, bounded by the default
/// timeout.
pub fn exists<V, F>(predicate: F, producers: ProducerSet<V>) -> Result<bool>
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    Checker::from_global().exists(predicate, producers)
}

/// True iff every report satisfies `predicate`, bounded by the default
/// timeout.
pub fn forall<V, F>(predicate: F, producers: ProducerSet<V>) -> Result<bool>
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    Checker::from_global().forall(predicate, producers)
}

/// Every report once each producer has reported, bounded by the default
/// timeout.
pub fn capture_all<V>(producers: ProducerSet<V>) -> Result<Vec<V>>
where
    V: Clone + Send + 'static,
{
    Checker::from_global().capture_all(producers)
}

/// True iff some report within `delay` satisfies `predicate`.
pub fn delayed_exists<V, F>(delay: Duration, predicate: F, producers: ProducerSet<V>) -> bool
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    strategy::fixed_delay(Exists::new(predicate), producers, delay)
}

/// True iff every report within `delay` satisfies `predicate`.
pub fn delayed_forall<V, F>(delay: Duration, predicate: F, producers: ProducerSet<V>) -> bool
where
    V: 'static,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    strategy::fixed_delay(ForAll::new(predicate), producers, delay)
}

/// Every report that arrived within `delay`, in arrival order.
pub fn delayed_capture<V>(delay: Duration, producers: ProducerSet<V>) -> Vec<V>
where
    V: Clone + Send + 'static,
{
    strategy::fixed_delay(CaptureAll::new(), producers, delay)
}
