//! Aggregation policies: how reports fold into a verdict.
//!
//! A policy is a pure fold over reported values plus a short-circuit rule
//! that says when the verdict can no longer change. Policies never touch
//! anything outside the state they are handed; locking and settlement are
//! the [`Tally`](crate::sync::Tally)'s job.
//!
//! # Built-in Policies
//!
//! | Policy | Fold | Final when | Empty set |
//! |--------|------|------------|-----------|
//! | [`Exists`] | true on first match | matched, or every producer reported | `false` |
//! | [`ForAll`] | false on first violation | violated, or every producer reported | `true` |
//! | [`CaptureAll`] | append in arrival order | every producer reported | `[]` |
//!
//! A producer that never reports keeps "every producer reported" from ever
//! holding. Such a check settles early only through a match (`Exists`) or a
//! violation (`ForAll`) from another producer, or else runs into the
//! timeout.

use core::fmt;
use std::marker::PhantomData;

/// A fold over reported values with a short-circuit rule.
pub trait AggregationPolicy<V>: Send + Sync + 'static {
    /// Running accumulator.
    type State: Send;
    /// Verdict handed back to the caller.
    type Output: Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Fresh accumulator for one invocation.
    fn initial_state(&self) -> Self::State;

    /// Folds one reported value into the accumulator.
    fn fold(&self, state: &mut Self::State, value: V);

    /// Returns true once the verdict is determined.
    ///
    /// `all_reported` is true once every producer has reported at least
    /// one value.
    fn is_final(&self, state: &Self::State, all_reported: bool) -> bool;

    /// Reads the verdict out of the accumulator.
    fn output(&self, state: &Self::State) -> Self::Output;

    /// Verdict for a set with no producers, decided without waiting.
    fn on_producer_set_empty(&self) -> Self::Output;
}

/// True iff some report satisfies the predicate.
#[derive(Clone)]
pub struct Exists<F> {
    predicate: F,
}

impl<F> Exists<F> {
    /// Creates the policy.
    pub const fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> fmt::Debug for Exists<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exists").finish_non_exhaustive()
    }
}

impl<V, F> AggregationPolicy<V> for Exists<F>
where
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    type State = bool;
    type Output = bool;

    fn name(&self) -> &'static str {
        "exists"
    }

    fn initial_state(&self) -> bool {
        false
    }

    fn fold(&self, matched: &mut bool, value: V) {
        if !*matched && (self.predicate)(&value) {
            *matched = true;
        }
    }

    fn is_final(&self, matched: &bool, all_reported: bool) -> bool {
        *matched || all_reported
    }

    fn output(&self, matched: &bool) -> bool {
        *matched
    }

    fn on_producer_set_empty(&self) -> bool {
        false
    }
}

/// True iff every report satisfies the predicate.
#[derive(Clone)]
pub struct ForAll<F> {
    predicate: F,
}

impl<F> ForAll<F> {
    /// Creates the policy.
    pub const fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> fmt::Debug for ForAll<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForAll").finish_non_exhaustive()
    }
}

impl<V, F> AggregationPolicy<V> for ForAll<F>
where
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    type State = bool;
    type Output = bool;

    fn name(&self) -> &'static str {
        "forall"
    }

    fn initial_state(&self) -> bool {
        true
    }

    fn fold(&self, holds: &mut bool, value: V) {
        if *holds && !(self.predicate)(&value) {
            *holds = false;
        }
    }

    fn is_final(&self, holds: &bool, all_reported: bool) -> bool {
        !*holds || all_reported
    }

    fn output(&self, holds: &bool) -> bool {
        *holds
    }

    fn on_producer_set_empty(&self) -> bool {
        true
    }
}

/// Captures every report in arrival order.
///
/// Arrival order across concurrent producers is whatever order their
/// reports reached the lock; it is not producer-set order.
pub struct CaptureAll<V> {
    _v: PhantomData<fn(V)>,
}

impl<V> CaptureAll<V> {
    /// Creates the policy.
    #[must_use]
    pub const fn new() -> Self {
        Self { _v: PhantomData }
    }
}

impl<V> Default for CaptureAll<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for CaptureAll<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for CaptureAll<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaptureAll")
    }
}

impl<V> AggregationPolicy<V> for CaptureAll<V>
where
    V: Clone + Send + 'static,
{
    type State = Vec<V>;
    type Output = Vec<V>;

    fn name(&self) -> &'static str {
        "capture_all"
    }

    fn initial_state(&self) -> Vec<V> {
        Vec::new()
    }

    fn fold(&self, captured: &mut Vec<V>, value: V) {
        captured.push(value);
    }

    fn is_final(&self, _captured: &Vec<V>, all_reported: bool) -> bool {
        all_reported
    }

    fn output(&self, captured: &Vec<V>) -> Vec<V> {
        captured.clone()
    }

    fn on_producer_set_empty(&self) -> Vec<V> {
        Vec::new()
    }
}
