//! Lock-guarded aggregation state feeding a completion gate.
//!
//! Every report from every producer of one invocation funnels through a
//! single [`Tally`]. The critical section is:
//!
//! ```text
//! report(index, value):
//!   lock
//!     if closed: drop value
//!     if first report from index: remaining -= 1
//!     fold(acc, value)
//!     if short-circuit and is_final(acc, remaining == 0):
//!       gate.try_settle(output(acc)); closed = true
//!   unlock
//! ```
//!
//! Becoming final and settling happen under the same lock, so two
//! reporters can never both believe they settled the verdict. Once closed,
//! the accumulator never changes again.

use core::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;

use crate::policy::AggregationPolicy;
use crate::sync::gate::CompletionGate;

/// Whether a tally consults the policy's short-circuit rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyMode {
    /// Settle the gate as soon as the policy declares the verdict final.
    ShortCircuit,
    /// Fold every report until the tally is closed; never settle early.
    Accumulate,
}

struct TallyState<S> {
    acc: S,
    remaining: usize,
    reported: Vec<bool>,
    reports: u64,
    closed: bool,
}

/// Aggregation state plus remaining-producer counter for one invocation.
pub struct Tally<V, P: AggregationPolicy<V>> {
    policy: P,
    mode: TallyMode,
    invocation: u64,
    state: Mutex<TallyState<P::State>>,
    gate: CompletionGate<P::Output>,
    _v: PhantomData<fn(V)>,
}

impl<V, P: AggregationPolicy<V>> Tally<V, P> {
    /// Creates a tally for `producers` producers.
    ///
    /// With zero producers the gate starts settled with the policy's
    /// empty-set verdict and the tally starts closed.
    pub fn new(policy: P, producers: usize, mode: TallyMode, invocation: u64) -> Self {
        let acc = policy.initial_state();
        let empty = producers == 0;
        let gate = if empty {
            CompletionGate::settled(policy.on_producer_set_empty())
        } else {
            CompletionGate::new()
        };
        Self {
            policy,
            mode,
            invocation,
            state: Mutex::new(TallyState {
                acc,
                remaining: producers,
                reported: vec![false; producers],
                reports: 0,
                closed: empty,
            }),
            gate,
            _v: PhantomData,
        }
    }

    /// Folds one report from producer `index`.
    pub fn report(&self, index: usize, value: V) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            tracing::trace!(
                invocation = self.invocation,
                producer = index,
                "late report ignored"
            );
            return;
        }
        if let Some(seen) = state.reported.get_mut(index) {
            if !*seen {
                *seen = true;
                state.remaining -= 1;
            }
        }
        state.reports += 1;
        self.policy.fold(&mut state.acc, value);
        tracing::trace!(
            invocation = self.invocation,
            producer = index,
            remaining = state.remaining,
            reports = state.reports,
            "report folded"
        );

        if self.mode == TallyMode::Accumulate {
            return;
        }
        if self.policy.is_final(&state.acc, state.remaining == 0) {
            let verdict = self.policy.output(&state.acc);
            state.closed = true;
            if self.gate.try_settle(verdict) {
                tracing::debug!(
                    invocation = self.invocation,
                    producer = index,
                    reports = state.reports,
                    "verdict settled"
                );
            }
        }
    }

    /// Current verdict, without closing the tally.
    #[must_use]
    pub fn snapshot(&self) -> P::Output {
        let state = self.state.lock();
        self.policy.output(&state.acc)
    }

    /// Closes the tally and returns the verdict as of now.
    ///
    /// Reports arriving afterwards are dropped.
    pub fn close(&self) -> P::Output {
        let mut state = self.state.lock();
        state.closed = true;
        tracing::trace!(
            invocation = self.invocation,
            reports = state.reports,
            remaining = state.remaining,
            "tally closed"
        );
        if state.reported.is_empty() {
            return self.policy.on_producer_set_empty();
        }
        self.policy.output(&state.acc)
    }

    /// Marks the tally closed without reading it.
    pub(crate) fn seal(&self) {
        self.state.lock().closed = true;
    }

    /// Producers that have not reported yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    /// Total reports folded so far.
    #[must_use]
    pub fn reports(&self) -> u64 {
        self.state.lock().reports
    }

    /// The gate this tally settles.
    #[must_use]
    pub fn gate(&self) -> &CompletionGate<P::Output> {
        &self.gate
    }

    /// Invocation id used in logs.
    #[must_use]
    pub const fn invocation(&self) -> u64 {
        self.invocation
    }

    /// Name of the policy.
    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}

impl<V, P: AggregationPolicy<V>> fmt::Debug for Tally<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Tally")
            .field("policy", &self.policy.name())
            .field("mode", &self.mode)
            .field("invocation", &self.invocation)
            .field("remaining", &state.remaining)
            .field("reports", &state.reports)
            .field("closed", &state.closed)
            .field("gate", &self.gate.phase())
            .finish()
    }
}
