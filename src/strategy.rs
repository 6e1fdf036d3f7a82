//! Wait strategies: how long the caller blocks on one invocation.
//!
//! Every strategy starts the whole producer set against one shared
//! dispatch callback and then differs only in how it waits:
//!
//! - **Fire-and-forget**: start and return. [`fire_and_forget`] hands out
//!   no-op reporters; [`launch`] keeps the aggregation wired up and returns
//!   an [`Invocation`] the caller can inspect later.
//! - **Await-completion**: block until the policy settles the gate or the
//!   timeout elapses. Only this strategy short-circuits.
//! - **Fixed-delay**: block for the full delay, then read whatever has
//!   been folded. It cannot time out; it can only under-observe.
//!
//! ```text
//! NotStarted ──start──▶ Running ──settle──▶ Settled
//!                          │
//!                          └──timeout──▶ TimedOut
//! ```
//!
//! Both bounds are measured from the moment the producers are started.
//! Producers built with `Producer::new` run on their own threads, so a
//! body that blocks cannot stretch the caller's wait.
//!
//! Producers are never cancelled. Whatever they report after the verdict
//! is fixed is dropped by the closed tally.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::TimedOut;
use crate::policy::AggregationPolicy;
use crate::producer::{ProducerSet, Reporter, Sink};
use crate::sync::{GatePhase, Tally, TallyMode};

static NEXT_INVOCATION: AtomicU64 = AtomicU64::new(1);

fn next_invocation_id() -> u64 {
    NEXT_INVOCATION.fetch_add(1, Ordering::Relaxed)
}

/// Discipline governing how long the caller blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Start producers and return immediately.
    FireAndForget,
    /// Block until the verdict settles or `timeout` elapses.
    AwaitCompletion {
        /// Bound on the wait.
        timeout: Duration,
    },
    /// Block for exactly `delay`, then read the accumulated verdict.
    FixedDelay {
        /// How long to wait.
        delay: Duration,
    },
}

impl WaitStrategy {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FireAndForget => "fire_and_forget",
            Self::AwaitCompletion { .. } => "await_completion",
            Self::FixedDelay { .. } => "fixed_delay",
        }
    }

    const fn tally_mode(self) -> TallyMode {
        match self {
            Self::FireAndForget | Self::AwaitCompletion { .. } => TallyMode::ShortCircuit,
            Self::FixedDelay { .. } => TallyMode::Accumulate,
        }
    }
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FireAndForget => f.write_str(self.name()),
            Self::AwaitCompletion { timeout } => {
                write!(f, "{}({}ms)", self.name(), timeout.as_millis())
            }
            Self::FixedDelay { delay } => write!(f, "{}({}ms)", self.name(), delay.as_millis()),
        }
    }
}

/// Lifecycle of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Producers not started yet.
    NotStarted,
    /// Producers started, verdict open.
    Running,
    /// Verdict fixed.
    Settled,
    /// The waiter gave up before a verdict.
    TimedOut,
}

/// A running invocation: producers started, aggregation wired to a gate.
pub struct Invocation<V, P: AggregationPolicy<V>> {
    id: u64,
    strategy: WaitStrategy,
    producers: usize,
    tally: Arc<Tally<V, P>>,
    started: Instant,
    span: tracing::Span,
}

impl<V: 'static, P: AggregationPolicy<V>> Invocation<V, P> {
    /// Starts every producer against a fresh tally.
    pub(crate) fn begin(strategy: WaitStrategy, policy: P, producers: ProducerSet<V>) -> Self {
        let id = next_invocation_id();
        let count = producers.len();
        let tally = Arc::new(Tally::new(policy, count, strategy.tally_mode(), id));
        let span = tracing::debug_span!(
            "invocation",
            id,
            strategy = strategy.name(),
            policy = tally.policy_name(),
            producers = count
        );
        let entered = span.enter();
        tracing::trace!(state = ?InvocationState::NotStarted, "invocation prepared");
        let started = Instant::now();

        if count > 0 {
            let dispatch = Arc::clone(&tally);
            let sink: Sink<V> = Arc::new(move |index, value| dispatch.report(index, value));
            for (index, producer) in producers.into_producers().into_iter().enumerate() {
                producer.start(Reporter::new(index, Arc::clone(&sink)));
            }
        }
        tracing::debug!(state = ?InvocationState::Running, "producers started");

        drop(entered);
        Self {
            id,
            strategy,
            producers: count,
            tally,
            started,
            span,
        }
    }
}

impl<V, P: AggregationPolicy<V>> Invocation<V, P> {
    /// Invocation id used in logs.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Strategy this invocation was started under.
    #[must_use]
    pub const fn strategy(&self) -> WaitStrategy {
        self.strategy
    }

    /// Number of producers started.
    #[must_use]
    pub const fn producers(&self) -> usize {
        self.producers
    }

    /// Producers that have not reported yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tally.remaining()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> InvocationState {
        match self.tally.gate().phase() {
            GatePhase::Pending => InvocationState::Running,
            GatePhase::Settled => InvocationState::Settled,
            GatePhase::Abandoned => InvocationState::TimedOut,
        }
    }

    /// Returns true once the verdict is fixed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state() == InvocationState::Settled
    }

    /// Verdict as folded so far, whether or not it is final.
    #[must_use]
    pub fn snapshot(&self) -> P::Output {
        self.tally.snapshot()
    }
}

impl<V, P> Invocation<V, P>
where
    P: AggregationPolicy<V>,
    P::Output: Clone,
{
    /// Blocks until the verdict settles or `timeout` elapses.
    ///
    /// Timing out leaves the invocation running; a later call may still
    /// see the verdict.
    pub fn wait(&self, timeout: Duration) -> Result<P::Output, TimedOut> {
        let _entered = self.span.enter();
        self.tally.gate().wait(timeout)
    }

    /// Blocks until the verdict settles or `timeout` has elapsed since the
    /// producers were started, then gives up on the invocation for good.
    pub fn finish(self, timeout: Duration) -> Result<P::Output, TimedOut> {
        let _entered = self.span.enter();
        match self
            .tally
            .gate()
            .wait_or_abandon_since(self.started, timeout)
        {
            Ok(verdict) => {
                tracing::debug!(state = ?InvocationState::Settled, "invocation settled");
                Ok(verdict)
            }
            Err(err) => {
                self.tally.seal();
                tracing::warn!(
                    state = ?InvocationState::TimedOut,
                    timeout_ms = timeout.as_millis(),
                    remaining = self.tally.remaining(),
                    reports = self.tally.reports(),
                    "no verdict before timeout"
                );
                Err(err)
            }
        }
    }
}

impl<V, P: AggregationPolicy<V>> Invocation<V, P> {
    /// Sleeps until `delay` has elapsed since the producers were started,
    /// then closes the tally and returns its verdict.
    ///
    /// Returns at once for an empty producer set.
    pub fn settle_after(self, delay: Duration) -> P::Output {
        let _entered = self.span.enter();
        if self.producers > 0 {
            thread::sleep(delay.saturating_sub(self.started.elapsed()));
        }
        let verdict = self.tally.close();
        tracing::debug!(
            delay_ms = delay.as_millis(),
            remaining = self.tally.remaining(),
            reports = self.tally.reports(),
            "delay elapsed, verdict read"
        );
        verdict
    }
}

impl<V, P: AggregationPolicy<V>> fmt::Debug for Invocation<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("producers", &self.producers)
            .field("tally", &self.tally)
            .finish()
    }
}

/// Starts every producer with a no-op reporter and returns.
pub fn fire_and_forget<V: 'static>(producers: ProducerSet<V>) {
    let id = next_invocation_id();
    let span = tracing::debug_span!(
        "invocation",
        id,
        strategy = WaitStrategy::FireAndForget.name(),
        producers = producers.len()
    );
    let _entered = span.enter();
    for (index, producer) in producers.into_producers().into_iter().enumerate() {
        producer.start(Reporter::noop(index));
    }
    tracing::debug!(state = ?InvocationState::Running, "producers started");
}

/// Starts every producer with the aggregation wired up and returns the
/// running invocation without waiting.
pub fn launch<V, P>(policy: P, producers: ProducerSet<V>) -> Invocation<V, P>
where
    V: 'static,
    P: AggregationPolicy<V>,
{
    Invocation::begin(WaitStrategy::FireAndForget, policy, producers)
}

/// Starts every producer and blocks until the policy's verdict settles or
/// `timeout` elapses.
pub fn await_completion<V, P>(
    policy: P,
    producers: ProducerSet<V>,
    timeout: Duration,
) -> Result<P::Output, TimedOut>
where
    V: 'static,
    P: AggregationPolicy<V>,
    P::Output: Clone,
{
    Invocation::begin(WaitStrategy::AwaitCompletion { timeout }, policy, producers).finish(timeout)
}

/// Starts every producer, sleeps for `delay`, and returns what was folded
/// by then.
pub fn fixed_delay<V, P>(policy: P, producers: ProducerSet<V>, delay: Duration) -> P::Output
where
    V: 'static,
    P: AggregationPolicy<V>,
{
    Invocation::begin(WaitStrategy::FixedDelay { delay }, policy, producers).settle_after(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CaptureAll, Exists, ForAll};
    use crate::producer::Producer;
    use crate::test_utils::{delayed, init_test_logging};
    use std::time::Instant;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn fire_and_forget_starts_every_producer() {
        init_test("fire_and_forget_starts_every_producer");
        let (tx, rx) = std::sync::mpsc::channel();
        let set: ProducerSet<u8> = (0..3)
            .map(|_| {
                let tx = tx.clone();
                Producer::new(move |r: Reporter<u8>| {
                    r.report(1);
                    let _ = tx.send(());
                })
            })
            .collect();
        fire_and_forget(set);
        for _ in 0..3 {
            assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        }
    }

    #[test]
    fn launch_exposes_running_invocation() {
        init_test("launch_exposes_running_invocation");
        let set = ProducerSet::from(vec![
            Producer::reporting([1_u8]),
            delayed(Duration::from_millis(50), 2_u8),
        ]);
        let invocation = launch(CaptureAll::new(), set);
        assert_eq!(invocation.strategy(), WaitStrategy::FireAndForget);
        assert_eq!(invocation.producers(), 2);
        assert_eq!(invocation.state(), InvocationState::Running);
        assert_eq!(invocation.snapshot(), vec![1]);
        let verdict = invocation.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(verdict, vec![1, 2]);
        assert!(invocation.is_settled());
        assert_eq!(invocation.remaining(), 0);
    }

    #[test]
    fn await_completion_short_circuits() {
        init_test("await_completion_short_circuits");
        let set = ProducerSet::from(vec![Producer::reporting([7_u8]), Producer::silent()]);
        let start = Instant::now();
        let verdict =
            await_completion(Exists::new(|v: &u8| *v == 7), set, Duration::from_secs(5)).unwrap();
        assert!(verdict);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn await_completion_times_out_on_silence() {
        init_test("await_completion_times_out_on_silence");
        let set = ProducerSet::from(vec![Producer::<u8>::silent()]);
        let start = Instant::now();
        let err = await_completion(ForAll::new(|_: &u8| true), set, Duration::from_millis(60))
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(err.timeout(), Duration::from_millis(60));
    }

    #[test]
    fn finish_seals_tally_after_timeout() {
        init_test("finish_seals_tally_after_timeout");
        let set = ProducerSet::from(vec![delayed(Duration::from_millis(80), 1_u8)]);
        let invocation = launch(CaptureAll::new(), set);
        let tally = Arc::clone(&invocation.tally);
        assert!(invocation.finish(Duration::from_millis(10)).is_err());
        thread::sleep(Duration::from_millis(150));
        assert_eq!(tally.reports(), 0);
        assert_eq!(tally.gate().phase(), GatePhase::Abandoned);
    }

    #[test]
    fn fixed_delay_waits_full_delay_and_ignores_short_circuit() {
        init_test("fixed_delay_waits_full_delay_and_ignores_short_circuit");
        let set = ProducerSet::from(vec![Producer::reporting([1_u8])]);
        let start = Instant::now();
        let verdict = fixed_delay(Exists::new(|v: &u8| *v == 1), set, Duration::from_millis(40));
        assert!(verdict);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    fn blocking(delay: Duration, value: u8) -> Producer<u8> {
        Producer::new(move |r: Reporter<u8>| {
            thread::sleep(delay);
            r.report(value);
        })
    }

    #[test]
    fn blocking_body_does_not_stretch_timeout() {
        init_test("blocking_body_does_not_stretch_timeout");
        let set = ProducerSet::from(vec![blocking(Duration::from_millis(600), 1)]);
        let start = Instant::now();
        let err = await_completion(Exists::new(|v: &u8| *v == 1), set, Duration::from_millis(100))
            .unwrap_err();
        let elapsed = start.elapsed();
        assert_eq!(err.timeout(), Duration::from_millis(100));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(450), "waited {elapsed:?}");
    }

    #[test]
    fn blocking_body_does_not_stretch_delay() {
        init_test("blocking_body_does_not_stretch_delay");
        let set = ProducerSet::from(vec![
            blocking(Duration::from_millis(100), 1),
            blocking(Duration::from_millis(100), 1),
        ]);
        let start = Instant::now();
        let verdict = fixed_delay(Exists::new(|v: &u8| *v == 1), set, Duration::from_millis(10));
        let elapsed = start.elapsed();
        assert!(!verdict);
        assert!(elapsed < Duration::from_millis(80), "waited {elapsed:?}");
    }

    #[test]
    fn fixed_delay_empty_set_returns_immediately() {
        init_test("fixed_delay_empty_set_returns_immediately");
        let start = Instant::now();
        let verdict = fixed_delay(
            ForAll::new(|_: &u8| false),
            ProducerSet::empty(),
            Duration::from_secs(10),
        );
        assert!(verdict);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn strategy_display() {
        assert_eq!(WaitStrategy::FireAndForget.to_string(), "fire_and_forget");
        assert_eq!(
            WaitStrategy::AwaitCompletion {
                timeout: Duration::from_millis(2000)
            }
            .to_string(),
            "await_completion(2000ms)"
        );
        assert_eq!(
            WaitStrategy::FixedDelay {
                delay: Duration::from_millis(150)
            }
            .to_string(),
            "fixed_delay(150ms)"
        );
    }
}
