//! One-shot completion gate with a bounded blocking wait.
//!
//! The gate settles at most once: the first `try_settle` wins and every
//! later attempt is a no-op that returns `false`. A waiter blocks on a
//! condition variable until the gate settles or its deadline passes.
//!
//! A gate can also be abandoned, which is what a waiter does when it gives
//! up. An abandoned gate refuses settlement just like a settled one, so
//! late reporters see a no-op.

use core::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::TimedOut;

enum Slot<T> {
    Pending,
    Settled(T),
    Abandoned,
}

/// Observable phase of a [`CompletionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Not yet settled.
    Pending,
    /// Holds a value.
    Settled,
    /// The waiter gave up before any value arrived.
    Abandoned,
}

/// A single-assignment result cell with a blocking, timed wait.
pub struct CompletionGate<T> {
    slot: Mutex<Slot<T>>,
    cvar: Condvar,
}

impl<T> CompletionGate<T> {
    /// Creates a pending gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            cvar: Condvar::new(),
        }
    }

    /// Creates a gate that is already settled with `value`.
    #[must_use]
    pub fn settled(value: T) -> Self {
        Self {
            slot: Mutex::new(Slot::Settled(value)),
            cvar: Condvar::new(),
        }
    }

    /// Settles the gate with `value` if it is still pending.
    ///
    /// Returns true iff this call performed the settlement.
    pub fn try_settle(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Settled(value);
        drop(slot);
        self.cvar.notify_all();
        true
    }

    /// Marks a pending gate as abandoned.
    ///
    /// Returns true iff the gate was pending.
    pub fn abandon(&self) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Abandoned;
        drop(slot);
        self.cvar.notify_all();
        true
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> GatePhase {
        match *self.slot.lock() {
            Slot::Pending => GatePhase::Pending,
            Slot::Settled(_) => GatePhase::Settled,
            Slot::Abandoned => GatePhase::Abandoned,
        }
    }

    /// Returns true once the gate holds a value.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase() == GatePhase::Settled
    }
}

impl<T: Clone> CompletionGate<T> {
    /// Returns the settled value without blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        match &*self.slot.lock() {
            Slot::Settled(value) => Some(value.clone()),
            Slot::Pending | Slot::Abandoned => None,
        }
    }

    /// Blocks until the gate settles or `timeout` elapses.
    ///
    /// A timeout leaves the gate pending, so a later wait may still
    /// observe the value.
    pub fn wait(&self, timeout: Duration) -> Result<T, TimedOut> {
        self.wait_inner(timeout, false)
    }

    /// Like [`wait`](Self::wait), but a timeout abandons the gate under the
    /// same lock, so no value can slip in between the timeout and the
    /// abandonment.
    pub fn wait_or_abandon(&self, timeout: Duration) -> Result<T, TimedOut> {
        self.wait_inner(timeout, true)
    }

    /// Like [`wait_or_abandon`](Self::wait_or_abandon), with `timeout`
    /// measured from `since` instead of from now.
    pub fn wait_or_abandon_since(&self, since: Instant, timeout: Duration) -> Result<T, TimedOut> {
        self.wait_deadline(since.checked_add(timeout), timeout, true)
    }

    fn wait_inner(&self, timeout: Duration, abandon: bool) -> Result<T, TimedOut> {
        self.wait_deadline(Instant::now().checked_add(timeout), timeout, abandon)
    }

    fn wait_deadline(
        &self,
        deadline: Option<Instant>,
        timeout: Duration,
        abandon: bool,
    ) -> Result<T, TimedOut> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Settled(value) => return Ok(value.clone()),
                Slot::Abandoned => return Err(TimedOut::new(timeout)),
                Slot::Pending => {}
            }
            match deadline {
                Some(deadline) => {
                    if self.cvar.wait_until(&mut slot, deadline).timed_out() {
                        if let Slot::Settled(value) = &*slot {
                            return Ok(value.clone());
                        }
                        if abandon {
                            *slot = Slot::Abandoned;
                            drop(slot);
                            self.cvar.notify_all();
                        }
                        return Err(TimedOut::new(timeout));
                    }
                }
                // Deadline unrepresentable: wait without bound.
                None => self.cvar.wait(&mut slot),
            }
        }
    }
}

impl<T> Default for CompletionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompletionGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGate")
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn first_settle_wins() {
        init_test("first_settle_wins");
        let gate = CompletionGate::new();
        assert!(gate.try_settle(1));
        assert!(!gate.try_settle(2));
        assert_eq!(gate.try_get(), Some(1));
        assert_eq!(gate.wait(Duration::from_millis(1)), Ok(1));
        crate::test_complete!("first_settle_wins");
    }

    #[test]
    fn pre_settled_gate_returns_immediately() {
        init_test("pre_settled_gate_returns_immediately");
        let gate = CompletionGate::settled("done");
        assert!(gate.is_settled());
        assert_eq!(gate.wait(Duration::ZERO), Ok("done"));
    }

    #[test]
    fn wait_times_out_and_stays_pending() {
        init_test("wait_times_out_and_stays_pending");
        let gate = CompletionGate::<u8>::new();
        let start = Instant::now();
        let err = gate.wait(Duration::from_millis(50)).unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(err.timeout(), Duration::from_millis(50));
        assert_eq!(gate.phase(), GatePhase::Pending);
        assert!(gate.try_settle(3));
    }

    #[test]
    fn wait_or_abandon_refuses_late_settlement() {
        init_test("wait_or_abandon_refuses_late_settlement");
        let gate = CompletionGate::<u8>::new();
        assert!(gate.wait_or_abandon(Duration::from_millis(10)).is_err());
        assert_eq!(gate.phase(), GatePhase::Abandoned);
        assert!(!gate.try_settle(1));
        assert_eq!(gate.try_get(), None);
        assert!(!gate.abandon());
    }

    #[test]
    fn deadline_counts_from_given_start() {
        init_test("deadline_counts_from_given_start");
        let gate = CompletionGate::<u8>::new();
        let since = Instant::now();
        thread::sleep(Duration::from_millis(60));
        let waited = Instant::now();
        let err = gate
            .wait_or_abandon_since(since, Duration::from_millis(50))
            .unwrap_err();
        assert!(waited.elapsed() < Duration::from_millis(40));
        assert_eq!(err.timeout(), Duration::from_millis(50));
        assert_eq!(gate.phase(), GatePhase::Abandoned);
    }

    #[test]
    fn waiter_wakes_on_settle_from_other_thread() {
        init_test("waiter_wakes_on_settle_from_other_thread");
        let gate = Arc::new(CompletionGate::new());
        let settler = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            settler.try_settle(42)
        });
        assert_eq!(gate.wait(Duration::from_secs(5)), Ok(42));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn racing_settlers_settle_exactly_once() {
        init_test("racing_settlers_settle_exactly_once");
        let gate = Arc::new(CompletionGate::new());
        let barrier = Arc::new(Barrier::new(8));
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    barrier.wait();
                    if gate.try_settle(i) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(gate.try_get().is_some());
    }

    #[test]
    fn abandon_wakes_waiter() {
        init_test("abandon_wakes_waiter");
        let gate = Arc::new(CompletionGate::<u8>::new());
        let abandoner = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            abandoner.abandon()
        });
        let start = Instant::now();
        assert!(gate.wait(Duration::from_secs(5)).is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(handle.join().unwrap());
    }
}
