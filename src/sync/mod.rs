//! Synchronization primitives for fan-out checks.
//!
//! # Primitives
//!
//! - [`CompletionGate`]: One-shot result cell, first settle wins, with a
//!   timed blocking wait
//! - [`Tally`]: Lock-guarded aggregation state and remaining-producer
//!   counter that drives a gate under an aggregation policy
//!
//! # Lock Discipline
//!
//! A tally holds its own lock while it folds a report, checks finality and
//! settles its gate, so the gate's lock is only ever taken inside the
//! tally's. Each invocation owns one tally; nothing is shared across
//! invocations.

mod gate;
mod tally;

pub use gate::{CompletionGate, GatePhase};
pub use tally::{Tally, TallyMode};
