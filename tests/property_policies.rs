#![allow(missing_docs)]

//! Property tests for the built-in policies over synchronous producers.

#[macro_use]
mod common;

use common::*;
use fanout_check::{Checker, Producer, ProducerSet};
use proptest::prelude::*;
use std::time::Duration;

fn checker() -> Checker {
    Checker::with_timeout(Duration::from_secs(2))
}

/// Every producer reports at least one value, so every check settles.
fn producer_reports() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0_u8..16, 1..4), 0..6)
}

fn synchronous(reports: &[Vec<u8>]) -> ProducerSet<u8> {
    reports
        .iter()
        .cloned()
        .map(Producer::reporting)
        .collect()
}

/// Reports folded before an await check settles. `Producer::reporting`
/// runs on the starting thread, so the set reports in order and the
/// verdict is final at the latest on the last producer's first report.
/// Anything that producer reports after that is dropped.
fn visible_prefix(reports: &[Vec<u8>]) -> Vec<u8> {
    let mut visible = Vec::new();
    for (i, batch) in reports.iter().enumerate() {
        if i + 1 == reports.len() {
            visible.push(batch[0]);
        } else {
            visible.extend_from_slice(batch);
        }
    }
    visible
}

proptest! {
    #![proptest_config(test_proptest_config(64))]

    #[test]
    fn exists_matches_any_single_report(values in prop::collection::vec(0_u8..16, 0..8), target in 0_u8..16) {
        init_test_logging();
        let set = single_reports(&values);
        let verdict = checker().exists(move |v: &u8| *v == target, set).unwrap();
        prop_assert_eq!(verdict, values.contains(&target));
    }

    #[test]
    fn forall_matches_every_single_report(values in prop::collection::vec(0_u8..16, 0..8), bound in 0_u8..16) {
        init_test_logging();
        let set = single_reports(&values);
        let verdict = checker().forall(move |v: &u8| *v < bound, set).unwrap();
        prop_assert_eq!(verdict, values.iter().all(|v| *v < bound));
    }

    #[test]
    fn capture_all_returns_visible_reports_in_order(reports in producer_reports()) {
        init_test_logging();
        let captured = checker().capture_all(synchronous(&reports)).unwrap();
        prop_assert_eq!(captured, visible_prefix(&reports));
    }

    #[test]
    fn exists_over_batches_agrees_with_visible_reports(reports in producer_reports(), target in 0_u8..16) {
        init_test_logging();
        let verdict = checker().exists(move |v: &u8| *v == target, synchronous(&reports)).unwrap();
        prop_assert_eq!(verdict, visible_prefix(&reports).contains(&target));
    }

    #[test]
    fn fixed_delay_sees_every_synchronous_report(reports in producer_reports(), bound in 0_u8..16) {
        init_test_logging();
        let all: Vec<u8> = reports.iter().flatten().copied().collect();
        let verdict = checker().delayed_forall(Duration::ZERO, move |v: &u8| *v < bound, synchronous(&reports));
        prop_assert_eq!(verdict, all.iter().all(|v| *v < bound));
        let captured = checker().delayed_capture(Duration::ZERO, synchronous(&reports));
        prop_assert_eq!(captured, all);
    }
}
