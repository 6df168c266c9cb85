//! Run metrics property-based tests.
//!
//! ## Purpose
//! Aggregation must hold its counting invariants for any mix of verdicts,
//! and the decision must follow the execution success rate exactly.
// crates/trade-qa-core/tests/proptest_metrics.rs
// ============================================================================
// Module: Run Metrics Property-Based Tests
// Description: Randomized checks for aggregation and decision invariants.
// Purpose: Ensure rates stay in range and counts always reconcile.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use trade_qa_core::Decision;
use trade_qa_core::RunMetrics;
use trade_qa_core::RunReport;
use trade_qa_core::RunStatus;
use trade_qa_core::TestId;
use trade_qa_core::TestResult;
use trade_qa_core::TicketId;
use trade_qa_core::Verdict;

fn verdict_strategy() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Pass),
        Just(Verdict::Fail),
        Just(Verdict::Skipped),
        Just(Verdict::Error),
    ]
}

fn results_for(verdicts: &[Verdict]) -> Vec<TestResult> {
    TestId::all()
        .zip(verdicts.iter().copied())
        .zip(1_u32..)
        .map(|((test_id, verdict), seq)| TestResult {
            test_id,
            label: format!("test {test_id}"),
            verdict,
            message: None,
            duration_ms: 0,
            attempts: u8::from(verdict.is_executed()),
            degraded: false,
            error_kind: None,
            completion_seq: seq,
            finished_at_ms: 0,
        })
        .collect()
}

#[test]
fn all_skipped_run_passes_with_full_rate() {
    let verdicts = [Verdict::Skipped; 16];
    let report = RunReport::assemble(
        TicketId::new("T-skip").unwrap(),
        RunStatus::Complete,
        results_for(&verdicts),
        0.9,
        |_| String::new(),
    )
    .unwrap();
    assert_eq!(report.metrics.executed, 0);
    assert_eq!(report.metrics.skipped, 16);
    assert!((report.metrics.execution_success_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(report.decision, Some(Decision::Pass));
    assert!(report.exception.is_none());
}

proptest! {
    #[test]
    fn metrics_counts_reconcile(verdicts in prop::collection::vec(verdict_strategy(), 16)) {
        let metrics = RunMetrics::from_results(&results_for(&verdicts));
        prop_assert_eq!(metrics.total, 16);
        prop_assert_eq!(metrics.executed, metrics.passed + metrics.failed + metrics.errored);
        prop_assert_eq!(metrics.executed + metrics.skipped, 16);
        prop_assert!((0.0..=1.0).contains(&metrics.execution_success_rate));
        prop_assert!((0.0..=1.0).contains(&metrics.overall_success_rate));
        prop_assert!(metrics.overall_success_rate <= metrics.execution_success_rate);
        if metrics.executed == 0 {
            prop_assert!((metrics.execution_success_rate - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn decision_follows_threshold(
        verdicts in prop::collection::vec(verdict_strategy(), 16),
        threshold in 0.01_f64..=1.0,
    ) {
        let report = RunReport::assemble(
            TicketId::new("T-prop").unwrap(),
            RunStatus::Complete,
            results_for(&verdicts),
            threshold,
            |_| String::new(),
        )
        .unwrap();
        let expected = if report.metrics.execution_success_rate >= threshold {
            Decision::Pass
        } else {
            Decision::Fail
        };
        prop_assert_eq!(report.decision, Some(expected));
        prop_assert_eq!(report.exception.is_some(), expected == Decision::Fail);
        if let Some(exception) = &report.exception {
            let flagged = u32::try_from(exception.failed_tests.len()).unwrap();
            prop_assert_eq!(flagged, report.metrics.failed + report.metrics.errored);
        }
    }

    #[test]
    fn incomplete_runs_never_decide(verdicts in prop::collection::vec(verdict_strategy(), 16)) {
        let report = RunReport::assemble(
            TicketId::new("T-prop").unwrap(),
            RunStatus::Incomplete,
            results_for(&verdicts),
            0.9,
            |_| String::new(),
        )
        .unwrap();
        prop_assert!(report.decision.is_none());
        prop_assert!(report.exception.is_none());
    }
}
