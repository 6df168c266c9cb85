// crates/trade-qa-core/tests/engine_scenarios.rs
// ============================================================================
// Module: Engine Scenario Tests
// Description: End-to-end runs of the sixteen-test graph.
// ============================================================================
//! ## Overview
//! Drives the engine through routing, aggregation, barrier ordering,
//! persistence, and exception notification for representative tickets.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use serde_json::json;
use trade_qa_core::Decision;
use trade_qa_core::EngineConfig;
use trade_qa_core::ErrorKind;
use trade_qa_core::EvaluatorRegistry;
use trade_qa_core::Platform;
use trade_qa_core::PlatformSnapshot;
use trade_qa_core::QaEngine;
use trade_qa_core::RunError;
use trade_qa_core::RunReport;
use trade_qa_core::RunStatus;
use trade_qa_core::TestId;
use trade_qa_core::TicketId;
use trade_qa_core::TicketRecord;
use trade_qa_core::Verdict;
use trade_qa_core::runtime::MemoryEventSink;
use trade_qa_core::runtime::RecordingNotifier;

/// Returns the test id for a raw catalog number.
fn id(raw: u8) -> TestId {
    TestId::new(raw).unwrap()
}

/// Returns the verdict recorded for a test.
fn verdict(report: &RunReport, raw: u8) -> Verdict {
    report.result(id(raw)).unwrap().verdict
}

/// Builds an engine over the standard registry with recording collaborators.
fn engine() -> (QaEngine, RecordingNotifier, MemoryEventSink) {
    let notifier = RecordingNotifier::new();
    let events = MemoryEventSink::new();
    let engine = QaEngine::new(EvaluatorRegistry::standard(None), EngineConfig::default())
        .with_notifier(Arc::new(notifier.clone()))
        .with_event_sink(Arc::new(events.clone()));
    (engine, notifier, events)
}

// ============================================================================
// SECTION: Routing Scenarios
// ============================================================================

#[tokio::test]
async fn approved_ticket_passes_all_applicable_tests() {
    let (engine, notifier, _) = engine();
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();

    assert_eq!(report.results.len(), 16);
    for skipped in [4, 6, 7, 10, 13, 14, 15] {
        assert_eq!(verdict(&report, skipped), Verdict::Skipped, "test {skipped}");
    }
    for executed in [1, 2, 3, 5, 8, 9, 11, 12, 16] {
        assert_eq!(verdict(&report, executed), Verdict::Pass, "test {executed}");
    }
    assert_eq!(report.metrics.executed, 9);
    assert_eq!(report.metrics.passed, 9);
    assert_eq!(report.metrics.skipped, 7);
    assert!((report.metrics.execution_success_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(report.run_status, RunStatus::Complete);
    assert_eq!(report.decision, Some(Decision::Pass));
    assert!(report.exception.is_none());
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn single_failure_below_threshold_notifies() {
    let (engine, notifier, _) = engine();
    let snapshot = common::blank_blotter_snapshot();
    let report = engine.evaluate(&common::approved_ticket(), snapshot).await.unwrap();

    assert_eq!(verdict(&report, 9), Verdict::Fail);
    assert_eq!(report.metrics.executed, 9);
    assert_eq!(report.metrics.passed, 8);
    assert!((report.metrics.execution_success_rate - 8.0 / 9.0).abs() < 1e-9);
    assert_eq!(report.decision, Some(Decision::Fail));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    let failed = &notices[0].failed_tests;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].test_id, id(9));
    assert_eq!(failed[0].error_code, "VL details inaccurate/not documented");
    assert_eq!(failed[0].message.as_deref(), Some("empty fields: brokerage_blotter.trade_blotter"));
}

#[tokio::test]
async fn fveq_ticket_runs_issuance_checks() {
    let (engine, _, _) = engine();
    let report = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();

    assert_eq!(verdict(&report, 7), Verdict::Pass);
    assert_eq!(verdict(&report, 14), Verdict::Pass);
    assert_eq!(verdict(&report, 6), Verdict::Pass);
    assert_eq!(verdict(&report, 15), Verdict::Skipped);
    assert_eq!(report.metrics.executed, 12);
    assert_eq!(report.decision, Some(Decision::Pass));
}

#[tokio::test]
async fn skipped_tests_carry_condition_message() {
    let (engine, _, _) = engine();
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();
    let skipped = report.result(id(13)).unwrap();
    assert_eq!(skipped.attempts, 0);
    assert_eq!(
        skipped.message.as_deref(),
        Some("condition not met: bilateral_scope == true (observed bilateral_scope = false)")
    );
}

// ============================================================================
// SECTION: Barrier
// ============================================================================

#[tokio::test]
async fn barrier_completes_after_every_other_test() {
    let (engine, _, events) = engine();
    let report = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();

    let barrier = report.result(TestId::BARRIER).unwrap();
    let max_other = report
        .results
        .iter()
        .filter(|result| !result.test_id.is_barrier())
        .map(|result| result.completion_seq)
        .max()
        .unwrap();
    assert!(barrier.completion_seq > max_other);
    assert_eq!(barrier.completion_seq, 16);

    let finished = events.events_named("test_finished");
    assert_eq!(finished.len(), 16);
    assert_eq!(finished.last().unwrap().test_id, Some(TestId::BARRIER));
}

#[tokio::test]
async fn barrier_fails_when_aces_fields_incomplete() {
    let (engine, _, _) = engine();
    let snapshot =
        common::with_field(common::passing_snapshot(), Platform::Aces, "language_tab", json!(null));
    let report = engine.evaluate(&common::approved_ticket(), snapshot).await.unwrap();
    assert_eq!(verdict(&report, 16), Verdict::Fail);
}

// ============================================================================
// SECTION: Data Errors
// ============================================================================

#[tokio::test]
async fn missing_bundle_yields_data_missing_errors() {
    let (engine, notifier, _) = engine();
    let full = common::passing_snapshot();
    let mut snapshot = PlatformSnapshot::new();
    for platform in full.platforms().filter(|platform| *platform != Platform::VoiceLogs) {
        snapshot = snapshot.with_bundle(platform, full.bundle(platform).cloned().unwrap());
    }
    let report = engine.evaluate(&common::approved_ticket(), snapshot).await.unwrap();

    for raw in [2, 5] {
        let result = report.result(id(raw)).unwrap();
        assert_eq!(result.verdict, Verdict::Error, "test {raw}");
        assert_eq!(result.error_kind, Some(ErrorKind::DataMissing));
        assert_eq!(result.attempts, 1);
    }
    assert_eq!(report.metrics.errored, 2);
    assert_eq!(report.metrics.executed, 9);
    assert_eq!(report.decision, Some(Decision::Fail));
    assert_eq!(notifier.notices()[0].failed_tests.len(), 2);
}

#[tokio::test]
async fn invalid_ticket_is_rejected_before_any_test() {
    let (engine, _, events) = engine();
    let record = TicketRecord {
        order_type: None,
        ..common::approved_ticket()
    };
    let err = engine.evaluate(&record, common::passing_snapshot()).await.unwrap_err();
    assert!(matches!(err, RunError::InvalidTicket(ref invalid) if invalid.field == "order_type"));
    assert!(events.events().is_empty());
}

// ============================================================================
// SECTION: Persistence and Determinism
// ============================================================================

#[tokio::test]
async fn report_is_persisted_and_loadable() {
    let (engine, _, events) = engine();
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();
    let loaded =
        engine.store().load(&TicketId::new("T-1001").unwrap()).unwrap().expect("report saved");
    assert_eq!(loaded, report);
    assert_eq!(events.events_named("run_started").len(), 1);
    let finished = events.events_named("run_finished");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].decision, Some(Decision::Pass));
}

#[tokio::test]
async fn repeated_runs_share_a_fingerprint() {
    let (engine, _, _) = engine();
    let first = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();
    let second = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();
    assert_eq!(first.fingerprint, second.fingerprint);

    let snapshot = common::blank_blotter_snapshot();
    let changed = engine.evaluate(&common::fveq_ticket(), snapshot).await.unwrap();
    assert_ne!(first.fingerprint, changed.fingerprint);
}

#[tokio::test]
async fn custom_threshold_changes_decision() {
    let config = EngineConfig {
        decision_threshold: 0.85,
        ..EngineConfig::default()
    };
    let engine = QaEngine::new(EvaluatorRegistry::standard(None), config);
    let snapshot = common::blank_blotter_snapshot();
    let report = engine.evaluate(&common::approved_ticket(), snapshot).await.unwrap();
    assert_eq!(report.decision, Some(Decision::Pass));
    assert!((report.threshold - 0.85).abs() < f64::EPSILON);
}
