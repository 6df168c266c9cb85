// crates/trade-qa-core/tests/resilience.rs
// ============================================================================
// Module: Retry, Fallback, and Cancellation Tests
// Description: Ensures timeout, retry, and fallback policies are enforced.
// ============================================================================
//! ## Overview
//! Uses paused tokio time so timeouts and backoff resolve deterministically.

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
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use common::FailingEvaluator;
use common::FixedEvaluator;
use common::FlakyEvaluator;
use common::HangingEvaluator;
use trade_qa_core::CancelSignal;
use trade_qa_core::CheckOutcome;
use trade_qa_core::Classification;
use trade_qa_core::ClassificationProvider;
use trade_qa_core::ClassificationRequest;
use trade_qa_core::ClassifierError;
use trade_qa_core::Decision;
use trade_qa_core::EngageStatus;
use trade_qa_core::EngineConfig;
use trade_qa_core::ErrorKind;
use trade_qa_core::EvaluationContext;
use trade_qa_core::EvaluationError;
use trade_qa_core::EvaluatorKind;
use trade_qa_core::EvaluatorRegistry;
use trade_qa_core::OrderTakerType;
use trade_qa_core::QaEngine;
use trade_qa_core::RetryPolicy;
use trade_qa_core::RunStatus;
use trade_qa_core::TestEvaluator;
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

/// Classifier with a scripted response.
struct ScriptedClassifier {
    /// Response for every request.
    response: Result<Classification, ClassifierError>,
    /// Number of requests observed.
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl ClassificationProvider for ScriptedClassifier {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> Result<Classification, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Tracks how many evaluations are in flight at once.
#[derive(Default)]
struct GaugeEvaluator {
    /// Evaluations currently running.
    in_flight: AtomicUsize,
    /// Highest in-flight count observed.
    peak: AtomicUsize,
}

#[async_trait]
impl TestEvaluator for GaugeEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(CheckOutcome::pass())
    }
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

#[test]
fn backoff_doubles_per_retry() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(500),
    };
    assert_eq!(policy.delay_before(1), Duration::from_millis(500));
    assert_eq!(policy.delay_before(2), Duration::from_secs(1));
    assert_eq!(policy.delay_before(3), Duration::from_secs(2));
}

#[test]
fn backoff_saturates_instead_of_overflowing() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::MAX,
    };
    assert_eq!(policy.delay_before(40), Duration::MAX);
}

#[test]
fn only_timeouts_are_retryable() {
    assert!(EvaluationError::Timeout("slow".to_string()).is_retryable());
    assert!(!EvaluationError::DataMissing("gone".to_string()).is_retryable());
    assert!(!EvaluationError::ToolUnavailable("down".to_string()).is_retryable());
    assert!(EvaluationError::ToolUnavailable("down".to_string()).allows_fallback());
    assert!(!EvaluationError::Timeout("slow".to_string()).allows_fallback());
}

// ============================================================================
// SECTION: Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn hanging_evaluator_times_out_three_times() {
    let hanging = HangingEvaluator::new();
    let calls = Arc::clone(&hanging.calls);
    let mut registry = EvaluatorRegistry::standard(None);
    registry.register(id(3), Arc::new(hanging));
    let events = MemoryEventSink::new();
    let engine = QaEngine::new(registry, EngineConfig::default())
        .with_event_sink(Arc::new(events.clone()));

    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();

    let result = report.result(id(3)).unwrap();
    assert_eq!(result.verdict, Verdict::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(result.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(result.message.as_deref().unwrap().contains("attempt 3 exceeded 120000 ms"));

    assert_eq!(report.metrics.executed, 9);
    assert_eq!(report.metrics.errored, 1);
    assert_eq!(report.run_status, RunStatus::Complete);
    assert_eq!(report.decision, Some(Decision::Fail));

    let retried = events.events_named("test_retried");
    assert_eq!(retried.len(), 2);
    assert_eq!(retried[0].attempts, Some(1));
    assert_eq!(retried[1].attempts, Some(2));
}

#[tokio::test(start_paused = true)]
async fn transient_timeout_recovers_on_retry() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = EvaluatorRegistry::standard(None);
    registry.register(
        id(8),
        Arc::new(FlakyEvaluator {
            failures: 2,
            calls: Arc::clone(&calls),
        }),
    );
    let engine = QaEngine::new(registry, EngineConfig::default());
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();

    let result = report.result(id(8)).unwrap();
    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.message.as_deref(), Some("recovered"));
    assert_eq!(report.decision, Some(Decision::Pass));
}

#[tokio::test(start_paused = true)]
async fn non_timeout_errors_are_not_retried() {
    let failing = FailingEvaluator::new(EvaluationError::Failed("bad payload".to_string()));
    let calls = Arc::clone(&failing.calls);
    let mut registry = EvaluatorRegistry::standard(None);
    registry.register(id(1), Arc::new(failing));
    let engine = QaEngine::new(registry, EngineConfig::default());
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();

    let result = report.result(id(1)).unwrap();
    assert_eq!(result.verdict, Verdict::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Failed));
    assert_eq!(result.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Fallback
// ============================================================================

#[tokio::test]
async fn unavailable_classifier_falls_back_to_keywords() {
    let calls = Arc::new(AtomicU32::new(0));
    let classifier = ScriptedClassifier {
        response: Err(ClassifierError::Unavailable("no model access".to_string())),
        calls: Arc::clone(&calls),
    };
    let events = MemoryEventSink::new();
    let registry = EvaluatorRegistry::standard(Some(Arc::new(classifier)));
    let engine = QaEngine::new(registry, EngineConfig::default())
        .with_event_sink(Arc::new(events.clone()));
    let report = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();

    let result = report.result(id(6)).unwrap();
    assert_eq!(result.verdict, Verdict::Pass);
    assert!(result.degraded);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.message.as_deref(), Some("no advice phrases detected"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let fallbacks = events.events_named("fallback_used");
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].error_kind, Some(ErrorKind::ToolUnavailable));
}

#[tokio::test]
async fn flagged_classification_fails_test_but_clears_threshold() {
    let classifier = ScriptedClassifier {
        response: Ok(Classification {
            label: "product_advice".to_string(),
            confidence: 0.93,
            flagged: true,
        }),
        calls: Arc::new(AtomicU32::new(0)),
    };
    let notifier = RecordingNotifier::new();
    let registry = EvaluatorRegistry::standard(Some(Arc::new(classifier)));
    let engine =
        QaEngine::new(registry, EngineConfig::default()).with_notifier(Arc::new(notifier.clone()));
    let report = engine.evaluate(&common::fveq_ticket(), common::passing_snapshot()).await.unwrap();

    let result = report.result(id(6)).unwrap();
    assert_eq!(result.verdict, Verdict::Fail);
    assert!(!result.degraded);
    assert_eq!(result.message.as_deref(), Some("classified `product_advice` (confidence 0.93)"));
    assert_eq!(report.metrics.failed, 1);
    assert_eq!(report.metrics.executed, 12);
    assert_eq!(report.decision, Some(Decision::Pass));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn missing_evaluator_is_recorded_as_error() {
    let mut registry = EvaluatorRegistry::new();
    for raw in 1..=15 {
        registry.register(
            id(raw),
            Arc::new(FixedEvaluator {
                outcome: CheckOutcome::pass(),
            }),
        );
    }
    let engine = QaEngine::new(registry, EngineConfig::default());
    let report =
        engine.evaluate(&common::approved_ticket(), common::passing_snapshot()).await.unwrap();
    let barrier = report.result(TestId::BARRIER).unwrap();
    assert_eq!(barrier.verdict, Verdict::Error);
    assert_eq!(barrier.attempts, 0);
    assert_eq!(
        barrier.message.as_deref(),
        Some("evaluation failed: no evaluator registered for test 16")
    );
}

// ============================================================================
// SECTION: Bounded Pool
// ============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_evaluations_never_exceed_pool_size() {
    let gauge = Arc::new(GaugeEvaluator::default());
    let mut registry = EvaluatorRegistry::new();
    for test_id in TestId::all() {
        registry.register(test_id, Arc::clone(&gauge) as Arc<dyn TestEvaluator>);
    }
    let config = EngineConfig {
        max_concurrency: 3,
        ..EngineConfig::default()
    };
    let record = TicketRecord {
        engage_status: Some(EngageStatus::No),
        order_taker_type: Some(OrderTakerType::Mfo),
        bilateral_scope: Some(true),
        ..common::fveq_ticket()
    };
    let report = QaEngine::new(registry, config)
        .evaluate(&record, common::passing_snapshot())
        .await
        .unwrap();

    assert_eq!(report.metrics.executed, 14);
    assert_eq!(report.metrics.passed, 14);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight evaluations {peak}");
    assert!(peak > 1, "pool never ran tests concurrently");
    assert_eq!(gauge.in_flight.load(Ordering::SeqCst), 0);
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn cancellation_mid_run_produces_incomplete_report() {
    let mut registry = EvaluatorRegistry::standard(None);
    registry.register(id(3), Arc::new(HangingEvaluator::new()));
    let notifier = RecordingNotifier::new();
    let engine = QaEngine::new(registry, EngineConfig::default())
        .with_notifier(Arc::new(notifier.clone()));
    let (handle, signal) = CancelSignal::new();
    let record = common::approved_ticket();

    let (report, ()) = tokio::join!(
        engine.evaluate_with_cancel(&record, common::passing_snapshot(), signal),
        async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        }
    );
    let report = report.unwrap();

    assert_eq!(report.run_status, RunStatus::Incomplete);
    assert_eq!(report.decision, None);
    assert!(report.exception.is_none());
    assert!(!report.is_complete());
    assert_eq!(report.results.len(), 16);
    for raw in [3, 16] {
        let result = report.result(id(raw)).unwrap();
        assert_eq!(result.verdict, Verdict::Error, "test {raw}");
        assert_eq!(result.error_kind, Some(ErrorKind::Cancelled));
    }
    assert_eq!(report.result(id(1)).unwrap().verdict, Verdict::Pass);
    assert!(notifier.notices().is_empty());

    let saved = engine.store().load(&TicketId::new("T-1001").unwrap()).unwrap();
    assert_eq!(saved.map(|saved| saved.run_status), Some(RunStatus::Incomplete));
}

#[tokio::test]
async fn cancellation_before_start_skips_evaluation() {
    let engine = QaEngine::new(EvaluatorRegistry::standard(None), EngineConfig::default());
    let (handle, signal) = CancelSignal::new();
    handle.cancel();
    assert!(handle.is_cancelled());

    let report = engine
        .evaluate_with_cancel(&common::approved_ticket(), common::passing_snapshot(), signal)
        .await
        .unwrap();
    assert_eq!(report.run_status, RunStatus::Incomplete);
    assert_eq!(report.metrics.skipped, 7);
    assert_eq!(report.metrics.errored, 9);
    assert!(report.results.iter().all(|result| result.attempts == 0));
}
