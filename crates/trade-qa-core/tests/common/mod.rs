// crates/trade-qa-core/tests/common/mod.rs
// ============================================================================
// Module: Trade QA Test Fixtures
// Description: Shared tickets, snapshots, and scripted evaluators.
// ============================================================================
//! ## Overview
//! Builds tickets and platform snapshots where every standard check passes,
//! plus evaluators with scripted behavior for retry and fallback tests.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use trade_qa_core::CheckOutcome;
use trade_qa_core::EngageStatus;
use trade_qa_core::EvaluationContext;
use trade_qa_core::EvaluationError;
use trade_qa_core::EvaluatorKind;
use trade_qa_core::OrderTakerType;
use trade_qa_core::OrderType;
use trade_qa_core::Platform;
use trade_qa_core::PlatformBundle;
use trade_qa_core::PlatformSnapshot;
use trade_qa_core::ProductClass;
use trade_qa_core::TestEvaluator;
use trade_qa_core::TicketRecord;

// ============================================================================
// SECTION: Tickets
// ============================================================================

/// Approved equity order, engaged account, retail order taker.
pub fn approved_ticket() -> TicketRecord {
    TicketRecord {
        ticket_id: Some("T-1001".to_string()),
        ticket_type: Some("Equity Trade".to_string()),
        engage_status: Some(EngageStatus::Yes),
        order_type: Some(OrderType::Approved),
        product_class: Some(ProductClass::Equity),
        order_taker_type: Some(OrderTakerType::from("Retail")),
        bilateral_scope: Some(false),
    }
}

/// FVEQ new issuance order, otherwise identical to [`approved_ticket`].
pub fn fveq_ticket() -> TicketRecord {
    TicketRecord {
        ticket_id: Some("T-2002".to_string()),
        order_type: Some(OrderType::FveqNewIssuance),
        ..approved_ticket()
    }
}

// ============================================================================
// SECTION: Snapshots
// ============================================================================

/// Builds a bundle from field/value pairs.
pub fn bundle(fields: &[(&str, Value)]) -> PlatformBundle {
    fields
        .iter()
        .fold(PlatformBundle::new(), |bundle, (name, value)| {
            bundle.with_field(*name, value.clone())
        })
}

/// Snapshot in which every standard check passes.
pub fn passing_snapshot() -> PlatformSnapshot {
    PlatformSnapshot::new()
        .with_bundle(
            Platform::Connect,
            bundle(&[
                ("product_type", json!("Equity")),
                ("transaction_type", json!("Buy")),
                ("order_time", json!("2024-03-01T14:00:00Z")),
                ("execution_timestamps", json!(["2024-03-01T14:05:00Z"])),
                ("profile_canvas", json!({"time_zone": "UTC"})),
                ("global_fee_transparency", json!("Engaged")),
            ]),
        )
        .with_bundle(
            Platform::VoiceLogs,
            bundle(&[
                ("voice_log_details", json!({"recording_id": "VL-77", "quality": "clear"})),
                ("voice_log", json!("Client confirmed the order for 100 ACME at market.")),
                ("client_confirmation", json!("confirmed")),
                ("proposal_confirmation", json!("Proposal P-12 attributes repeated")),
                ("mfo_guidance", json!("general market commentary only")),
            ]),
        )
        .with_bundle(
            Platform::DocManager,
            bundle(&[
                ("doc_manager", json!(["scrf.pdf"])),
                ("call_memo", json!("Memo on file")),
                ("engagement_status", json!(" engaged ")),
                ("bilateral_agreement", json!("BA-2024-01")),
            ]),
        )
        .with_bundle(
            Platform::BrokerageBlotter,
            bundle(&[
                ("order_placer_details", json!({"name": "J. Client", "authorized": true})),
                ("client_profile", json!({"segment": "private"})),
                ("trade_ticket", json!("TT-5521")),
                ("brokerage_blotter", json!("solicited")),
                ("trade_blotter", json!("ACME 100 @ MKT")),
                ("ticket_fields", json!({"side": "buy", "qty": 100})),
                ("syndicate_allocation", json!("Syndicate A")),
                ("new_subscription", json!("Active")),
            ]),
        )
        .with_bundle(
            Platform::Aces,
            bundle(&[
                ("control_tab_questions", json!("complete")),
                ("all_reviews_tab_questions", json!("complete")),
                ("language_tab", json!("complete")),
                ("productivity_tab", json!("complete")),
            ]),
        )
}

/// Passing snapshot with an empty trade blotter, which fails test 9.
pub fn blank_blotter_snapshot() -> PlatformSnapshot {
    with_field(passing_snapshot(), Platform::BrokerageBlotter, "trade_blotter", json!(""))
}

/// Replaces one field in an existing snapshot.
pub fn with_field(
    snapshot: PlatformSnapshot,
    platform: Platform,
    name: &str,
    value: Value,
) -> PlatformSnapshot {
    let bundle = snapshot.bundle(platform).cloned().unwrap_or_default().with_field(name, value);
    snapshot.with_bundle(platform, bundle)
}

// ============================================================================
// SECTION: Scripted Evaluators
// ============================================================================

/// Sleeps far longer than any test timeout on every attempt.
pub struct HangingEvaluator {
    /// Number of evaluate calls observed.
    pub calls: Arc<AtomicU32>,
}

impl HangingEvaluator {
    /// Creates an evaluator with a fresh call counter.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl TestEvaluator for HangingEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::LlmBacked
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(CheckOutcome::pass())
    }
}

/// Times out on the first `failures` attempts, then passes.
pub struct FlakyEvaluator {
    /// Attempts that should report a timeout.
    pub failures: u32,
    /// Number of evaluate calls observed.
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl TestEvaluator for FlakyEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(EvaluationError::Timeout("upstream slow".to_string()))
        } else {
            Ok(CheckOutcome::pass_with("recovered"))
        }
    }
}

/// Returns a fixed error on every attempt.
pub struct FailingEvaluator {
    /// Error returned on each call.
    pub error: EvaluationError,
    /// Number of evaluate calls observed.
    pub calls: Arc<AtomicU32>,
}

impl FailingEvaluator {
    /// Creates an evaluator returning `error`.
    pub fn new(error: EvaluationError) -> Self {
        Self {
            error,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl TestEvaluator for FailingEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::LlmBacked
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Returns a fixed outcome immediately.
pub struct FixedEvaluator {
    /// Outcome returned on each call.
    pub outcome: CheckOutcome,
}

#[async_trait]
impl TestEvaluator for FixedEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, _ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        Ok(self.outcome.clone())
    }
}
