// crates/trade-qa-core/src/lib.rs
// ============================================================================
// Module: Trade QA Core Library
// Description: Public API surface for the trade ticket QA evaluator.
// Purpose: Expose core types, collaborator interfaces, and the runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Trade QA core decides which of sixteen business-rule checks apply to a
//! trade ticket, evaluates them concurrently against extracted platform data,
//! and aggregates the verdicts into a pass or fail decision. It owns no UI,
//! transport, or data extraction; those integrate through explicit
//! interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CheckOutcome;
pub use interfaces::Classification;
pub use interfaces::ClassificationProvider;
pub use interfaces::ClassificationRequest;
pub use interfaces::ClassifierError;
pub use interfaces::EvaluationContext;
pub use interfaces::EvaluationError;
pub use interfaces::EvaluatorKind;
pub use interfaces::ExceptionNotifier;
pub use interfaces::NotifyError;
pub use interfaces::ReportStore;
pub use interfaces::RunEvent;
pub use interfaces::RunEventSink;
pub use interfaces::StoreError;
pub use interfaces::TestEvaluator;
pub use runtime::CancelHandle;
pub use runtime::CancelSignal;
pub use runtime::EngineConfig;
pub use runtime::EvaluatorRegistry;
pub use runtime::InMemoryReportStore;
pub use runtime::QaEngine;
pub use runtime::RetryPolicy;
pub use runtime::RunError;
pub use runtime::TimeoutPolicy;
