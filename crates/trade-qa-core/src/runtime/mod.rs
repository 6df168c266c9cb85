// crates/trade-qa-core/src/runtime/mod.rs
// ============================================================================
// Module: Trade QA Runtime
// Description: Evaluation engine, execution policy, evaluators, and sinks.
// Purpose: Execute the test graph for one ticket and deliver the report.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement the concurrent test graph evaluator and the
//! reference collaborators it ships with. Callers that only need a report
//! build a [`QaEngine`] from an [`EvaluatorRegistry`] and an [`EngineConfig`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod events;
pub mod notify;
pub mod policy;
pub mod registry;
pub mod rules;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::CancelHandle;
pub use engine::CancelSignal;
pub use engine::DEFAULT_MAX_CONCURRENCY;
pub use engine::EngineConfig;
pub use engine::QaEngine;
pub use engine::RunError;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use notify::ChannelNotifier;
pub use notify::NoopNotifier;
pub use notify::RecordingNotifier;
pub use policy::Resolution;
pub use policy::ResolutionScope;
pub use policy::RetryPolicy;
pub use policy::TimeoutPolicy;
pub use registry::EvaluatorRegistry;
pub use rules::ClassifierAdviceEvaluator;
pub use rules::CompletenessEvaluator;
pub use rules::EqualityEvaluator;
pub use rules::KeywordAdviceEvaluator;
pub use rules::PresenceEvaluator;
pub use rules::TimelinessEvaluator;
pub use store::FileReportStore;
pub use store::InMemoryReportStore;
