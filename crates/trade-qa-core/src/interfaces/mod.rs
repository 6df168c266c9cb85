// crates/trade-qa-core/src/interfaces/mod.rs
// ============================================================================
// Module: Trade QA Interfaces
// Description: Contracts for evaluators, classifiers, notifiers, and stores.
// Purpose: Define the pluggable seams used by the evaluation runtime.
// Dependencies: crate::core, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe every collaborator the runtime talks to without
//! binding to a backend. Evaluators and classifiers are async because they
//! may wait on external data or model calls; notifiers, stores, and event
//! sinks are synchronous and must not block for long.
//!
//! Implementations must fail closed: missing data is reported as
//! [`EvaluationError::DataMissing`], never silently passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Decision;
use crate::core::ErrorKind;
use crate::core::ExceptionNotice;
use crate::core::Platform;
use crate::core::PlatformBundle;
use crate::core::PlatformSnapshot;
use crate::core::RunReport;
use crate::core::RunStatus;
use crate::core::TestDefinition;
use crate::core::TestId;
use crate::core::TestResult;
use crate::core::Ticket;
use crate::core::TicketId;
use crate::core::Verdict;

// ============================================================================
// SECTION: Evaluation Errors
// ============================================================================

/// Errors raised by a single evaluator attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A required platform bundle or field was absent.
    #[error("data missing: {0}")]
    DataMissing(String),
    /// An external data source did not respond in time.
    #[error("timed out: {0}")]
    Timeout(String),
    /// The classification model is unavailable.
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),
    /// The run was cancelled.
    #[error("cancelled")]
    Cancelled,
    /// The evaluator failed for another reason.
    #[error("evaluation failed: {0}")]
    Failed(String),
}

impl EvaluationError {
    /// Returns the persisted error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DataMissing(_) => ErrorKind::DataMissing,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Failed(_) => ErrorKind::Failed,
        }
    }

    /// Returns true when the attempt may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true when a registered fallback evaluator should run.
    #[must_use]
    pub const fn allows_fallback(&self) -> bool {
        matches!(self, Self::DataMissing(_) | Self::ToolUnavailable(_))
    }
}

// ============================================================================
// SECTION: Test Evaluator
// ============================================================================

/// Capability class of an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Deterministic rule over extracted fields.
    RuleBased,
    /// Judgment delegated to a classification model.
    LlmBacked,
}

/// Business-rule outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// True when the rule is satisfied.
    pub passed: bool,
    /// Optional explanation.
    pub message: Option<String>,
}

impl CheckOutcome {
    /// Rule satisfied without further detail.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    /// Rule satisfied with an explanation.
    #[must_use]
    pub fn pass_with(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: Some(message.into()),
        }
    }

    /// Rule violated with an explanation.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Immutable inputs handed to one evaluator call.
///
/// # Invariants
/// - Built once per test per run and never mutated.
/// - `prior_results` is empty for every test except the barrier.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Validated ticket.
    pub ticket: Arc<Ticket>,
    /// Catalog entry being evaluated.
    pub definition: TestDefinition,
    /// Platform data captured at run start.
    pub snapshot: Arc<PlatformSnapshot>,
    /// Terminal results of tests 1-15 (barrier only).
    pub prior_results: Vec<TestResult>,
}

impl EvaluationContext {
    /// Returns the platform bundle or [`EvaluationError::DataMissing`].
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::DataMissing`] when the bundle is absent.
    pub fn bundle(&self, platform: Platform) -> Result<&PlatformBundle, EvaluationError> {
        self.snapshot.bundle(platform).ok_or_else(|| {
            EvaluationError::DataMissing(format!("platform bundle `{platform}` not supplied"))
        })
    }

    /// Returns a field from a platform bundle or [`EvaluationError::DataMissing`].
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::DataMissing`] when the bundle or field is absent.
    pub fn field(&self, platform: Platform, name: &str) -> Result<&Value, EvaluationError> {
        self.bundle(platform)?.field(name).ok_or_else(|| {
            EvaluationError::DataMissing(format!("field `{platform}.{name}` not supplied"))
        })
    }
}

/// Pluggable check for one catalog test.
#[async_trait]
pub trait TestEvaluator: Send + Sync {
    /// Returns the capability class used to select the attempt timeout.
    fn kind(&self) -> EvaluatorKind;

    /// Evaluates the check against the supplied context.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the check cannot be evaluated.
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError>;
}

// ============================================================================
// SECTION: Classification Provider
// ============================================================================

/// Fuzzy text judgment requested by an LLM-backed evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Test requesting the judgment.
    pub test_id: TestId,
    /// Question the model must answer.
    pub question: String,
    /// Text under review.
    pub text: String,
}

/// Model judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Free-form label chosen by the model.
    pub label: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// True when the text exhibits the behavior asked about.
    pub flagged: bool,
}

/// Classification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// No model access exists.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    /// The model did not respond in time.
    #[error("classifier timed out: {0}")]
    Timeout(String),
    /// The model returned an unusable response.
    #[error("classifier error: {0}")]
    Failed(String),
}

impl From<ClassifierError> for EvaluationError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Unavailable(reason) => Self::ToolUnavailable(reason),
            ClassifierError::Timeout(reason) => Self::Timeout(reason),
            ClassifierError::Failed(reason) => Self::Failed(reason),
        }
    }
}

/// Semantic classifier used by LLM-backed evaluators.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    /// Classifies text against a question.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] when no judgment can be produced.
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, ClassifierError>;
}

// ============================================================================
// SECTION: Exception Notifier
// ============================================================================

/// Exception notification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The delivery channel is closed.
    #[error("notifier closed: {0}")]
    Closed(String),
    /// Delivery failed.
    #[error("notification failed: {0}")]
    Delivery(String),
}

/// Receiver of fail decisions.
pub trait ExceptionNotifier: Send + Sync {
    /// Delivers an exception notice.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the notice cannot be handed off.
    fn notify(&self, notice: &ExceptionNotice) -> Result<(), NotifyError>;
}

// ============================================================================
// SECTION: Report Store
// ============================================================================

/// Report store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("report store io error: {0}")]
    Io(String),
    /// Stored data failed to decode.
    #[error("report store corruption: {0}")]
    Corrupt(String),
    /// Store reported an error.
    #[error("report store error: {0}")]
    Store(String),
}

/// Persistence for run reports, keyed by ticket id.
pub trait ReportStore: Send + Sync {
    /// Saves a report, replacing any previous report for the same ticket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, report: &RunReport) -> Result<(), StoreError>;

    /// Loads the latest report for a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self, ticket_id: &TicketId) -> Result<Option<RunReport>, StoreError>;
}

// ============================================================================
// SECTION: Run Events
// ============================================================================

/// Structured run event, serialized as one JSON line by file and stderr sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Ticket under evaluation.
    pub ticket_id: String,
    /// Test the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<TestId>,
    /// Terminal verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    /// Attempts made so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u8>,
    /// Error classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Fallback flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    /// Run completion status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_status: Option<RunStatus>,
    /// Final decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunEvent {
    /// Creates an event with a consistent timestamp and no optional fields.
    fn base(event: &'static str, ticket_id: &TicketId) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            ticket_id: ticket_id.to_string(),
            test_id: None,
            verdict: None,
            attempts: None,
            error_kind: None,
            degraded: None,
            run_status: None,
            decision: None,
            message: None,
        }
    }

    /// Run accepted and applicability resolved.
    #[must_use]
    pub fn run_started(ticket_id: &TicketId, applicable: usize) -> Self {
        Self {
            message: Some(format!("{applicable} applicable tests")),
            ..Self::base("run_started", ticket_id)
        }
    }

    /// A test reached a terminal state.
    #[must_use]
    pub fn test_finished(ticket_id: &TicketId, result: &TestResult) -> Self {
        Self {
            test_id: Some(result.test_id),
            verdict: Some(result.verdict),
            attempts: Some(result.attempts),
            error_kind: result.error_kind,
            degraded: Some(result.degraded),
            message: result.message.clone(),
            ..Self::base("test_finished", ticket_id)
        }
    }

    /// An attempt timed out and will be retried.
    #[must_use]
    pub fn test_retried(
        ticket_id: &TicketId,
        test_id: TestId,
        attempt: u8,
        error: &EvaluationError,
    ) -> Self {
        Self {
            test_id: Some(test_id),
            attempts: Some(attempt),
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
            ..Self::base("test_retried", ticket_id)
        }
    }

    /// The primary evaluator failed and the fallback took over.
    #[must_use]
    pub fn fallback_used(ticket_id: &TicketId, test_id: TestId, error: &EvaluationError) -> Self {
        Self {
            test_id: Some(test_id),
            error_kind: Some(error.kind()),
            degraded: Some(true),
            message: Some(error.to_string()),
            ..Self::base("fallback_used", ticket_id)
        }
    }

    /// The report was assembled.
    #[must_use]
    pub fn run_finished(report: &RunReport) -> Self {
        Self {
            run_status: Some(report.run_status),
            decision: report.decision,
            message: Some(format!(
                "executed={} passed={} execution_success_rate={:.4}",
                report.metrics.executed,
                report.metrics.passed,
                report.metrics.execution_success_rate
            )),
            ..Self::base("run_finished", &report.ticket_id)
        }
    }

    /// The exception notifier rejected a notice.
    #[must_use]
    pub fn notification_failed(ticket_id: &TicketId, error: &NotifyError) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::base("notification_failed", ticket_id)
        }
    }

    /// The report store rejected a report.
    #[must_use]
    pub fn store_failed(ticket_id: &TicketId, error: &StoreError) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::base("store_failed", ticket_id)
        }
    }
}

/// Destination for structured run events.
pub trait RunEventSink: Send + Sync {
    /// Records an event. Sinks must not fail the run.
    fn record(&self, event: &RunEvent);
}
