// crates/trade-qa-core/src/core/report.rs
// ============================================================================
// Module: Trade QA Run Reports
// Description: Aggregated metrics, decisions, and exception payloads.
// Purpose: Provide the stable, serializable output of one evaluation run.
// Dependencies: crate::core::{hashing, identifiers, result}, serde
// ============================================================================

//! ## Overview
//! A [`RunReport`] is produced once, after the barrier test, and is never
//! mutated afterward. Its field names are part of the persisted contract
//! consumed by reporting layers.
//!
//! Rates follow two fixed formulas:
//! - execution success rate = passed / executed (1.0 when nothing executed)
//! - overall success rate = passed / 16
//!
//! A cancelled run still produces a report, flagged `incomplete` and carrying
//! no decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::fingerprint;
use crate::core::identifiers::TEST_COUNT;
use crate::core::identifiers::TestId;
use crate::core::identifiers::TicketId;
use crate::core::result::ErrorKind;
use crate::core::result::TestResult;
use crate::core::result::Verdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default execution success rate required for a pass decision.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.90;

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Aggregated counts and rates for one run.
///
/// # Invariants
/// - Both rates lie in `[0.0, 1.0]`.
/// - `executed == passed + failed + errored`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Size of the catalog (fixed denominator for the overall rate).
    pub total: u32,
    /// Tests with verdict pass, fail, or error.
    pub executed: u32,
    /// Tests with verdict pass.
    pub passed: u32,
    /// Tests with verdict fail.
    pub failed: u32,
    /// Tests with verdict error.
    pub errored: u32,
    /// Tests with verdict skipped.
    pub skipped: u32,
    /// `passed / executed`, or 1.0 when nothing executed.
    pub execution_success_rate: f64,
    /// `passed / total`.
    pub overall_success_rate: f64,
}

impl RunMetrics {
    /// Aggregates metrics from terminal results.
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        let count = |verdict: Verdict| {
            u32::try_from(results.iter().filter(|result| result.verdict == verdict).count())
                .unwrap_or(u32::MAX)
        };
        let passed = count(Verdict::Pass);
        let failed = count(Verdict::Fail);
        let errored = count(Verdict::Error);
        let skipped = count(Verdict::Skipped);
        let executed = passed + failed + errored;
        let total = u32::from(TEST_COUNT);
        let execution_success_rate =
            if executed == 0 { 1.0 } else { f64::from(passed) / f64::from(executed) };
        Self {
            total,
            executed,
            passed,
            failed,
            errored,
            skipped,
            execution_success_rate,
            overall_success_rate: f64::from(passed) / f64::from(total),
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Final run decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Execution success rate met the threshold.
    Pass,
    /// Execution success rate fell below the threshold.
    Fail,
}

impl Decision {
    /// Decides from an execution success rate and a threshold.
    #[must_use]
    pub fn from_rate(execution_success_rate: f64, threshold: f64) -> Self {
        if execution_success_rate >= threshold { Self::Pass } else { Self::Fail }
    }
}

/// Whether every test reached a genuine terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All sixteen tests ran to completion.
    Complete,
    /// The run was cancelled; results are partial.
    Incomplete,
}

// ============================================================================
// SECTION: Exception Payload
// ============================================================================

/// Detail for one test that did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTest {
    /// Test identifier.
    pub test_id: TestId,
    /// Catalog label.
    pub label: String,
    /// Verdict (fail or error).
    pub verdict: Verdict,
    /// Result message.
    pub message: Option<String>,
    /// Business exception wording from the catalog.
    pub error_code: String,
    /// Error classification when the verdict is error.
    pub error_kind: Option<ErrorKind>,
}

/// Notification payload emitted on a fail decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionNotice {
    /// Ticket identifier.
    pub ticket_id: TicketId,
    /// Execution success rate that triggered the exception.
    pub execution_success_rate: f64,
    /// Threshold in force for the run.
    pub threshold: f64,
    /// Tests that failed a business rule or could not be evaluated.
    pub failed_tests: Vec<FailedTest>,
}

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// Output of one ticket evaluation.
///
/// # Invariants
/// - `results` holds one entry per catalog test, ordered by test id.
/// - `decision` is `None` if and only if `run_status` is incomplete.
/// - `exception` is present if and only if `decision` is fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Ticket identifier.
    pub ticket_id: TicketId,
    /// Completion status.
    pub run_status: RunStatus,
    /// Per-test results ordered by test id.
    pub results: Vec<TestResult>,
    /// Aggregated metrics.
    pub metrics: RunMetrics,
    /// Threshold applied to the execution success rate.
    pub threshold: f64,
    /// Final decision (absent for incomplete runs).
    pub decision: Option<Decision>,
    /// Exception payload for fail decisions.
    pub exception: Option<ExceptionNotice>,
    /// Fingerprint of the deterministic report content.
    pub fingerprint: HashDigest,
}

/// Deterministic view of a result used for fingerprints.
#[derive(Serialize)]
struct ResultFingerprint<'a> {
    /// Test identifier.
    test_id: TestId,
    /// Terminal verdict.
    verdict: Verdict,
    /// Result message.
    message: Option<&'a str>,
    /// Fallback flag.
    degraded: bool,
    /// Error classification.
    error_kind: Option<ErrorKind>,
}

/// Deterministic view of a report used for fingerprints.
#[derive(Serialize)]
struct ReportFingerprint<'a> {
    /// Ticket identifier.
    ticket_id: &'a TicketId,
    /// Completion status.
    run_status: RunStatus,
    /// Per-test deterministic fields.
    results: Vec<ResultFingerprint<'a>>,
    /// Aggregated metrics.
    metrics: &'a RunMetrics,
    /// Final decision.
    decision: Option<Decision>,
}

impl RunReport {
    /// Assembles a report from terminal results.
    ///
    /// `lookup_error_code` supplies the catalog exception wording for a test.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the fingerprint cannot be computed.
    pub fn assemble(
        ticket_id: TicketId,
        run_status: RunStatus,
        mut results: Vec<TestResult>,
        threshold: f64,
        lookup_error_code: impl Fn(TestId) -> String,
    ) -> Result<Self, HashError> {
        results.sort_by_key(|result| result.test_id);
        let metrics = RunMetrics::from_results(&results);
        let decision = match run_status {
            RunStatus::Complete => {
                Some(Decision::from_rate(metrics.execution_success_rate, threshold))
            }
            RunStatus::Incomplete => None,
        };
        let exception = (decision == Some(Decision::Fail)).then(|| ExceptionNotice {
            ticket_id: ticket_id.clone(),
            execution_success_rate: metrics.execution_success_rate,
            threshold,
            failed_tests: results
                .iter()
                .filter(|result| matches!(result.verdict, Verdict::Fail | Verdict::Error))
                .map(|result| FailedTest {
                    test_id: result.test_id,
                    label: result.label.clone(),
                    verdict: result.verdict,
                    message: result.message.clone(),
                    error_code: lookup_error_code(result.test_id),
                    error_kind: result.error_kind,
                })
                .collect(),
        });
        let fingerprint = fingerprint(&ReportFingerprint {
            ticket_id: &ticket_id,
            run_status,
            results: results
                .iter()
                .map(|result| ResultFingerprint {
                    test_id: result.test_id,
                    verdict: result.verdict,
                    message: result.message.as_deref(),
                    degraded: result.degraded,
                    error_kind: result.error_kind,
                })
                .collect(),
            metrics: &metrics,
            decision,
        })?;
        Ok(Self {
            ticket_id,
            run_status,
            results,
            metrics,
            threshold,
            decision,
            exception,
            fingerprint,
        })
    }

    /// Returns true when the run completed and produced a genuine decision.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.run_status == RunStatus::Complete
    }

    /// Returns the result for a test id.
    #[must_use]
    pub fn result(&self, test_id: TestId) -> Option<&TestResult> {
        self.results.iter().find(|result| result.test_id == test_id)
    }

    /// Returns the persisted canonical JSON form of the report.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, HashError> {
        canonical_json_bytes(self)
    }
}
