// crates/trade-qa-core/src/core/result.rs
// ============================================================================
// Module: Trade QA Test Results
// Description: Per-test verdicts, error classification, and result records.
// Purpose: Provide write-once, serializable outcomes for each catalog test.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`TestResult`] is created exactly once per test per run and is never
//! mutated afterward. Business-rule failures ([`Verdict::Fail`]) and checks
//! that could not be evaluated ([`Verdict::Error`]) are kept distinct so the
//! report never conflates them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TestId;

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Terminal outcome of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Business rule satisfied.
    Pass,
    /// Business rule violated.
    Fail,
    /// Test not applicable to the ticket.
    Skipped,
    /// Test could not be evaluated.
    Error,
}

impl Verdict {
    /// Returns true when the test was actually executed.
    #[must_use]
    pub const fn is_executed(self) -> bool {
        matches!(self, Self::Pass | Self::Fail | Self::Error)
    }

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a test that ended in [`Verdict::Error`].
///
/// # Invariants
/// - Variants are stable for persisted reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required platform data was absent.
    DataMissing,
    /// External data source did not respond in time.
    Timeout,
    /// Classification model unavailable and no fallback registered.
    ToolUnavailable,
    /// Run was cancelled before the test reached a terminal state.
    Cancelled,
    /// Evaluator failed unexpectedly.
    Failed,
}

impl ErrorKind {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataMissing => "data_missing",
            Self::Timeout => "timeout",
            Self::ToolUnavailable => "tool_unavailable",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of one test in one run.
///
/// # Invariants
/// - `error_kind` is set if and only if `verdict` is [`Verdict::Error`].
/// - `attempts` is zero for skipped tests.
/// - `completion_seq` is unique within a run and reflects the order in which
///   tests reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test identifier.
    pub test_id: TestId,
    /// Catalog label.
    pub label: String,
    /// Terminal verdict.
    pub verdict: Verdict,
    /// Optional explanation (skip reason, failure detail, or error detail).
    pub message: Option<String>,
    /// Wall time spent evaluating, in milliseconds.
    pub duration_ms: u64,
    /// Number of evaluator attempts made.
    pub attempts: u8,
    /// True when the verdict came from a fallback evaluator.
    pub degraded: bool,
    /// Error classification for [`Verdict::Error`].
    pub error_kind: Option<ErrorKind>,
    /// 1-based order in which the test reached a terminal state.
    pub completion_seq: u32,
    /// Milliseconds since run start when the result was recorded.
    pub finished_at_ms: u64,
}

impl TestResult {
    /// Returns true when the verdict is terminal-executed (pass, fail, error).
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        self.verdict.is_executed()
    }
}
