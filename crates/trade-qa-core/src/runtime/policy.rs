// crates/trade-qa-core/src/runtime/policy.rs
// ============================================================================
// Module: Trade QA Execution Policy
// Description: Per-attempt timeouts, timeout-only retries, and fallback.
// Purpose: Turn one evaluator call into a terminal outcome for one test.
// Dependencies: crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! Each attempt runs under a timeout chosen by evaluator kind. Only
//! [`EvaluationError::Timeout`] is retried; the delay before retry `n` is
//! `base_delay * 2^(n-1)`. When the primary evaluator reports missing data or
//! an unavailable tool and a fallback is registered, the fallback runs under
//! the same policy and its outcome is tagged degraded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::core::TicketId;
use crate::interfaces::CheckOutcome;
use crate::interfaces::EvaluationContext;
use crate::interfaces::EvaluationError;
use crate::interfaces::EvaluatorKind;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventSink;
use crate::interfaces::TestEvaluator;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Default per-attempt timeout for rule-based evaluators.
pub const DEFAULT_RULE_BASED_TIMEOUT: Duration = Duration::from_secs(60);
/// Default per-attempt timeout for LLM-backed evaluators.
pub const DEFAULT_LLM_BACKED_TIMEOUT: Duration = Duration::from_secs(120);
/// Default attempt cap.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Per-attempt timeout limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Limit for rule-based evaluators.
    pub rule_based: Duration,
    /// Limit for LLM-backed evaluators.
    pub llm_backed: Duration,
}

impl TimeoutPolicy {
    /// Returns the limit for an evaluator kind.
    #[must_use]
    pub const fn for_kind(&self, kind: EvaluatorKind) -> Duration {
        match kind {
            EvaluatorKind::RuleBased => self.rule_based,
            EvaluatorKind::LlmBacked => self.llm_backed,
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            rule_based: DEFAULT_RULE_BASED_TIMEOUT,
            llm_backed: DEFAULT_LLM_BACKED_TIMEOUT,
        }
    }
}

/// Timeout retry policy.
///
/// # Invariants
/// - `max_attempts >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u8,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Returns the delay before retry `retry` (1-based).
    #[must_use]
    pub fn delay_before(&self, retry: u8) -> Duration {
        let exponent = u32::from(retry.saturating_sub(1));
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Terminal outcome of one test after retries and fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Business outcome or the final error.
    pub outcome: Result<CheckOutcome, EvaluationError>,
    /// Attempts made across primary and fallback.
    pub attempts: u8,
    /// True when the fallback evaluator produced the outcome.
    pub degraded: bool,
}

/// Inputs shared by every resolution in a run.
#[derive(Clone)]
pub struct ResolutionScope {
    /// Ticket under evaluation, for event correlation.
    pub ticket_id: TicketId,
    /// Timeout limits.
    pub timeouts: TimeoutPolicy,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Event sink.
    pub events: Arc<dyn RunEventSink>,
}

impl ResolutionScope {
    /// Resolves one test using a primary and optional fallback evaluator.
    pub async fn resolve(
        &self,
        primary: &dyn TestEvaluator,
        fallback: Option<&dyn TestEvaluator>,
        ctx: &EvaluationContext,
    ) -> Resolution {
        let (outcome, attempts) = self.run_with_retry(primary, ctx).await;
        let Some(fallback) = fallback else {
            return Resolution {
                outcome,
                attempts,
                degraded: false,
            };
        };
        match outcome {
            Err(err) if err.allows_fallback() => {
                let event = RunEvent::fallback_used(&self.ticket_id, ctx.definition.id, &err);
                self.events.record(&event);
                let (outcome, fallback_attempts) = self.run_with_retry(fallback, ctx).await;
                Resolution {
                    outcome,
                    attempts: attempts.saturating_add(fallback_attempts),
                    degraded: true,
                }
            }
            outcome => Resolution {
                outcome,
                attempts,
                degraded: false,
            },
        }
    }

    /// Runs an evaluator with per-attempt timeouts and timeout-only retries.
    async fn run_with_retry(
        &self,
        evaluator: &dyn TestEvaluator,
        ctx: &EvaluationContext,
    ) -> (Result<CheckOutcome, EvaluationError>, u8) {
        let limit = self.timeouts.for_kind(evaluator.kind());
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u8 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let outcome = match tokio::time::timeout(limit, evaluator.evaluate(ctx)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(EvaluationError::Timeout(format!(
                    "attempt {attempt} exceeded {} ms",
                    limit.as_millis()
                ))),
            };
            match outcome {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    self.events.record(&RunEvent::test_retried(
                        &self.ticket_id,
                        ctx.definition.id,
                        attempt,
                        &err,
                    ));
                    tokio::time::sleep(self.retry.delay_before(attempt)).await;
                }
                outcome => return (outcome, attempt),
            }
        }
    }
}
