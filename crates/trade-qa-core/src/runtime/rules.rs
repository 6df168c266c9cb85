// crates/trade-qa-core/src/runtime/rules.rs
// ============================================================================
// Module: Trade QA Standard Evaluators
// Description: Rule-based and classifier-backed checks for the catalog.
// Purpose: Provide the default evaluator for every standard test.
// Dependencies: crate::{core, interfaces}, async-trait, serde_json, time
// ============================================================================

//! ## Overview
//! Presence semantics are shared by every rule:
//! - a missing bundle or field is [`EvaluationError::DataMissing`];
//! - a field that is null, blank, or an empty collection fails the check.
//!
//! Advice detection has two implementations. [`ClassifierAdviceEvaluator`]
//! asks a [`ClassificationProvider`]; [`KeywordAdviceEvaluator`] scans the
//! transcript for advice phrases and is used when no model is available.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::FieldRef;
use crate::core::Platform;
use crate::core::TestId;
use crate::core::Verdict;
use crate::interfaces::CheckOutcome;
use crate::interfaces::ClassificationProvider;
use crate::interfaces::ClassificationRequest;
use crate::interfaces::EvaluationContext;
use crate::interfaces::EvaluationError;
use crate::interfaces::EvaluatorKind;
use crate::interfaces::TestEvaluator;

// ============================================================================
// SECTION: Presence Helpers
// ============================================================================

/// Returns true when a present value carries no content.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Renders a value as plain text for comparisons and keyword scans.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Checks that every declared input is present and non-empty.
///
/// Returns the failing outcome, or `None` when every input has content.
fn check_inputs(ctx: &EvaluationContext) -> Result<Option<CheckOutcome>, EvaluationError> {
    let mut empty: Vec<String> = Vec::new();
    for FieldRef {
        platform,
        field,
    } in &ctx.definition.inputs
    {
        if is_empty_value(ctx.field(*platform, field)?) {
            empty.push(format!("{platform}.{field}"));
        }
    }
    if empty.is_empty() {
        Ok(None)
    } else {
        Ok(Some(CheckOutcome::fail(format!("empty fields: {}", empty.join(", ")))))
    }
}

// ============================================================================
// SECTION: Presence
// ============================================================================

/// Passes when every declared input field is present and non-empty.
pub struct PresenceEvaluator;

#[async_trait]
impl TestEvaluator for PresenceEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        Ok(check_inputs(ctx)?.unwrap_or_else(|| {
            CheckOutcome::pass_with(format!("{} fields present", ctx.definition.inputs.len()))
        }))
    }
}

// ============================================================================
// SECTION: Timeliness
// ============================================================================

/// Default execution window after order receipt.
pub const DEFAULT_MAX_DELAY_MINUTES: u32 = 15;

/// Passes when execution happened within the allowed delay after the order.
pub struct TimelinessEvaluator {
    /// Maximum delay in minutes.
    max_delay_minutes: u32,
}

impl TimelinessEvaluator {
    /// Creates an evaluator with a maximum delay in minutes.
    #[must_use]
    pub const fn new(max_delay_minutes: u32) -> Self {
        Self {
            max_delay_minutes,
        }
    }
}

impl Default for TimelinessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY_MINUTES)
    }
}

/// Parses an RFC 3339 timestamp or `YYYY-MM-DD HH:MM:SS` read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    let naive = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(raw, naive).ok().map(PrimitiveDateTime::assume_utc)
}

#[async_trait]
impl TestEvaluator for TimelinessEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        if let Some(failed) = check_inputs(ctx)? {
            return Ok(failed);
        }
        let order = ctx.field(Platform::Connect, "order_time")?;
        let execution = match ctx.field(Platform::Connect, "execution_timestamps")? {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        let (order_text, execution_text) = (value_text(order), value_text(&execution));
        let (Some(ordered_at), Some(executed_at)) =
            (parse_timestamp(&order_text), parse_timestamp(&execution_text))
        else {
            return Ok(CheckOutcome::fail(format!(
                "invalid timestamp format (order `{order_text}`, execution `{execution_text}`)"
            )));
        };
        let delay = executed_at - ordered_at;
        if delay.is_negative() {
            return Ok(CheckOutcome::fail("execution precedes order receipt"));
        }
        let delay_minutes = delay.as_seconds_f64() / 60.0;
        let message = format!(
            "time difference {delay_minutes:.1} minutes (SLA {} min)",
            self.max_delay_minutes
        );
        if delay_minutes <= f64::from(self.max_delay_minutes) {
            Ok(CheckOutcome::pass_with(message))
        } else {
            Ok(CheckOutcome::fail(message))
        }
    }
}

// ============================================================================
// SECTION: Cross-Platform Equality
// ============================================================================

/// Passes when two fields hold the same value, ignoring case and padding.
pub struct EqualityEvaluator {
    /// Reference field.
    left: FieldRef,
    /// Field compared against the reference.
    right: FieldRef,
}

impl EqualityEvaluator {
    /// Creates an evaluator comparing two fields.
    #[must_use]
    pub const fn new(left: FieldRef, right: FieldRef) -> Self {
        Self {
            left,
            right,
        }
    }

    /// Compares Connect fee transparency against the Doc Manager engagement status.
    #[must_use]
    pub const fn engagement_status() -> Self {
        Self::new(
            FieldRef {
                platform: Platform::Connect,
                field: "global_fee_transparency",
            },
            FieldRef {
                platform: Platform::DocManager,
                field: "engagement_status",
            },
        )
    }
}

#[async_trait]
impl TestEvaluator for EqualityEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        let left = ctx.field(self.left.platform, self.left.field)?;
        let right = ctx.field(self.right.platform, self.right.field)?;
        if is_empty_value(left) || is_empty_value(right) {
            return Ok(CheckOutcome::fail("comparison field is empty"));
        }
        let (left, right) = (value_text(left), value_text(right));
        if left.trim().to_lowercase() == right.trim().to_lowercase() {
            Ok(CheckOutcome::pass_with(format!("values match: {}", left.trim())))
        } else {
            Ok(CheckOutcome::fail(format!(
                "{}.{} = `{}` but {}.{} = `{}`",
                self.left.platform,
                self.left.field,
                left.trim(),
                self.right.platform,
                self.right.field,
                right.trim()
            )))
        }
    }
}

// ============================================================================
// SECTION: Barrier Completeness
// ============================================================================

/// Checks ACES field completeness after every prior test is terminal.
pub struct CompletenessEvaluator;

#[async_trait]
impl TestEvaluator for CompletenessEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        let missing: Vec<String> = TestId::all()
            .filter(|id| !id.is_barrier())
            .filter(|id| !ctx.prior_results.iter().any(|result| result.test_id == *id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Ok(CheckOutcome::fail(format!(
                "prior results not terminal: tests {}",
                missing.join(", ")
            )));
        }
        if let Some(failed) = check_inputs(ctx)? {
            return Ok(failed);
        }
        let executed =
            ctx.prior_results.iter().filter(|result| result.verdict != Verdict::Skipped).count();
        Ok(CheckOutcome::pass_with(format!(
            "ACES fields complete; {executed} prior tests executed"
        )))
    }
}

// ============================================================================
// SECTION: Advice Detection
// ============================================================================

/// Phrases indicating advice on unapproved products.
const PRODUCT_ADVICE_PHRASES: &[&str] = &[
    "i recommend",
    "i would recommend",
    "i'd recommend",
    "i suggest",
    "my advice",
    "you should buy",
    "you should sell",
    "you should invest",
    "good investment",
];

/// Phrases indicating advice tailored to the client.
const CLIENT_ADVICE_PHRASES: &[&str] = &[
    "for your situation",
    "in your situation",
    "for your portfolio",
    "given your goals",
    "given your risk",
    "suits your needs",
    "i recommend you",
    "you should",
];

/// Question posed to the classifier for unapproved product advice.
const PRODUCT_ADVICE_QUESTION: &str =
    "Does the transcript contain investment advice about products that are not approved?";

/// Question posed to the classifier for client-specific advice.
const CLIENT_ADVICE_QUESTION: &str =
    "Does the transcript contain advice tailored to this specific client's circumstances?";

/// Returns the transcript field shared by both advice checks.
fn transcript(ctx: &EvaluationContext) -> Result<String, EvaluationError> {
    Ok(value_text(ctx.field(Platform::VoiceLogs, "voice_log")?))
}

/// Rule-based advice detection over the voice log transcript.
pub struct KeywordAdviceEvaluator {
    /// Lowercase phrases that indicate advice.
    phrases: &'static [&'static str],
}

impl KeywordAdviceEvaluator {
    /// Detects advice on unapproved products.
    #[must_use]
    pub const fn unapproved_products() -> Self {
        Self {
            phrases: PRODUCT_ADVICE_PHRASES,
        }
    }

    /// Detects advice tailored to the client.
    #[must_use]
    pub const fn client_specific() -> Self {
        Self {
            phrases: CLIENT_ADVICE_PHRASES,
        }
    }
}

#[async_trait]
impl TestEvaluator for KeywordAdviceEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::RuleBased
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        if let Some(failed) = check_inputs(ctx)? {
            return Ok(failed);
        }
        let text = transcript(ctx)?.to_lowercase();
        let hits: Vec<&str> =
            self.phrases.iter().copied().filter(|phrase| text.contains(phrase)).collect();
        if hits.is_empty() {
            Ok(CheckOutcome::pass_with("no advice phrases detected"))
        } else {
            Ok(CheckOutcome::fail(format!("advice phrases detected: {}", hits.join(", "))))
        }
    }
}

/// Model-backed advice detection over the voice log transcript.
pub struct ClassifierAdviceEvaluator {
    /// Classification collaborator.
    classifier: Arc<dyn ClassificationProvider>,
    /// Question posed to the classifier.
    question: &'static str,
}

impl ClassifierAdviceEvaluator {
    /// Detects advice on unapproved products.
    #[must_use]
    pub fn unapproved_products(classifier: Arc<dyn ClassificationProvider>) -> Self {
        Self {
            classifier,
            question: PRODUCT_ADVICE_QUESTION,
        }
    }

    /// Detects advice tailored to the client.
    #[must_use]
    pub fn client_specific(classifier: Arc<dyn ClassificationProvider>) -> Self {
        Self {
            classifier,
            question: CLIENT_ADVICE_QUESTION,
        }
    }
}

#[async_trait]
impl TestEvaluator for ClassifierAdviceEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::LlmBacked
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<CheckOutcome, EvaluationError> {
        if let Some(failed) = check_inputs(ctx)? {
            return Ok(failed);
        }
        let request = ClassificationRequest {
            test_id: ctx.definition.id,
            question: self.question.to_string(),
            text: transcript(ctx)?,
        };
        let judgment = self.classifier.classify(&request).await?;
        let message =
            format!("classified `{}` (confidence {:.2})", judgment.label, judgment.confidence);
        if judgment.flagged {
            Ok(CheckOutcome::fail(message))
        } else {
            Ok(CheckOutcome::pass_with(message))
        }
    }
}
