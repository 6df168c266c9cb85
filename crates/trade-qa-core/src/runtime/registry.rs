// crates/trade-qa-core/src/runtime/registry.rs
// ============================================================================
// Module: Trade QA Evaluator Registry
// Description: Primary and fallback evaluators keyed by test id.
// Purpose: Let callers swap check implementations without touching the engine.
// Dependencies: crate::{core, interfaces, runtime::rules}
// ============================================================================

//! ## Overview
//! The registry is fixed once a run starts. [`EvaluatorRegistry::standard`]
//! picks the advice-detection capability from classifier availability: with a
//! classifier, tests 6 and 10 are model-backed with keyword fallbacks;
//! without one, the keyword evaluators are primary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::TestId;
use crate::interfaces::ClassificationProvider;
use crate::interfaces::TestEvaluator;
use crate::runtime::rules::ClassifierAdviceEvaluator;
use crate::runtime::rules::CompletenessEvaluator;
use crate::runtime::rules::DEFAULT_MAX_DELAY_MINUTES;
use crate::runtime::rules::EqualityEvaluator;
use crate::runtime::rules::KeywordAdviceEvaluator;
use crate::runtime::rules::PresenceEvaluator;
use crate::runtime::rules::TimelinessEvaluator;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Evaluators keyed by test id.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    /// Primary evaluator per test.
    primary: BTreeMap<TestId, Arc<dyn TestEvaluator>>,
    /// Optional fallback evaluator per test.
    fallback: BTreeMap<TestId, Arc<dyn TestEvaluator>>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard registry with the default timeliness window.
    #[must_use]
    pub fn standard(classifier: Option<Arc<dyn ClassificationProvider>>) -> Self {
        Self::standard_with_window(classifier, DEFAULT_MAX_DELAY_MINUTES)
    }

    /// Builds the standard registry with an explicit timeliness window.
    #[must_use]
    pub fn standard_with_window(
        classifier: Option<Arc<dyn ClassificationProvider>>,
        max_delay_minutes: u32,
    ) -> Self {
        let mut registry = Self::new();
        let presence: Arc<dyn TestEvaluator> = Arc::new(PresenceEvaluator);
        for id in TestId::all() {
            registry.register(id, Arc::clone(&presence));
        }
        registry.register(standard_id(6), Arc::new(KeywordAdviceEvaluator::unapproved_products()));
        registry.register(standard_id(10), Arc::new(KeywordAdviceEvaluator::client_specific()));
        registry.register(standard_id(11), Arc::new(TimelinessEvaluator::new(max_delay_minutes)));
        registry.register(standard_id(12), Arc::new(EqualityEvaluator::engagement_status()));
        registry.register(TestId::BARRIER, Arc::new(CompletenessEvaluator));
        if let Some(classifier) = classifier {
            registry.register(
                standard_id(6),
                Arc::new(ClassifierAdviceEvaluator::unapproved_products(Arc::clone(&classifier))),
            );
            registry.register_fallback(
                standard_id(6),
                Arc::new(KeywordAdviceEvaluator::unapproved_products()),
            );
            registry.register(
                standard_id(10),
                Arc::new(ClassifierAdviceEvaluator::client_specific(classifier)),
            );
            registry.register_fallback(
                standard_id(10),
                Arc::new(KeywordAdviceEvaluator::client_specific()),
            );
        }
        registry
    }

    /// Registers or replaces the primary evaluator for a test.
    pub fn register(&mut self, id: TestId, evaluator: Arc<dyn TestEvaluator>) -> &mut Self {
        self.primary.insert(id, evaluator);
        self
    }

    /// Registers or replaces the fallback evaluator for a test.
    pub fn register_fallback(
        &mut self,
        id: TestId,
        evaluator: Arc<dyn TestEvaluator>,
    ) -> &mut Self {
        self.fallback.insert(id, evaluator);
        self
    }

    /// Removes the fallback evaluator for a test.
    pub fn clear_fallback(&mut self, id: TestId) -> &mut Self {
        self.fallback.remove(&id);
        self
    }

    /// Returns the primary evaluator for a test.
    #[must_use]
    pub fn primary(&self, id: TestId) -> Option<Arc<dyn TestEvaluator>> {
        self.primary.get(&id).cloned()
    }

    /// Returns the fallback evaluator for a test.
    #[must_use]
    pub fn fallback(&self, id: TestId) -> Option<Arc<dyn TestEvaluator>> {
        self.fallback.get(&id).cloned()
    }
}

/// Returns a standard catalog id known to be in range.
fn standard_id(raw: u8) -> TestId {
    TestId::new(raw).unwrap_or(TestId::BARRIER)
}
