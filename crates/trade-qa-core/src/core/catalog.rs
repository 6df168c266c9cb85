// crates/trade-qa-core/src/core/catalog.rs
// ============================================================================
// Module: Trade QA Test Catalog
// Description: The sixteen business-rule checks and their routing conditions.
// Purpose: Provide the fixed test graph consumed by the evaluator runtime.
// Dependencies: crate::core::{applicability, identifiers, platform, ticket}, serde
// ============================================================================

//! ## Overview
//! The catalog is a fixed table of sixteen [`TestDefinition`] entries. Tests
//! 1-15 have no ordering dependency on each other; test 16 is the barrier
//! that observes every prior terminal result before running.
//!
//! The catalog is data only. Evaluation logic is registered separately so
//! rule-based and LLM-backed implementations can be swapped without touching
//! routing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::applicability::Applicability;
use crate::core::identifiers::TestId;
use crate::core::platform::Platform;
use crate::core::ticket::EngageStatus;
use crate::core::ticket::OrderTakerType;
use crate::core::ticket::OrderType;
use crate::core::ticket::ProductClass;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Reference to an extracted field on a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRef {
    /// Source platform.
    pub platform: Platform,
    /// Field name within the platform bundle.
    pub field: &'static str,
}

/// One catalog entry.
///
/// # Invariants
/// - `id` is unique within a catalog.
/// - The barrier entry always applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDefinition {
    /// Test identifier.
    pub id: TestId,
    /// Short human label.
    pub label: &'static str,
    /// Business objective of the check.
    pub objective: &'static str,
    /// Exception wording raised when the check fails.
    pub error_code: &'static str,
    /// Procedure reference for reviewers.
    pub sop_reference: &'static str,
    /// Fields read by the check.
    pub inputs: Vec<FieldRef>,
    /// Routing predicate.
    pub applicability: Applicability,
    /// Whether the standard implementation needs a classification model.
    pub llm_backed: bool,
}

impl TestDefinition {
    /// Returns true for the barrier test.
    #[must_use]
    pub const fn is_barrier(&self) -> bool {
        self.id.is_barrier()
    }

    /// Returns the distinct platforms this test reads from.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        let mut out: Vec<Platform> = Vec::new();
        for input in &self.inputs {
            if !out.contains(&input.platform) {
                out.push(input.platform);
            }
        }
        out
    }

    /// Returns the field names read from a platform, in declaration order.
    #[must_use]
    pub fn fields_for(&self, platform: Platform) -> Vec<&'static str> {
        self.inputs
            .iter()
            .filter(|input| input.platform == platform)
            .map(|input| input.field)
            .collect()
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Ordered set of test definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TestCatalog {
    /// Definitions ordered by test id.
    definitions: Vec<TestDefinition>,
}

impl TestCatalog {
    /// Builds the standard sixteen-test catalog.
    #[must_use]
    pub fn standard() -> Self {
        let definitions = TestId::all()
            .zip(STANDARD_ENTRIES.iter())
            .map(|(id, entry)| TestDefinition {
                id,
                label: entry.label,
                objective: entry.objective,
                error_code: entry.error_code,
                sop_reference: entry.sop_reference,
                inputs: entry
                    .inputs
                    .iter()
                    .map(|(platform, field)| FieldRef {
                        platform: *platform,
                        field: *field,
                    })
                    .collect(),
                applicability: (entry.applicability)(),
                llm_backed: entry.llm_backed,
            })
            .collect();
        Self {
            definitions,
        }
    }

    /// Returns the definition for a test id.
    #[must_use]
    pub fn get(&self, id: TestId) -> Option<&TestDefinition> {
        self.definitions.iter().find(|definition| definition.id == id)
    }

    /// Iterates definitions in test id order.
    pub fn iter(&self) -> impl Iterator<Item = &TestDefinition> {
        self.definitions.iter()
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// SECTION: Standard Entries
// ============================================================================

/// Static description of a standard catalog entry.
struct CatalogEntry {
    /// Short human label.
    label: &'static str,
    /// Business objective.
    objective: &'static str,
    /// Exception wording.
    error_code: &'static str,
    /// Procedure reference.
    sop_reference: &'static str,
    /// Fields read by the check.
    inputs: &'static [(Platform, &'static str)],
    /// Routing predicate constructor.
    applicability: fn() -> Applicability,
    /// Whether the standard implementation is LLM-backed.
    llm_backed: bool,
}

/// Applies unconditionally.
const fn always() -> Applicability {
    Applicability::Always
}

/// Applies to non-engaged accounts.
const fn engage_no() -> Applicability {
    Applicability::EngageStatusIs(EngageStatus::No)
}

/// Applies to engaged accounts.
const fn engage_yes() -> Applicability {
    Applicability::EngageStatusIs(EngageStatus::Yes)
}

/// Applies to orders that are not approved products.
const fn not_approved() -> Applicability {
    Applicability::OrderTypeIsNot(OrderType::Approved)
}

/// Applies to FVEQ new issuance orders.
const fn fveq_new_issuance() -> Applicability {
    Applicability::OrderTypeIs(OrderType::FveqNewIssuance)
}

/// Applies to FI new issuance orders.
const fn fi_new_issuance() -> Applicability {
    Applicability::OrderTypeIs(OrderType::FiNewIssuance)
}

/// Applies to orders taken by an MFO.
const fn mfo() -> Applicability {
    Applicability::OrderTakerIs(OrderTakerType::Mfo)
}

/// Applies to product classes with an execution-time SLA.
fn timely_products() -> Applicability {
    Applicability::ProductClassIn(vec![
        ProductClass::Equity,
        ProductClass::Etf,
        ProductClass::Options,
        ProductClass::Fx,
        ProductClass::Metals,
    ])
}

/// Applies to products in bilateral agreement scope.
const fn bilateral() -> Applicability {
    Applicability::BilateralScope
}

/// Standard entries, ordered by test id.
const STANDARD_ENTRIES: [CatalogEntry; 16] = [
    CatalogEntry {
        label: "Eligibility validation",
        objective: "Validate eligibility of sample record for evaluation",
        error_code: "Record not eligible for evaluation",
        sop_reference: "Validate Eligibility",
        inputs: &[(Platform::Connect, "product_type"), (Platform::Connect, "transaction_type")],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Voice log recorded",
        objective: "Confirm Voice Log recorded for order",
        error_code: "Voice Log could not be located / Poor call recording quality",
        sop_reference: "All Reviews Tab Q #1",
        inputs: &[(Platform::VoiceLogs, "voice_log_details")],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Order placer authorization",
        objective: "Verify order placer authorization",
        error_code: "Order placer was not authorized",
        sop_reference: "All Reviews Tab Q #2",
        inputs: &[
            (Platform::BrokerageBlotter, "order_placer_details"),
            (Platform::BrokerageBlotter, "client_profile"),
        ],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Client confirmation (Engage = No)",
        objective: "Confirm order with client when the account is not engaged",
        error_code: "Trade Order was not confirmed with Client",
        sop_reference: "All Reviews Tab Q #3",
        inputs: &[(Platform::VoiceLogs, "voice_log"), (Platform::VoiceLogs, "client_confirmation")],
        applicability: engage_no,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Proposal confirmation (Engage = Yes)",
        objective: "Confirm order with client when the account is engaged",
        error_code: "Proposal ID not stated or attributes not repeated",
        sop_reference: "All Reviews Tab Q #4",
        inputs: &[
            (Platform::VoiceLogs, "voice_log"),
            (Platform::VoiceLogs, "proposal_confirmation"),
        ],
        applicability: engage_yes,
        llm_backed: false,
    },
    CatalogEntry {
        label: "No advice on unapproved products",
        objective: "Ensure no advice on unapproved products",
        error_code: "Investor gave advice for unapproved products",
        sop_reference: "All Reviews Tab Q #5",
        inputs: &[(Platform::VoiceLogs, "voice_log")],
        applicability: not_approved,
        llm_backed: true,
    },
    CatalogEntry {
        label: "SCRF/DRE documentation",
        objective: "Validate SCRF or DRE documentation",
        error_code: "SCRF/DRE not on file",
        sop_reference: "All Reviews Tab Q #6",
        inputs: &[(Platform::DocManager, "doc_manager"), (Platform::DocManager, "call_memo")],
        applicability: fveq_new_issuance,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Trade solicitation documentation",
        objective: "Confirm trade solicitation documentation",
        error_code: "Trade solicitation inaccurately tagged / not documented",
        sop_reference: "All Reviews Tab Q #7",
        inputs: &[
            (Platform::BrokerageBlotter, "trade_ticket"),
            (Platform::BrokerageBlotter, "brokerage_blotter"),
        ],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Trade documentation verification",
        objective: "Verify trade documentation on blotter/ticket",
        error_code: "VL details inaccurate/not documented",
        sop_reference: "All Reviews Tab Q #8",
        inputs: &[
            (Platform::BrokerageBlotter, "trade_blotter"),
            (Platform::BrokerageBlotter, "ticket_fields"),
        ],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "No client-specific advice (MFO)",
        objective: "Avoid client-specific advice for MFO",
        error_code: "Client-specific advice was provided",
        sop_reference: "All Reviews Tab Q #9",
        inputs: &[(Platform::VoiceLogs, "mfo_guidance"), (Platform::VoiceLogs, "voice_log")],
        applicability: mfo,
        llm_backed: true,
    },
    CatalogEntry {
        label: "Timely execution",
        objective: "Check timely order execution",
        error_code: "Order not executed timely",
        sop_reference: "All Reviews Tab Q #10",
        inputs: &[
            (Platform::Connect, "order_time"),
            (Platform::Connect, "execution_timestamps"),
            (Platform::Connect, "profile_canvas"),
        ],
        applicability: timely_products,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Engagement status verification",
        objective: "Verify engagement status for account",
        error_code: "N/A",
        sop_reference: "Control Tab Q #3",
        inputs: &[
            (Platform::Connect, "global_fee_transparency"),
            (Platform::DocManager, "engagement_status"),
        ],
        applicability: always,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Bilateral agreement documentation",
        objective: "Check bilateral agreement documentation",
        error_code: "Agreement not documented",
        sop_reference: "All Reviews Tab Q #1",
        inputs: &[(Platform::DocManager, "bilateral_agreement")],
        applicability: bilateral,
        llm_backed: false,
    },
    CatalogEntry {
        label: "Syndicate allocation",
        objective: "Validate if Syndicate Allocation is correct",
        error_code: "Incorrect Syndicate Allocation tagging",
        sop_reference: "Control Tab Q #2",
        inputs: &[(Platform::BrokerageBlotter, "syndicate_allocation")],
        applicability: fveq_new_issuance,
        llm_backed: false,
    },
    CatalogEntry {
        label: "New subscription status",
        objective: "Check New Subscription status",
        error_code: "Incorrect New Subscription status",
        sop_reference: "Control Tab Q #2",
        inputs: &[(Platform::BrokerageBlotter, "new_subscription")],
        applicability: fi_new_issuance,
        llm_backed: false,
    },
    CatalogEntry {
        label: "ACES fields completeness",
        objective: "Ensure all required ACES fields are complete",
        error_code: "Incomplete ACES fields",
        sop_reference: "Final Steps",
        inputs: &[
            (Platform::Aces, "control_tab_questions"),
            (Platform::Aces, "all_reviews_tab_questions"),
            (Platform::Aces, "language_tab"),
            (Platform::Aces, "productivity_tab"),
        ],
        applicability: always,
        llm_backed: false,
    },
];
