// crates/trade-qa-core/src/core/applicability.rs
// ============================================================================
// Module: Trade QA Applicability
// Description: Closed set of routing predicates over typed ticket attributes.
// Purpose: Decide deterministically which catalog tests apply to a ticket.
// Dependencies: crate::core::ticket, serde
// ============================================================================

//! ## Overview
//! Applicability is expressed as a small tagged predicate set rather than
//! free-form string rules, so every routing decision is exhaustive and
//! testable. Evaluation yields either "applies" or a [`SkipReason`] naming the
//! unmet condition together with the observed ticket value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ticket::EngageStatus;
use crate::core::ticket::OrderTakerType;
use crate::core::ticket::OrderType;
use crate::core::ticket::ProductClass;
use crate::core::ticket::Ticket;

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Routing predicate deciding whether a test applies to a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Applicability {
    /// Test always applies.
    Always,
    /// Applies when the engagement status matches.
    EngageStatusIs(EngageStatus),
    /// Applies when the order type matches.
    OrderTypeIs(OrderType),
    /// Applies when the order type differs.
    OrderTypeIsNot(OrderType),
    /// Applies when the order taker type matches.
    OrderTakerIs(OrderTakerType),
    /// Applies when the product class is one of the listed classes.
    ProductClassIn(Vec<ProductClass>),
    /// Applies when the product is in bilateral agreement scope.
    BilateralScope,
}

/// Reason a test was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipReason {
    /// Condition that was not met.
    pub condition: String,
    /// Observed ticket value.
    pub observed: String,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "condition not met: {} (observed {})", self.condition, self.observed)
    }
}

impl Applicability {
    /// Evaluates the predicate against a ticket.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the predicate does not hold.
    pub fn evaluate(&self, ticket: &Ticket) -> Result<(), SkipReason> {
        let (holds, observed) = match self {
            Self::Always => return Ok(()),
            Self::EngageStatusIs(status) => (
                ticket.engage_status == *status,
                format!("engage_status = {}", ticket.engage_status),
            ),
            Self::OrderTypeIs(order_type) => {
                (ticket.order_type == *order_type, format!("order_type = {}", ticket.order_type))
            }
            Self::OrderTypeIsNot(order_type) => {
                (ticket.order_type != *order_type, format!("order_type = {}", ticket.order_type))
            }
            Self::OrderTakerIs(taker) => (
                ticket.order_taker_type == *taker,
                format!("order_taker_type = {}", ticket.order_taker_type),
            ),
            Self::ProductClassIn(classes) => (
                classes.contains(&ticket.product_class),
                format!("product_class = {}", ticket.product_class),
            ),
            Self::BilateralScope => {
                (ticket.bilateral_scope, format!("bilateral_scope = {}", ticket.bilateral_scope))
            }
        };
        if holds {
            Ok(())
        } else {
            Err(SkipReason {
                condition: self.describe(),
                observed,
            })
        }
    }

    /// Returns true when the predicate holds for the ticket.
    #[must_use]
    pub fn applies(&self, ticket: &Ticket) -> bool {
        self.evaluate(ticket).is_ok()
    }

    /// Returns a human-readable rendering of the condition.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Always => "always".to_string(),
            Self::EngageStatusIs(status) => format!("engage_status == {status}"),
            Self::OrderTypeIs(order_type) => format!("order_type == {order_type}"),
            Self::OrderTypeIsNot(order_type) => format!("order_type != {order_type}"),
            Self::OrderTakerIs(taker) => format!("order_taker_type == {taker}"),
            Self::ProductClassIn(classes) => {
                let labels: Vec<&str> = classes.iter().map(ProductClass::label).collect();
                format!("product_class in {{{}}}", labels.join(", "))
            }
            Self::BilateralScope => "bilateral_scope == true".to_string(),
        }
    }
}
