// crates/trade-qa-core/src/core/ticket.rs
// ============================================================================
// Module: Trade QA Tickets
// Description: Ticket records, routing attributes, and ticket validation.
// Purpose: Turn untrusted extracted ticket records into typed, immutable tickets.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`TicketRecord`] is the raw shape produced by the extraction collaborator;
//! every routing attribute is optional there. [`Ticket::from_record`] validates
//! the record once per run and fails with [`InvalidTicket`] when any attribute
//! needed for applicability decisions is absent.
//!
//! Routing attributes are closed enums with an `Other` escape hatch so that
//! free-form business labels never silently match a known category.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TicketId;

// ============================================================================
// SECTION: Routing Attributes
// ============================================================================

/// Engagement status recorded for the account.
///
/// Labels are matched case-insensitively and may carry an `Engage =` prefix.
/// Unrecognized labels parse as [`EngageStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngageStatus {
    /// Account is engaged.
    Yes,
    /// Account is not engaged.
    No,
    /// Engagement status could not be determined.
    Unknown,
}

impl From<String> for EngageStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for EngageStatus {
    fn from(value: &str) -> Self {
        let normalized = normalize(value);
        let label = normalized.strip_prefix("engage").map_or(normalized.as_str(), |rest| {
            let rest = rest.trim_start();
            rest.strip_prefix('=').map_or(rest, str::trim_start)
        });
        match label {
            "yes" | "y" => Self::Yes,
            "no" | "n" => Self::No,
            _ => Self::Unknown,
        }
    }
}

impl From<EngageStatus> for String {
    fn from(value: EngageStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EngageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "Unknown",
        })
    }
}

/// Order type category used for conditional routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderType {
    /// Approved product order.
    Approved,
    /// Fair value equity new issuance.
    FveqNewIssuance,
    /// Fixed income new issuance.
    FiNewIssuance,
    /// Any other order type label.
    Other(String),
}

impl OrderType {
    /// Returns the business label for the order type.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Approved => "Approved",
            Self::FveqNewIssuance => "FVEQ New Issuance",
            Self::FiNewIssuance => "FI New Issuance",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for OrderType {
    fn from(value: String) -> Self {
        match normalize(&value).as_str() {
            "approved" => Self::Approved,
            "fveq new issuance" => Self::FveqNewIssuance,
            "fi new issuance" => Self::FiNewIssuance,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for OrderType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<OrderType> for String {
    fn from(value: OrderType) -> Self {
        match value {
            OrderType::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Product class of the traded instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductClass {
    /// Cash equity.
    Equity,
    /// Exchange traded fund.
    Etf,
    /// Listed options.
    Options,
    /// Foreign exchange.
    Fx,
    /// Precious metals.
    Metals,
    /// Any other product class label.
    Other(String),
}

impl ProductClass {
    /// Returns the business label for the product class.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Equity => "Equity",
            Self::Etf => "ETF",
            Self::Options => "Options",
            Self::Fx => "FX",
            Self::Metals => "Metals",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ProductClass {
    fn from(value: String) -> Self {
        match normalize(&value).as_str() {
            "equity" => Self::Equity,
            "etf" => Self::Etf,
            "options" | "listed options" => Self::Options,
            "fx" => Self::Fx,
            "metals" | "precious metals" => Self::Metals,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ProductClass {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ProductClass> for String {
    fn from(value: ProductClass) -> Self {
        match value {
            ProductClass::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for ProductClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Type of desk that took the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderTakerType {
    /// Multi-family office.
    Mfo,
    /// Any other order taker label.
    Other(String),
}

impl OrderTakerType {
    /// Returns the business label for the order taker type.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Mfo => "MFO",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for OrderTakerType {
    fn from(value: String) -> Self {
        if normalize(&value) == "mfo" { Self::Mfo } else { Self::Other(value) }
    }
}

impl From<&str> for OrderTakerType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<OrderTakerType> for String {
    fn from(value: OrderTakerType) -> Self {
        match value {
            OrderTakerType::Mfo => "MFO".to_string(),
            OrderTakerType::Other(label) => label,
        }
    }
}

impl fmt::Display for OrderTakerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercases and collapses whitespace for label matching.
fn normalize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

// ============================================================================
// SECTION: Ticket Record
// ============================================================================

/// Raw ticket record as produced by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Ticket identifier.
    #[serde(default)]
    pub ticket_id: Option<String>,
    /// Optional free-form ticket type label.
    #[serde(default)]
    pub ticket_type: Option<String>,
    /// Engagement status.
    #[serde(default)]
    pub engage_status: Option<EngageStatus>,
    /// Order type.
    #[serde(default)]
    pub order_type: Option<OrderType>,
    /// Product class.
    #[serde(default)]
    pub product_class: Option<ProductClass>,
    /// Order taker type.
    #[serde(default)]
    pub order_taker_type: Option<OrderTakerType>,
    /// Whether the product is in scope for bilateral agreement checks.
    #[serde(default)]
    pub bilateral_scope: Option<bool>,
}

/// Run-level rejection raised before any test is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ticket: {reason}")]
pub struct InvalidTicket {
    /// Attribute that failed validation.
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl InvalidTicket {
    /// Builds a rejection for a missing attribute.
    fn missing(field: &'static str) -> Self {
        Self {
            field,
            reason: format!("missing required attribute `{field}`"),
        }
    }
}

// ============================================================================
// SECTION: Ticket
// ============================================================================

/// Validated ticket used for one evaluation run.
///
/// # Invariants
/// - All routing attributes are present.
/// - Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier.
    pub ticket_id: TicketId,
    /// Optional free-form ticket type label.
    pub ticket_type: Option<String>,
    /// Engagement status.
    pub engage_status: EngageStatus,
    /// Order type.
    pub order_type: OrderType,
    /// Product class.
    pub product_class: ProductClass,
    /// Order taker type.
    pub order_taker_type: OrderTakerType,
    /// Bilateral agreement scope flag.
    pub bilateral_scope: bool,
}

impl Ticket {
    /// Validates a raw ticket record.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTicket`] when the ticket id is empty or any routing
    /// attribute is missing.
    pub fn from_record(record: &TicketRecord) -> Result<Self, InvalidTicket> {
        let raw_id = record.ticket_id.as_ref().ok_or_else(|| InvalidTicket::missing("ticket_id"))?;
        let ticket_id = TicketId::new(raw_id.clone()).map_err(|err| InvalidTicket {
            field: "ticket_id",
            reason: err.to_string(),
        })?;
        Ok(Self {
            ticket_id,
            ticket_type: record.ticket_type.clone(),
            engage_status: record
                .engage_status
                .ok_or_else(|| InvalidTicket::missing("engage_status"))?,
            order_type: record
                .order_type
                .clone()
                .ok_or_else(|| InvalidTicket::missing("order_type"))?,
            product_class: record
                .product_class
                .clone()
                .ok_or_else(|| InvalidTicket::missing("product_class"))?,
            order_taker_type: record
                .order_taker_type
                .clone()
                .ok_or_else(|| InvalidTicket::missing("order_taker_type"))?,
            bilateral_scope: record
                .bilateral_scope
                .ok_or_else(|| InvalidTicket::missing("bilateral_scope"))?,
        })
    }
}

impl From<&Ticket> for TicketRecord {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_id: Some(ticket.ticket_id.to_string()),
            ticket_type: ticket.ticket_type.clone(),
            engage_status: Some(ticket.engage_status),
            order_type: Some(ticket.order_type.clone()),
            product_class: Some(ticket.product_class.clone()),
            order_taker_type: Some(ticket.order_taker_type.clone()),
            bilateral_scope: Some(ticket.bilateral_scope),
        }
    }
}
