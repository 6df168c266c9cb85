// crates/trade-qa-core/src/core/identifiers.rs
// ============================================================================
// Module: Trade QA Identifiers
// Description: Canonical identifiers for tickets and catalog tests.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Identifiers are validated at construction boundaries. Test identifiers are
//! 1-based and bounded by the size of the standard catalog; ticket identifiers
//! are opaque non-empty strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of tests in the standard catalog.
pub const TEST_COUNT: u8 = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Test identifier outside `1..=16`.
    #[error("test id {0} out of range 1..=16")]
    TestIdOutOfRange(u8),
    /// Ticket identifier is empty or whitespace.
    #[error("ticket id must be non-empty")]
    EmptyTicketId,
}

// ============================================================================
// SECTION: Test Identifier
// ============================================================================

/// Catalog test identifier.
///
/// # Invariants
/// - Always within `1..=TEST_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TestId(u8);

impl TestId {
    /// The barrier test that runs after every other test is terminal.
    pub const BARRIER: Self = Self(TEST_COUNT);

    /// Creates a test identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::TestIdOutOfRange`] when `raw` is outside `1..=16`.
    pub const fn new(raw: u8) -> Result<Self, IdentifierError> {
        if raw == 0 || raw > TEST_COUNT {
            return Err(IdentifierError::TestIdOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the zero-based slot index for result tables.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Iterates all catalog identifiers in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=TEST_COUNT).map(Self)
    }

    /// Returns true for the barrier test.
    #[must_use]
    pub const fn is_barrier(self) -> bool {
        self.0 == TEST_COUNT
    }
}

impl TryFrom<u8> for TestId {
    type Error = IdentifierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TestId> for u8 {
    fn from(value: TestId) -> Self {
        value.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Ticket Identifier
// ============================================================================

/// Ticket identifier assigned by the extraction collaborator.
///
/// # Invariants
/// - Non-empty after trimming whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketId(String);

impl TicketId {
    /// Creates a ticket identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyTicketId`] for empty or blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentifierError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdentifierError::EmptyTicketId);
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TicketId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TicketId> for String {
    fn from(value: TicketId) -> Self {
        value.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
