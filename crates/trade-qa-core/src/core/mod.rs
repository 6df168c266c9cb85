// crates/trade-qa-core/src/core/mod.rs
// ============================================================================
// Module: Trade QA Core Types
// Description: Tickets, platform data, the test catalog, results, and reports.
// Purpose: Provide stable, serializable types shared by every runtime layer.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are data only. They describe what a ticket looks like, which
//! tests exist and when they apply, and what a finished run reports. None of
//! them perform I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod applicability;
pub mod catalog;
pub mod hashing;
pub mod identifiers;
pub mod platform;
pub mod report;
pub mod result;
pub mod ticket;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use applicability::Applicability;
pub use applicability::SkipReason;
pub use catalog::FieldRef;
pub use catalog::TestCatalog;
pub use catalog::TestDefinition;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::IdentifierError;
pub use identifiers::TEST_COUNT;
pub use identifiers::TestId;
pub use identifiers::TicketId;
pub use platform::Platform;
pub use platform::PlatformBundle;
pub use platform::PlatformSnapshot;
pub use report::DEFAULT_DECISION_THRESHOLD;
pub use report::Decision;
pub use report::ExceptionNotice;
pub use report::FailedTest;
pub use report::RunMetrics;
pub use report::RunReport;
pub use report::RunStatus;
pub use result::ErrorKind;
pub use result::TestResult;
pub use result::Verdict;
pub use ticket::EngageStatus;
pub use ticket::InvalidTicket;
pub use ticket::OrderTakerType;
pub use ticket::OrderType;
pub use ticket::ProductClass;
pub use ticket::Ticket;
pub use ticket::TicketRecord;
