// crates/trade-qa-config/src/lib.rs
// ============================================================================
// Module: Trade QA Config Library
// Description: Canonical config model and validation for the QA engine.
// Purpose: Single source of truth for trade-qa.toml semantics.
// Dependencies: trade-qa-core, serde, toml
// ============================================================================

//! ## Overview
//! `trade-qa-config` loads `trade-qa.toml`, validates it strictly, and turns
//! it into the runtime [`trade_qa_core::EngineConfig`], the standard
//! evaluator registry, and the configured event sink. Invalid configuration
//! fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
