// crates/trade-qa-core/src/core/platform.rs
// ============================================================================
// Module: Trade QA Platform Data
// Description: Platform identifiers and extracted data bundles.
// Purpose: Model the immutable per-run snapshot of extracted platform data.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each source platform contributes one [`PlatformBundle`]: a JSON object of
//! extracted fields. A [`PlatformSnapshot`] is assembled once per run by the
//! extraction collaborator and is never mutated while tests execute.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Platforms
// ============================================================================

/// Source platform for extracted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Connect order management.
    Connect,
    /// Recorded voice logs.
    VoiceLogs,
    /// Document manager.
    DocManager,
    /// Brokerage blotter.
    BrokerageBlotter,
    /// ACES review tool.
    Aces,
    /// SCRIBE procedures library.
    Scribe,
}

impl Platform {
    /// All platforms in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Connect,
        Self::VoiceLogs,
        Self::DocManager,
        Self::BrokerageBlotter,
        Self::Aces,
        Self::Scribe,
    ];

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::VoiceLogs => "voice_logs",
            Self::DocManager => "doc_manager",
            Self::BrokerageBlotter => "brokerage_blotter",
            Self::Aces => "aces",
            Self::Scribe => "scribe",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Bundles
// ============================================================================

/// Extracted fields for one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformBundle {
    /// Field values keyed by field name.
    fields: Map<String, Value>,
}

impl PlatformBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any previous value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns a field value when the field exists.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the number of fields in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the bundle has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for PlatformBundle {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
        }
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable per-run snapshot of extracted platform data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformSnapshot {
    /// Bundles keyed by platform.
    bundles: BTreeMap<Platform, PlatformBundle>,
}

impl PlatformSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bundle for a platform, replacing any previous bundle.
    #[must_use]
    pub fn with_bundle(mut self, platform: Platform, bundle: PlatformBundle) -> Self {
        self.bundles.insert(platform, bundle);
        self
    }

    /// Returns the bundle for a platform when supplied.
    #[must_use]
    pub fn bundle(&self, platform: Platform) -> Option<&PlatformBundle> {
        self.bundles.get(&platform)
    }

    /// Returns the platforms present in the snapshot.
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.bundles.keys().copied()
    }
}
