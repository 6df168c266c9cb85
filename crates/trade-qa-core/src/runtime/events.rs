// crates/trade-qa-core/src/runtime/events.rs
// ============================================================================
// Module: Trade QA Event Sinks
// Description: JSON-line and in-memory sinks for structured run events.
// Purpose: Route run telemetry without binding to a logging framework.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Sinks receive [`RunEvent`] values from the engine. The stderr and file
//! sinks write one JSON object per line; write failures are swallowed so
//! telemetry can never fail a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::RunEvent;
use crate::interfaces::RunEventSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl RunEventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileEventSink {
    /// Opens the event log in append mode, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunEventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// Sink that discards every event.
pub struct NoopEventSink;

impl RunEventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl MemoryEventSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns recorded events with a given identifier.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<RunEvent> {
        self.events().into_iter().filter(|event| event.event == name).collect()
    }
}

impl RunEventSink for MemoryEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
