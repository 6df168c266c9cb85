// crates/trade-qa-core/src/runtime/store.rs
// ============================================================================
// Module: Trade QA Report Stores
// Description: In-memory and directory-backed report persistence.
// Purpose: Make finished and partial run reports discoverable by ticket id.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryReportStore`] backs tests and local runs. [`FileReportStore`]
//! writes each report as canonical JSON into a directory, one file per
//! ticket, replacing the previous report atomically via rename.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::RunReport;
use crate::core::TicketId;
use crate::interfaces::ReportStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory report store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReportStore {
    /// Reports keyed by ticket id, protected by a mutex.
    reports: Arc<Mutex<BTreeMap<String, RunReport>>>,
}

impl InMemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the number of stored reports.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        let guard = self
            .reports
            .lock()
            .map_err(|_| StoreError::Store("report store mutex poisoned".to_string()))?;
        Ok(guard.len())
    }
}

impl ReportStore for InMemoryReportStore {
    fn save(&self, report: &RunReport) -> Result<(), StoreError> {
        self.reports
            .lock()
            .map_err(|_| StoreError::Store("report store mutex poisoned".to_string()))?
            .insert(report.ticket_id.to_string(), report.clone());
        Ok(())
    }

    fn load(&self, ticket_id: &TicketId) -> Result<Option<RunReport>, StoreError> {
        let guard = self
            .reports
            .lock()
            .map_err(|_| StoreError::Store("report store mutex poisoned".to_string()))?;
        Ok(guard.get(ticket_id.as_str()).cloned())
    }
}

// ============================================================================
// SECTION: File Store
// ============================================================================

/// Directory-backed report store writing canonical JSON files.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    /// Directory holding one `<ticket_id>.json` file per ticket.
    root: PathBuf,
}

impl FileReportStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the file path for a ticket.
    fn report_path(&self, ticket_id: &TicketId) -> Result<PathBuf, StoreError> {
        let raw = ticket_id.as_str();
        let safe = raw.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
            && !raw.starts_with('.');
        if !safe {
            return Err(StoreError::Store(format!(
                "ticket id `{raw}` is not a valid file name"
            )));
        }
        Ok(self.root.join(format!("{raw}.json")))
    }
}

impl ReportStore for FileReportStore {
    fn save(&self, report: &RunReport) -> Result<(), StoreError> {
        let path = self.report_path(&report.ticket_id)?;
        let bytes = report.to_canonical_json().map_err(|err| StoreError::Store(err.to_string()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes).map_err(|err| StoreError::Io(err.to_string()))?;
        fs::rename(&staging, &path).map_err(|err| StoreError::Io(err.to_string()))
    }

    fn load(&self, ticket_id: &TicketId) -> Result<Option<RunReport>, StoreError> {
        let path = self.report_path(ticket_id)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Corrupt(err.to_string()))
    }
}
