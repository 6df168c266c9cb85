// crates/trade-qa-core/src/runtime/notify.rs
// ============================================================================
// Module: Trade QA Exception Notifiers
// Description: Reference implementations of the exception notifier contract.
// Purpose: Hand fail decisions to external alerting without owning delivery.
// Dependencies: crate::core, crate::interfaces, tokio
// ============================================================================

//! ## Overview
//! The engine calls an [`ExceptionNotifier`] exactly once per fail decision.
//! [`ChannelNotifier`] forwards notices into a `tokio::sync::mpsc` channel so
//! an external task can deliver them by email or queue.
//! Invariants:
//! - A successful notify enqueues exactly one notice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;

use crate::core::ExceptionNotice;
use crate::interfaces::ExceptionNotifier;
use crate::interfaces::NotifyError;

// ============================================================================
// SECTION: Notifiers
// ============================================================================

/// Notifier that drops every notice.
pub struct NoopNotifier;

impl ExceptionNotifier for NoopNotifier {
    fn notify(&self, _notice: &ExceptionNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that records notices in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    /// Notices in delivery order.
    notices: Arc<Mutex<Vec<ExceptionNotice>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded notices.
    #[must_use]
    pub fn notices(&self) -> Vec<ExceptionNotice> {
        self.notices.lock().map(|notices| notices.clone()).unwrap_or_default()
    }
}

impl ExceptionNotifier for RecordingNotifier {
    fn notify(&self, notice: &ExceptionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .map_err(|_| NotifyError::Delivery("notifier mutex poisoned".to_string()))?
            .push(notice.clone());
        Ok(())
    }
}

/// Channel-based notifier.
#[derive(Debug)]
pub struct ChannelNotifier {
    /// Sender used to enqueue notices.
    sender: Sender<ExceptionNotice>,
}

impl ChannelNotifier {
    /// Creates a notifier over an mpsc sender.
    #[must_use]
    pub const fn new(sender: Sender<ExceptionNotice>) -> Self {
        Self {
            sender,
        }
    }
}

impl ExceptionNotifier for ChannelNotifier {
    fn notify(&self, notice: &ExceptionNotice) -> Result<(), NotifyError> {
        self.sender.try_send(notice.clone()).map_err(|err| match err {
            TrySendError::Closed(_) => NotifyError::Closed("receiver dropped".to_string()),
            TrySendError::Full(_) => NotifyError::Delivery("channel full".to_string()),
        })
    }
}
