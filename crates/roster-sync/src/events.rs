//! # Reorder Events
//!
//! Observers the display layer registers to hear about settles and failures.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Emission Points                                │
//! │                                                                         │
//! │  reorder() / commit_draft()                                            │
//! │      │                                                                  │
//! │      ├──► emit_pending(patch)        optimistic order is visible       │
//! │      │                                                                  │
//! │      ├──► emit_settled(records)      success, or after a fetch         │
//! │      │         or                                                       │
//! │      └──► emit_failure(failure)      exactly once per failed operation │
//! │                                      (followed by emit_settled with    │
//! │                                       the restored order)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use roster_core::{ClientType, Patch};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{FailureKind, SyncError};

/// What a display surface is told when a reorder fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReorderFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable message for a toast.
    pub message: String,
    /// Whether retrying the same operation may succeed.
    pub retryable: bool,
}

impl ReorderFailure {
    /// Builds the notification for `error`, if it is a reorder outcome.
    pub fn from_error(error: &SyncError) -> Option<Self> {
        error.failure_kind().map(|kind| ReorderFailure {
            kind,
            message: error.to_string(),
            retryable: error.is_retryable(),
        })
    }
}

/// Observer for engine state changes.
pub trait ReorderEventEmitter: Send + Sync {
    /// An optimistic ordering is now displayed and `patch` is in flight.
    fn emit_pending(&self, patch: &Patch);

    /// The engine settled; `records` is the displayed (= confirmed) order.
    fn emit_settled(&self, records: &[ClientType]);

    /// A reorder failed and was rolled back.
    fn emit_failure(&self, failure: &ReorderFailure);
}

/// No-op emitter.
pub struct NoOpEmitter;

impl ReorderEventEmitter for NoOpEmitter {
    fn emit_pending(&self, _patch: &Patch) {}
    fn emit_settled(&self, _records: &[ClientType]) {}
    fn emit_failure(&self, _failure: &ReorderFailure) {}
}

// =============================================================================
// Subscribers
// =============================================================================

/// The set of registered emitters.
#[derive(Default)]
pub(crate) struct Subscribers {
    emitters: Mutex<Vec<Arc<dyn ReorderEventEmitter>>>,
}

impl Subscribers {
    pub(crate) fn add(&self, emitter: Arc<dyn ReorderEventEmitter>) {
        self.emitters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(emitter);
    }

    fn each(&self, f: impl Fn(&dyn ReorderEventEmitter)) {
        // Emitters run outside the lock.
        let emitters = self
            .emitters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for emitter in &emitters {
            f(emitter.as_ref());
        }
    }

    pub(crate) fn pending(&self, patch: &Patch) {
        self.each(|e| e.emit_pending(patch));
    }

    pub(crate) fn settled(&self, records: &[ClientType]) {
        self.each(|e| e.emit_settled(records));
    }

    pub(crate) fn failure(&self, failure: &ReorderFailure) {
        self.each(|e| e.emit_failure(failure));
    }
}

/// Emitter that keeps everything it hears. Useful in tests and demos.
#[derive(Default)]
pub struct RecordingEmitter {
    pending: Mutex<Vec<Patch>>,
    settled: Mutex<Vec<Vec<ClientType>>>,
    failures: Mutex<Vec<ReorderFailure>>,
}

impl RecordingEmitter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches announced as pending.
    pub fn pending(&self) -> Vec<Patch> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Orders announced as settled.
    pub fn settled(&self) -> Vec<Vec<ClientType>> {
        self.settled.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Failure notifications.
    pub fn failures(&self) -> Vec<ReorderFailure> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ReorderEventEmitter for RecordingEmitter {
    fn emit_pending(&self, patch: &Patch) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(patch.clone());
    }

    fn emit_settled(&self, records: &[ClientType]) {
        self.settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(records.to_vec());
    }

    fn emit_failure(&self, failure: &ReorderFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}
