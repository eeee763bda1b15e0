//! # Dual-Surface Coordinator
//!
//! Arbitrates between the two edit surfaces that can reorder the collection.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Edit Mode Transitions                           │
//! │                                                                         │
//! │   ┌──────────────┐   enter_draft_mode()    ┌──────────────────────┐    │
//! │   │    DIRECT    │ ──────────────────────► │        DRAFT         │    │
//! │   │              │   (refused while the    │                      │    │
//! │   │ drop events  │    engine is Pending)   │ move_draft(id, dir)  │    │
//! │   │ → reorder()  │                         │ swaps neighbours in  │    │
//! │   │ one engine   │ ◄────────────────────── │ the draft only       │    │
//! │   │ cycle each   │   cancel_draft()        │                      │    │
//! │   │              │   (zero network)        │                      │    │
//! │   │ failure →    │                         │ commit_draft():      │    │
//! │   │ full revert  │ ◄────────────────────── │  ok   → back to      │    │
//! │   └──────────────┘   commit_draft() ok     │         DIRECT       │    │
//! │                                            │  fail → stay DRAFT,  │    │
//! │                                            │         draft kept   │    │
//! │                                            └──────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roster_core::{ClientType, Direction, DraftCollection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::engine::{ReorderEngine, ReorderOutcome};
use crate::error::{SyncError, SyncResult};

// =============================================================================
// View Model
// =============================================================================

/// Which surface currently owns the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Drag-and-drop; every drop persists immediately.
    Direct,
    /// Edit-order mode; moves stay local until commit.
    Draft,
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditMode::Direct => write!(f, "direct"),
            EditMode::Draft => write!(f, "draft"),
        }
    }
}

/// Everything a table or card view needs to render the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    /// Records in display order.
    pub records: Vec<ClientType>,
    /// True while a patch is in flight.
    pub is_reordering: bool,
    /// Current edit mode.
    pub mode: EditMode,
    /// Whether the "edit order" affordance should be enabled.
    pub can_enter_draft: bool,
    /// Whether the draft differs from the confirmed order.
    pub has_unsaved_changes: bool,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Owns the draft and routes gestures to the engine.
pub struct Coordinator {
    engine: Arc<ReorderEngine>,
    draft: Mutex<Option<DraftCollection>>,
}

impl Coordinator {
    /// Creates a coordinator in direct mode.
    pub fn new(engine: Arc<ReorderEngine>) -> Self {
        Coordinator {
            engine,
            draft: Mutex::new(None),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<ReorderEngine> {
        &self.engine
    }

    /// Current edit mode.
    pub fn mode(&self) -> EditMode {
        if self.lock_draft().is_some() {
            EditMode::Draft
        } else {
            EditMode::Direct
        }
    }

    /// The draft in draft mode, the engine's displayed order otherwise.
    pub fn displayed_order(&self) -> Vec<ClientType> {
        match self.lock_draft().as_ref() {
            Some(draft) => draft.records().to_vec(),
            None => self.engine.displayed_order(),
        }
    }

    /// True while a patch is in flight.
    pub fn is_reordering(&self) -> bool {
        self.engine.is_reordering()
    }

    /// Whether entering draft mode would be accepted right now.
    pub fn can_enter_draft(&self) -> bool {
        self.mode() == EditMode::Direct && !self.engine.is_reordering() && self.engine.is_live()
    }

    /// Snapshot for display surfaces.
    pub fn view(&self) -> ListView {
        let (records, mode, has_unsaved_changes) = match self.lock_draft().as_ref() {
            Some(draft) => (
                draft.records().to_vec(),
                EditMode::Draft,
                !draft.to_patch(&self.engine.confirmed_order()).is_empty(),
            ),
            None => (self.engine.displayed_order(), EditMode::Direct, false),
        };

        ListView {
            records,
            is_reordering: self.engine.is_reordering(),
            mode,
            can_enter_draft: mode == EditMode::Direct
                && !self.engine.is_reordering()
                && self.engine.is_live(),
            has_unsaved_changes,
        }
    }

    // =========================================================================
    // Direct Surface
    // =========================================================================

    /// Drop event from the drag surface.
    pub async fn reorder(&self, id: &str, from_index: usize, to_index: usize) -> SyncResult<ReorderOutcome> {
        self.require_mode(EditMode::Direct)?;
        self.engine.reorder(id, from_index, to_index).await
    }

    // =========================================================================
    // Draft Surface
    // =========================================================================

    /// Clones the confirmed collection into a new draft.
    ///
    /// # Errors
    /// - `Busy` while a patch is in flight
    /// - `ModeConflict` if a draft already exists
    pub fn enter_draft_mode(&self) -> SyncResult<()> {
        let Some(_lane) = self.engine.try_lane() else {
            debug!("Refusing draft mode while a patch is in flight");
            return Err(SyncError::Busy);
        };
        if !self.engine.is_live() {
            return Err(SyncError::Detached);
        }

        let mut draft = self.lock_draft();
        if draft.is_some() {
            return Err(SyncError::ModeConflict {
                mode: EditMode::Draft.to_string(),
            });
        }

        let confirmed = self.engine.confirmed_order();
        info!(count = confirmed.len(), "Entering draft mode");
        *draft = Some(DraftCollection::from_confirmed(&confirmed));
        Ok(())
    }

    /// Moves one record a single step inside the draft.
    ///
    /// Returns `Ok(false)` if the record is already at that edge.
    pub fn move_draft(&self, id: &str, direction: Direction) -> SyncResult<bool> {
        let mut draft = self.lock_draft();
        let draft = draft.as_mut().ok_or_else(|| SyncError::ModeConflict {
            mode: EditMode::Direct.to_string(),
        })?;

        let moved = draft.move_record(id, direction)?;
        debug!(id = %id, %direction, moved, "Draft move");
        Ok(moved)
    }

    /// Discards the draft. Nothing is sent and the store is untouched.
    pub fn cancel_draft(&self) -> SyncResult<()> {
        let discarded = self.lock_draft().take().ok_or_else(|| SyncError::ModeConflict {
            mode: EditMode::Direct.to_string(),
        })?;
        info!(moves = discarded.moves(), "Draft discarded");
        Ok(())
    }

    /// Submits the draft as one patch.
    ///
    /// On success the coordinator returns to direct mode. On failure the
    /// draft is kept so the user can retry.
    pub async fn commit_draft(&self) -> SyncResult<ReorderOutcome> {
        let (proposed, moves) = {
            let draft = self.lock_draft();
            let draft = draft.as_ref().ok_or_else(|| SyncError::ModeConflict {
                mode: EditMode::Direct.to_string(),
            })?;
            (draft.records().to_vec(), draft.moves())
        };

        match self.engine.commit_ordering(&proposed).await {
            Ok(outcome) => {
                let mut draft = self.lock_draft();
                // Keep a draft that was edited again while the commit was out.
                if draft.as_ref().is_some_and(|d| d.moves() == moves) {
                    *draft = None;
                }
                info!(
                    changed = outcome.patch().map_or(0, |p| p.len()),
                    "Draft committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Draft commit failed; draft preserved");
                Err(e)
            }
        }
    }

    /// Drops any draft and detaches the engine.
    pub fn detach(&self) {
        self.lock_draft().take();
        self.engine.detach();
    }

    fn require_mode(&self, expected: EditMode) -> SyncResult<()> {
        let mode = self.mode();
        if mode != expected {
            return Err(SyncError::ModeConflict {
                mode: mode.to_string(),
            });
        }
        Ok(())
    }

    fn lock_draft(&self) -> MutexGuard<'_, Option<DraftCollection>> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
