//! # Record Store
//!
//! The confirmed, ordered client-type collection.
//!
//! ## Store Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FetchState Machine                              │
//! │                                                                         │
//! │   NotLoaded ──begin_loading──► Loading ──load──────► Loaded            │
//! │                                   │                    │  ▲            │
//! │                                   └──fail_loading──► Error │            │
//! │                                                        │   │            │
//! │                                    begin_loading ◄─────┘   │            │
//! │                                          │                 │            │
//! │                                          └──► Loading ─────┘            │
//! │                                                                         │
//! │   Every load, insert and remove bumps `generation`. Writers holding a  │
//! │   result computed against an older generation must discard it.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Iteration order always matches ascending `position`
//! - Positions are the remote's slots; a contiguous fetch stays contiguous
//!   through every patch, insert and remove
//! - Ids are unique
//! - A patch is applied completely or not at all

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ordering;
use crate::patch::Patch;
use crate::types::ClientType;

// =============================================================================
// Fetch State
// =============================================================================

/// Where the store is in its fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FetchState {
    /// Nothing fetched yet.
    #[default]
    NotLoaded,
    /// A fetch is outstanding.
    Loading,
    /// The collection reflects a successful fetch.
    Loaded,
    /// The last fetch failed.
    Error(String),
}

impl FetchState {
    /// True once any fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchState::Loaded)
    }
}

// =============================================================================
// Record Store
// =============================================================================

/// The confirmed collection of client types.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ClientType>,
    fetch_state: FetchState,
    generation: u64,
}

impl RecordStore {
    /// Creates an empty, not-yet-loaded store.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Fetch Lifecycle
    // =========================================================================

    /// Marks a fetch as outstanding. The current records stay readable.
    pub fn begin_loading(&mut self) {
        self.fetch_state = FetchState::Loading;
    }

    /// Replaces the whole collection with `records`.
    ///
    /// Records are sorted by position; a later duplicate of an id is dropped.
    /// Empty input yields an empty collection.
    pub fn load(&mut self, records: Vec<ClientType>) {
        let mut seen = HashSet::new();
        let mut records: Vec<ClientType> = records
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        ordering::sort_by_position(&mut records);

        self.records = records;
        self.fetch_state = FetchState::Loaded;
        self.generation += 1;
    }

    /// Records a failed fetch. The previous records stay in place.
    pub fn fail_loading(&mut self, message: impl Into<String>) {
        self.fetch_state = FetchState::Error(message.into());
    }

    /// Current fetch state.
    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch_state
    }

    /// Bumped whenever the set of records changes (`load`, `insert`,
    /// `remove`).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Records in ascending position order.
    pub fn records(&self) -> &[ClientType] {
        &self.records
    }

    /// Owned copy of the records.
    pub fn snapshot(&self) -> Vec<ClientType> {
        self.records.clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<&ClientType> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The record explicitly flagged as default, if any.
    pub fn default_record(&self) -> Option<&ClientType> {
        self.records.iter().find(|r| r.is_default)
    }

    /// True if positions are exactly `0..len`.
    pub fn is_contiguous(&self) -> bool {
        ordering::is_contiguous(&self.records)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Applies every change in `patch`, then resorts.
    ///
    /// # Errors
    /// `NotFound` for the first id the store does not hold; in that case no
    /// record is changed.
    pub fn apply_patch(&mut self, patch: &Patch) -> CoreResult<()> {
        let index: HashMap<&str, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut targets = Vec::with_capacity(patch.len());
        for change in patch {
            let Some(&i) = index.get(change.id.as_str()) else {
                return Err(CoreError::NotFound(change.id.clone()));
            };
            targets.push((i, change.position));
        }

        for (i, position) in targets {
            self.records[i].position = position;
        }
        ordering::sort_by_position(&mut self.records);
        Ok(())
    }

    /// Appends a newly created record in the slot after the last one.
    ///
    /// # Errors
    /// `DuplicateId` if the id is already present.
    pub fn insert(&mut self, mut record: ClientType) -> CoreResult<()> {
        if self.get(&record.id).is_some() {
            return Err(CoreError::DuplicateId(record.id));
        }
        record.position = self.records.last().map_or(0, |last| last.position + 1);
        self.records.push(record);
        self.generation += 1;
        Ok(())
    }

    /// Flips `is_active` on one record. Position is untouched.
    pub fn set_active(&mut self, id: &str, active: bool) -> CoreResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        record.is_active = active;
        Ok(())
    }

    /// Removes a record and closes the gap it leaves.
    pub fn remove(&mut self, id: &str) -> CoreResult<ClientType> {
        let index = ordering::index_of(&self.records, id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let removed = self.records.remove(index);
        ordering::close_gap(&mut self.records, removed.position);
        self.generation += 1;
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
