//! # Draft Collection
//!
//! The isolated copy of the collection used while "edit order" mode is active.
//!
//! A draft is cloned from the confirmed records on entry and never written
//! back. Move-up / move-down swap neighbours inside the draft only. Saving
//! turns the draft into a [`Patch`] against whatever the confirmed collection
//! looks like at save time.

use crate::error::{CoreError, CoreResult};
use crate::ordering;
use crate::patch::Patch;
use crate::types::{ClientType, Direction};

/// Editable copy of the ordered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftCollection {
    records: Vec<ClientType>,
    moves: usize,
}

impl DraftCollection {
    /// Clones `confirmed` into a new draft.
    pub fn from_confirmed(confirmed: &[ClientType]) -> Self {
        DraftCollection {
            records: confirmed.to_vec(),
            moves: 0,
        }
    }

    /// Draft records in draft order.
    pub fn records(&self) -> &[ClientType] {
        &self.records
    }

    /// Number of successful moves since entry.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Moves one record a single step.
    ///
    /// Returns `Ok(false)` when the record is already at that edge.
    ///
    /// # Errors
    /// `NotFound` if the draft has no record with `id`.
    pub fn move_record(&mut self, id: &str, direction: Direction) -> CoreResult<bool> {
        let index = ordering::index_of(&self.records, id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let moved = ordering::swap_adjacent(&mut self.records, index, direction);
        if moved {
            self.moves += 1;
        }
        Ok(moved)
    }

    /// Minimal patch that turns `confirmed` into this draft's ordering.
    pub fn to_patch(&self, confirmed: &[ClientType]) -> Patch {
        ordering::diff(confirmed, &self.records)
    }
}
