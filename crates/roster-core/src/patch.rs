//! # Position Patches
//!
//! A [`Patch`] is the minimal set of `{id, position}` changes that realizes one
//! gesture. It is exactly what the remote receives, so it carries no record
//! that kept its position.
//!
//! Patches are append-only: entries are pushed while diffing and then the
//! whole patch is either committed to the store or dropped.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One record's new position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PositionChange {
    /// Record id.
    pub id: String,

    /// New position (`sort_order`).
    pub position: u32,
}

/// Ordered, append-only list of position changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    changes: Vec<PositionChange>,
}

impl Patch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change.
    pub fn push(&mut self, id: impl Into<String>, position: u32) {
        self.changes.push(PositionChange {
            id: id.into(),
            position,
        });
    }

    /// Number of records the patch touches.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The changes in the order they were appended.
    pub fn changes(&self) -> &[PositionChange] {
        &self.changes
    }

    /// Iterates over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, PositionChange> {
        self.changes.iter()
    }

    /// Ids named by the patch.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.id.as_str())
    }

    /// Returns the new position for `id`, if the patch names it.
    pub fn position_of(&self, id: &str) -> Option<u32> {
        self.changes
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.position)
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a PositionChange;
    type IntoIter = std::slice::Iter<'a, PositionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
