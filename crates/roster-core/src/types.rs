//! # Domain Types
//!
//! The client-type record and the small enums the edit surfaces speak in.
//!
//! ## Record Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ClientType                                     │
//! │                                                                         │
//! │  id           UUID v4, immutable, never reused                         │
//! │  name         display name                                             │
//! │  description  optional display text                                    │
//! │  position     sort_order, contiguous 0..n when settled                 │
//! │  is_active    toggled out-of-band, independent of position             │
//! │  is_default   at most one per collection, never touched by a reorder   │
//! │  usage_count  read-only metric shown next to the row                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Client Type
// =============================================================================

/// One client-type classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientType {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Display and consumption order (`sort_order` on the remote).
    #[serde(alias = "sort_order", alias = "sortOrder")]
    pub position: u32,

    /// Whether the type can be assigned to new clients.
    pub is_active: bool,

    /// Whether this is the platform's default type.
    pub is_default: bool,

    /// Number of clients currently using this type.
    #[ts(type = "number")]
    pub usage_count: u64,

    /// When the record was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ClientType {
    /// Creates an active, non-default record with a fresh id at position 0.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        ClientType {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            position: 0,
            is_active: true,
            is_default: false,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the id (used when records come from a known source).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the position.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the record as the default type.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Returns true if this record may be deleted.
    ///
    /// A type still assigned to clients, or the default type, stays.
    pub fn can_delete(&self) -> bool {
        self.usage_count == 0 && !self.is_default
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Move direction for the edit-order buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards index 0.
    Up,
    /// Towards the end of the list.
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}
