//! # Error Types
//!
//! Domain-specific error types for roster-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  roster-core errors (this file)                                        │
//! │  ├── CoreError        - Store / ordering failures                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  roster-sync errors (separate crate)                                   │
//! │  └── SyncError        - Gateway, engine and coordinator failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → display surface       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the store and the ordering math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A record referenced by id is not in the collection.
    ///
    /// ## When This Occurs
    /// - A patch names a record that was deleted out-of-band
    /// - A draft was built before a delete and saved after it
    #[error("Record not found: {0}")]
    NotFound(String),

    /// An index does not address a record in the collection.
    #[error("Index {index} is out of range for a collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The gesture's id no longer sits at the gesture's source index.
    ///
    /// The display surface rendered an older ordering than the confirmed one.
    #[error("Record {id} is at index {actual}, not {expected}")]
    StaleIndex {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// A record with this id already exists.
    #[error("Record {0} already exists")]
    DuplicateId(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
