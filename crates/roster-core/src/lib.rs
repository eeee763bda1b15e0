//! # roster-core: Pure Ordering Logic for the Client-Type Screen
//!
//! This crate holds everything about the ordered client-type collection that
//! can be expressed without I/O: the record type, the ordered store, the
//! splice/swap/diff math, position patches and the edit-order draft.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Roster Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Display Surfaces (table view, card view)           │   │
//! │  │    drag-drop ──► reorder()     move buttons ──► move_draft()    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          roster-sync (Coordinator + Reorder Engine)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ roster-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ ordering  │  │   store   │  │   draft   │  │   │
//! │  │   │ClientType │  │  splice   │  │RecordStore│  │   Draft   │  │   │
//! │  │   │ Direction │  │ swap/diff │  │FetchState │  │Collection │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • DETERMINISTIC                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `ClientType` record and `Direction`
//! - [`patch`] - `Patch` / `PositionChange` (the minimal change set)
//! - [`ordering`] - Splice-move, adjacent swap and diff
//! - [`store`] - `RecordStore` with its fetch state
//! - [`draft`] - `DraftCollection` for edit-order mode
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation for out-of-band creates
//!
//! ## Example Usage
//!
//! ```rust
//! use roster_core::{ordering, ClientType, RecordStore};
//!
//! let mut store = RecordStore::new();
//! store.load(vec![
//!     ClientType::new("Retail").with_position(0),
//!     ClientType::new("Wholesale").with_position(1),
//!     ClientType::new("Partner").with_position(2),
//! ]);
//!
//! let proposed = ordering::splice_move(store.records(), 2, 0).unwrap();
//! let patch = ordering::diff(store.records(), &proposed);
//! assert_eq!(patch.len(), 3);
//!
//! store.apply_patch(&patch).unwrap();
//! assert_eq!(store.records()[0].name, "Partner");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod ordering;
pub mod patch;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::DraftCollection;
pub use error::{CoreError, CoreResult, ValidationError};
pub use patch::{Patch, PositionChange};
pub use store::{FetchState, RecordStore};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a client-type name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a client-type description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
