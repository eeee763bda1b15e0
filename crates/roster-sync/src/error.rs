//! # Sync Error Types
//!
//! Error types for gateway, engine and coordinator operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Remote         │  │   Engine        │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Transient      │  │  NotFound       │  │  InvalidConfig          │ │
//! │  │  Conflict       │  │  Busy           │  │  ConfigLoadFailed       │ │
//! │  │  Auth           │  │  Detached       │  │  ConfigSaveFailed       │ │
//! │  │                 │  │  ModeConflict   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Every remote or NotFound failure during a reorder means: full         │
//! │  rollback in direct mode, preserved draft in draft mode.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use roster_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all reorder failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Retryable network or server failure.
    #[error("Transient remote failure: {0}")]
    Transient(String),

    /// The remote rejected the change because its base was stale.
    #[error("Remote rejected the change: {0}")]
    Conflict(String),

    /// Credentials expired. Handled by the session layer, not here.
    #[error("Authentication required: {0}")]
    Auth(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// Store or ordering failure (NotFound, stale index, bad input).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A patch is already in flight and the busy policy rejects new ones.
    #[error("A reorder is already in flight")]
    Busy,

    /// The collection was torn down or reloaded while a patch was in flight.
    #[error("Collection is no longer live; result discarded")]
    Detached,

    /// The requested operation does not belong to the current edit mode.
    #[error("Operation not allowed in {mode} mode")]
    ModeConflict { mode: String },

    /// Internal state error.
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Failed to (de)serialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Failure Kinds (what the display surface is told)
// =============================================================================

/// The four failure kinds a reorder can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retryable network/server failure.
    Transient,
    /// Remote rejected a stale base.
    Conflict,
    /// Credentials expired.
    Auth,
    /// A referenced record no longer exists.
    NotFound,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Conflict => write!(f, "conflict"),
            FailureKind::Auth => write!(f, "auth"),
            FailureKind::NotFound => write!(f, "not_found"),
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Maps this error onto the reorder failure taxonomy.
    ///
    /// Errors that are not reorder outcomes (config, busy, mode) return `None`.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SyncError::Transient(_) => Some(FailureKind::Transient),
            SyncError::Conflict(_) => Some(FailureKind::Conflict),
            SyncError::Auth(_) => Some(FailureKind::Auth),
            SyncError::Core(CoreError::NotFound(_)) => Some(FailureKind::NotFound),
            _ => None,
        }
    }

    /// Returns true if the user may simply try the same operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient(_) | SyncError::Busy)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
