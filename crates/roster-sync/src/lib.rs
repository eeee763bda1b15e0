//! # roster-sync: Reorder Engine for the Client-Type Screen
//!
//! This crate keeps the remote ordering of client types, the locally
//! confirmed ordering and whatever the user is looking at consistent while
//! the user drags rows or steps through edit-order mode.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reorder Architecture                             │
//! │                                                                         │
//! │   table view / card view                                               │
//! │        │ drop(id, from, to)          │ move(id, up|down), commit       │
//! │        ▼                             ▼                                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  Coordinator (Direct | Draft)                    │  │
//! │  │  Draft lives here; never touches the store until commit          │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │  ┌────────────────────────────▼─────────────────────────────────────┐  │
//! │  │                       ReorderEngine                              │  │
//! │  │  confirmed RecordStore  │  displayed order  │  one-patch lane    │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ persist_positions(patch)                │
//! │  ┌────────────────────────────▼─────────────────────────────────────┐  │
//! │  │                SyncGateway (remote collection)                   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  EVENTS (to display surfaces via ReorderEventEmitter):                 │
//! │  • pending  - optimistic order shown, patch in flight                  │
//! │  • settled  - displayed order equals confirmed order again             │
//! │  • failure  - one notification per failed reorder or commit            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Collection name and busy policy (TOML + env)
//! - [`coordinator`] - Direct/draft mode arbitration and the list view model
//! - [`engine`] - Optimistic reorder engine
//! - [`error`] - Sync error types and failure categories
//! - [`events`] - Observer trait for display surfaces
//! - [`gateway`] - Remote gateway trait and the in-memory implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roster_sync::{Coordinator, InMemoryGateway, ReorderEngine, RosterConfig};
//!
//! let config = RosterConfig::load_or_default(None);
//! let engine = Arc::new(ReorderEngine::new(Arc::new(InMemoryGateway::new(records)), &config));
//! engine.refresh().await?;
//!
//! let coordinator = Coordinator::new(engine);
//! coordinator.reorder("retail", 4, 0).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BusyPolicy, RosterConfig};
pub use coordinator::{Coordinator, EditMode, ListView};
pub use engine::{EnginePhase, ReorderEngine, ReorderOutcome};
pub use error::{FailureKind, SyncError, SyncResult};
pub use events::{NoOpEmitter, RecordingEmitter, ReorderEventEmitter, ReorderFailure};
pub use gateway::{GatewayFailure, InMemoryGateway, SyncGateway};

pub use roster_core::{ClientType, Direction, FetchState, Patch, PositionChange};
