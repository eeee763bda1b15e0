//! # Remote Sync Gateway
//!
//! The two remote operations the engine depends on, plus an in-memory
//! implementation for the demo binary and tests.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SyncGateway Contract                            │
//! │                                                                         │
//! │  fetch_all()                                                           │
//! │    Ok(records ordered by position)  |  Err(Transient | Auth)           │
//! │                                                                         │
//! │  persist_positions(changes)                                            │
//! │    Ok(())                           |  Err(Transient | Conflict | Auth)│
//! │                                                                         │
//! │  persist_positions is all-or-nothing: the remote reports no per-item   │
//! │  status, so any error is a failure of the whole batch.                 │
//! │  Timeouts belong to the implementation; the engine just awaits.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use roster_core::{ordering, ClientType, PositionChange};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Gateway Trait
// =============================================================================

/// Remote side of the client-type collection.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Fetches every record, ordered by position.
    async fn fetch_all(&self) -> SyncResult<Vec<ClientType>>;

    /// Persists a batch of position changes as one unit.
    async fn persist_positions(&self, changes: &[PositionChange]) -> SyncResult<()>;
}

// =============================================================================
// In-Memory Gateway
// =============================================================================

/// Failure to inject into the next gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailure {
    /// Network/server hiccup.
    Transient,
    /// Stale base.
    Conflict,
    /// Expired credentials.
    Auth,
}

impl GatewayFailure {
    fn into_error(self, operation: &str) -> SyncError {
        match self {
            GatewayFailure::Transient => SyncError::Transient(format!("{operation}: service unavailable")),
            GatewayFailure::Conflict => SyncError::Conflict(format!("{operation}: collection changed remotely")),
            GatewayFailure::Auth => SyncError::Auth(format!("{operation}: session expired")),
        }
    }
}

/// Gateway backed by a `Vec` in memory.
///
/// Records every persist call, can fail on demand and can hold persist calls
/// open (`pause` / `resume`) to simulate a slow remote.
pub struct InMemoryGateway {
    records: Mutex<Vec<ClientType>>,
    persist_calls: Mutex<Vec<Vec<PositionChange>>>,
    persist_failures: Mutex<VecDeque<GatewayFailure>>,
    fetch_failures: Mutex<VecDeque<GatewayFailure>>,
    fetch_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl InMemoryGateway {
    /// Creates a gateway whose remote collection is `records`.
    pub fn new(records: Vec<ClientType>) -> Self {
        let mut records = records;
        ordering::sort_by_position(&mut records);
        let (gate, _) = watch::channel(true);

        InMemoryGateway {
            records: Mutex::new(records),
            persist_calls: Mutex::new(Vec::new()),
            persist_failures: Mutex::new(VecDeque::new()),
            fetch_failures: Mutex::new(VecDeque::new()),
            fetch_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate,
        }
    }

    /// Makes the next persist call fail.
    pub fn fail_next_persist(&self, failure: GatewayFailure) {
        lock(&self.persist_failures).push_back(failure);
    }

    /// Makes the next fetch call fail.
    pub fn fail_next_fetch(&self, failure: GatewayFailure) {
        lock(&self.fetch_failures).push_back(failure);
    }

    /// Holds every persist call open until `resume`.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Releases held persist calls.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Every batch received by `persist_positions`, in arrival order.
    pub fn persist_calls(&self) -> Vec<Vec<PositionChange>> {
        lock(&self.persist_calls).clone()
    }

    /// Number of `persist_positions` calls received.
    pub fn persist_count(&self) -> usize {
        lock(&self.persist_calls).len()
    }

    /// Number of `fetch_all` calls received.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Persist calls currently awaiting completion.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of persist calls ever open at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The remote collection as it stands now.
    pub fn remote_records(&self) -> Vec<ClientType> {
        lock(&self.records).clone()
    }

    /// Replaces the remote collection (simulates another session).
    pub fn set_remote_records(&self, records: Vec<ClientType>) {
        let mut records = records;
        ordering::sort_by_position(&mut records);
        *lock(&self.records) = records;
    }
}

#[async_trait]
impl SyncGateway for InMemoryGateway {
    async fn fetch_all(&self) -> SyncResult<Vec<ClientType>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = lock(&self.fetch_failures).pop_front() {
            return Err(failure.into_error("fetch_all"));
        }

        Ok(lock(&self.records).clone())
    }

    async fn persist_positions(&self, changes: &[PositionChange]) -> SyncResult<()> {
        lock(&self.persist_calls).push(changes.to_vec());
        let open = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(open, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let released = gate.wait_for(|open| *open).await.is_ok();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !released {
            return Err(SyncError::Transient("persist_positions: gateway dropped".into()));
        }

        if let Some(failure) = lock(&self.persist_failures).pop_front() {
            debug!(?failure, "Injected persist failure");
            return Err(failure.into_error("persist_positions"));
        }

        let mut records = lock(&self.records);
        for change in changes {
            if let Some(record) = records.iter_mut().find(|r| r.id == change.id) {
                record.position = change.position;
            }
        }
        ordering::sort_by_position(&mut records);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
