//! # Optimistic Reorder Engine
//!
//! Owns the confirmed [`RecordStore`] and the displayed ordering, and moves
//! between them through one patch at a time.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reorder Engine States                            │
//! │                                                                         │
//! │                reorder(id, from, to)  /  commit_ordering(draft)        │
//! │   ┌─────────┐  ─────────────────────────────────────────►  ┌─────────┐ │
//! │   │ SETTLED │   1. from == to? → no-op, stay Settled       │ PENDING │ │
//! │   │         │   2. splice / take draft order               │         │ │
//! │   │displayed│   3. diff vs confirmed → minimal patch       │displayed│ │
//! │   │   ==    │   4. displayed := optimistic order           │   !=    │ │
//! │   │confirmed│   5. gateway.persist_positions(patch)        │confirmed│ │
//! │   └─────────┘  ◄─────────────────────────────────────────  └─────────┘ │
//! │        ▲          Ok  → confirmed := confirmed + patch           │      │
//! │        │          Err → displayed := confirmed (rollback)        │      │
//! │        └─────────────────────────────────────────────────────────┘      │
//! │                                                                         │
//! │  LANE: at most one persist per collection. Later gestures either wait  │
//! │  (BusyPolicy::Queue) or get SyncError::Busy (BusyPolicy::Reject).      │
//! │                                                                         │
//! │  LIVENESS: a result is only committed if the engine is still attached  │
//! │  and the store generation is the one the patch was computed against.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The confirmed store is never written before the gateway confirms, so the
//! rollback target is always the confirmed collection itself. Readers take a
//! short read lock and copy out a whole vector; no lock is held across an
//! await, so a reader sees either the settled or the optimistic order, never
//! a half-applied patch.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use roster_core::validation::validate_new_record;
use roster_core::{ordering, ClientType, CoreError, FetchState, Patch, RecordStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{BusyPolicy, RosterConfig};
use crate::error::{SyncError, SyncResult};
use crate::events::{ReorderEventEmitter, ReorderFailure, Subscribers};
use crate::gateway::SyncGateway;

// =============================================================================
// Public Types
// =============================================================================

/// Engine phase as seen by display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// No patch outstanding; displayed == confirmed.
    Settled,
    /// A patch is in flight.
    Pending,
}

/// How a reorder or commit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Nothing to change; no network call was made.
    NoOp,
    /// The remote accepted this patch and it is now confirmed.
    Committed(Patch),
}

impl ReorderOutcome {
    /// The committed patch, if any.
    pub fn patch(&self) -> Option<&Patch> {
        match self {
            ReorderOutcome::NoOp => None,
            ReorderOutcome::Committed(patch) => Some(patch),
        }
    }
}

// =============================================================================
// Internal State
// =============================================================================

struct EngineState {
    store: RecordStore,
    displayed: Vec<ClientType>,
    phase: EnginePhase,
    live: bool,
}

/// A patch that has been shown optimistically and handed to the gateway.
struct InFlight<'a> {
    patch: Patch,
    generation: u64,
    guard: PendingGuard<'a>,
}

/// Puts the confirmed order back on screen if the gesture's future is dropped
/// before the remote answers (timeout, `select!`, screen torn down).
struct PendingGuard<'a> {
    engine: &'a ReorderEngine,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let settled = {
            let mut state = self.engine.write_state();
            state.phase = EnginePhase::Settled;
            state.displayed = state.store.snapshot();
            state.displayed.clone()
        };
        warn!(
            collection = %self.engine.collection,
            "Reorder abandoned before the remote answered; showing confirmed order"
        );
        self.engine.subscribers.settled(&settled);
    }
}

// =============================================================================
// Reorder Engine
// =============================================================================

/// Keeps the remote ordering and the displayed ordering consistent.
pub struct ReorderEngine {
    gateway: Arc<dyn SyncGateway>,
    collection: String,
    busy_policy: BusyPolicy,
    state: RwLock<EngineState>,
    lane: Mutex<()>,
    subscribers: Subscribers,
}

impl ReorderEngine {
    /// Creates an engine over an empty, not-yet-loaded store.
    pub fn new(gateway: Arc<dyn SyncGateway>, config: &RosterConfig) -> Self {
        ReorderEngine {
            gateway,
            collection: config.collection_name().to_string(),
            busy_policy: config.busy_policy(),
            state: RwLock::new(EngineState {
                store: RecordStore::new(),
                displayed: Vec::new(),
                phase: EnginePhase::Settled,
                live: true,
            }),
            lane: Mutex::new(()),
            subscribers: Subscribers::default(),
        }
    }

    /// Registers an observer.
    pub fn subscribe(&self, emitter: Arc<dyn ReorderEventEmitter>) {
        self.subscribers.add(emitter);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The ordering display surfaces should render.
    pub fn displayed_order(&self) -> Vec<ClientType> {
        self.read_state().displayed.clone()
    }

    /// The last ordering the remote confirmed.
    pub fn confirmed_order(&self) -> Vec<ClientType> {
        self.read_state().store.snapshot()
    }

    /// True while a patch is in flight.
    pub fn is_reordering(&self) -> bool {
        self.read_state().phase == EnginePhase::Pending
    }

    /// Current phase.
    pub fn phase(&self) -> EnginePhase {
        self.read_state().phase
    }

    /// The store's fetch state.
    pub fn fetch_state(&self) -> FetchState {
        self.read_state().store.fetch_state().clone()
    }

    /// The explicitly flagged default record, if any.
    pub fn default_record(&self) -> Option<ClientType> {
        self.read_state().store.default_record().cloned()
    }

    /// False once the engine has been detached.
    pub fn is_live(&self) -> bool {
        self.read_state().live
    }

    /// Busy policy in effect.
    pub fn busy_policy(&self) -> BusyPolicy {
        self.busy_policy
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Fetches the whole collection and makes it the confirmed baseline.
    ///
    /// Waits for any in-flight patch first. On failure the previous records
    /// stay in place and the fetch state becomes `Error`.
    pub async fn refresh(&self) -> SyncResult<()> {
        let _lane = self.lane.lock().await;
        {
            let mut state = self.write_state();
            if !state.live {
                return Err(SyncError::Detached);
            }
            state.store.begin_loading();
        }

        debug!(collection = %self.collection, "Fetching collection");
        let fetched = self.gateway.fetch_all().await;

        let settled = {
            let mut state = self.write_state();
            if !state.live {
                return Err(SyncError::Detached);
            }
            match fetched {
                Ok(records) => {
                    state.store.load(records);
                    state.displayed = state.store.snapshot();
                    state.displayed.clone()
                }
                Err(e) => {
                    warn!(collection = %self.collection, error = %e, "Fetch failed");
                    state.store.fail_loading(e.to_string());
                    return Err(e);
                }
            }
        };

        info!(collection = %self.collection, count = settled.len(), "Collection loaded");
        self.subscribers.settled(&settled);
        Ok(())
    }

    /// Moves the record at `from_index` to `to_index` (direct mode).
    ///
    /// `id` must be the record at `from_index` in the confirmed collection.
    /// A same-index move returns `NoOp` without touching state or network.
    pub async fn reorder(&self, id: &str, from_index: usize, to_index: usize) -> SyncResult<ReorderOutcome> {
        if from_index == to_index {
            debug!(collection = %self.collection, id = %id, index = from_index, "Ignoring same-index move");
            return Ok(ReorderOutcome::NoOp);
        }

        let _lane = self.acquire_lane().await?;
        let in_flight = self.begin(|store| {
            let records = store.records();
            let proposed = ordering::splice_move(records, from_index, to_index)?;
            let actual = ordering::index_of(records, id)
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
            if actual != from_index {
                return Err(CoreError::StaleIndex {
                    id: id.to_string(),
                    expected: from_index,
                    actual,
                });
            }
            Ok(ordering::diff(records, &proposed))
        })?;

        info!(
            collection = %self.collection,
            id = %id,
            from = from_index,
            to = to_index,
            "Reorder started"
        );
        self.complete(in_flight).await
    }

    /// Persists `proposed` as the new ordering (draft commit).
    ///
    /// The patch is diffed against the confirmed collection as it is now. A
    /// record that has disappeared since the draft was taken fails the commit
    /// with `NotFound` before anything is sent.
    pub async fn commit_ordering(&self, proposed: &[ClientType]) -> SyncResult<ReorderOutcome> {
        let _lane = self.acquire_lane().await?;
        let in_flight = self.begin(|store| Ok(ordering::diff(store.records(), proposed)))?;

        info!(
            collection = %self.collection,
            changed = in_flight.as_ref().map_or(0, |f| f.patch.len()),
            "Committing ordering"
        );
        self.complete(in_flight).await
    }

    // =========================================================================
    // Out-of-band Mutations (toggle / create / delete / external reload)
    // =========================================================================

    /// Replaces the confirmed collection with freshly fetched records.
    ///
    /// Any patch still in flight was computed against the old collection and
    /// will be discarded when it returns.
    pub fn load(&self, records: Vec<ClientType>) -> SyncResult<()> {
        let settled = {
            let mut state = self.write_state();
            if !state.live {
                return Err(SyncError::Detached);
            }
            state.store.load(records);
            state.displayed = state.store.snapshot();
            state.displayed.clone()
        };
        self.subscribers.settled(&settled);
        Ok(())
    }

    /// Flips `is_active` on one record without touching its position.
    pub fn set_active(&self, id: &str, active: bool) -> SyncResult<()> {
        let mut state = self.write_state();
        state.store.set_active(id, active)?;
        if let Some(record) = state.displayed.iter_mut().find(|r| r.id == id) {
            record.is_active = active;
        }
        debug!(collection = %self.collection, id = %id, active, "Active flag changed");
        Ok(())
    }

    /// Appends a newly created record to the end of the collection.
    ///
    /// A patch still in flight was computed against the old collection and
    /// will be discarded when it returns.
    pub fn insert(&self, record: ClientType) -> SyncResult<()> {
        validate_new_record(&record).map_err(CoreError::from)?;

        let mut state = self.write_state();
        let id = record.id.clone();
        state.store.insert(record)?;
        let Some(added) = state.store.get(&id).cloned() else {
            return Err(SyncError::Internal(format!("inserted record {id} missing")));
        };
        state.displayed.push(added);
        debug!(collection = %self.collection, id = %id, "Record inserted");
        Ok(())
    }

    /// Removes a deleted record and closes the gap it leaves.
    ///
    /// A patch still in flight was computed against the old collection and
    /// will be discarded when it returns.
    pub fn remove(&self, id: &str) -> SyncResult<ClientType> {
        let mut state = self.write_state();
        let removed = state.store.remove(id)?;
        if let Some(index) = ordering::index_of(&state.displayed, id) {
            let gone = state.displayed.remove(index);
            ordering::close_gap(&mut state.displayed, gone.position);
        }
        debug!(collection = %self.collection, id = %id, "Record removed");
        Ok(removed)
    }

    /// Tears the engine down. In-flight results are discarded on arrival.
    pub fn detach(&self) {
        self.write_state().live = false;
        info!(collection = %self.collection, "Reorder engine detached");
    }

    // =========================================================================
    // Lane
    // =========================================================================

    /// Takes the lane without waiting, regardless of policy.
    pub(crate) fn try_lane(&self) -> Option<MutexGuard<'_, ()>> {
        self.lane.try_lock().ok()
    }

    async fn acquire_lane(&self) -> SyncResult<MutexGuard<'_, ()>> {
        match self.busy_policy {
            BusyPolicy::Queue => Ok(self.lane.lock().await),
            BusyPolicy::Reject => self.lane.try_lock().map_err(|_| {
                debug!(collection = %self.collection, "Rejecting gesture while a patch is in flight");
                SyncError::Busy
            }),
        }
    }

    // =========================================================================
    // Patch Lifecycle
    // =========================================================================

    /// Computes the patch against the confirmed store and shows the
    /// optimistic order. Returns `None` for an empty patch.
    ///
    /// Must be called with the lane held.
    fn begin(
        &self,
        plan: impl FnOnce(&RecordStore) -> Result<Patch, CoreError>,
    ) -> SyncResult<Option<InFlight<'_>>> {
        let planned = {
            let mut state = self.write_state();
            if !state.live {
                return Err(SyncError::Detached);
            }
            Self::show_optimistic(&mut state, plan)
        };

        match planned {
            Ok(Some((patch, generation))) => {
                let guard = PendingGuard {
                    engine: self,
                    armed: true,
                };
                self.subscribers.pending(&patch);
                Ok(Some(InFlight {
                    patch,
                    generation,
                    guard,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                let err = SyncError::from(e);
                self.notify_failure(&err);
                Err(err)
            }
        }
    }

    fn show_optimistic(
        state: &mut EngineState,
        plan: impl FnOnce(&RecordStore) -> Result<Patch, CoreError>,
    ) -> Result<Option<(Patch, u64)>, CoreError> {
        let patch = plan(&state.store)?;
        if patch.is_empty() {
            return Ok(None);
        }

        let mut optimistic = state.store.clone();
        optimistic.apply_patch(&patch)?;
        state.displayed = optimistic.snapshot();
        state.phase = EnginePhase::Pending;

        Ok(Some((patch, state.store.generation())))
    }

    /// Sends the patch and settles on the outcome.
    async fn complete(&self, in_flight: Option<InFlight<'_>>) -> SyncResult<ReorderOutcome> {
        let Some(InFlight {
            patch,
            generation,
            guard,
        }) = in_flight
        else {
            debug!(collection = %self.collection, "Nothing changed; skipping persist");
            return Ok(ReorderOutcome::NoOp);
        };

        let result = self.gateway.persist_positions(patch.changes()).await;
        guard.disarm();

        let (outcome, settled) = {
            let mut state = self.write_state();
            state.phase = EnginePhase::Settled;

            if !state.live {
                warn!(collection = %self.collection, "Collection torn down; discarding reorder result");
                return Err(SyncError::Detached);
            }
            if state.store.generation() != generation {
                warn!(
                    collection = %self.collection,
                    remote_accepted = result.is_ok(),
                    "Collection changed while the patch was in flight; discarding reorder result"
                );
                state.displayed = state.store.snapshot();
                (Err(SyncError::Detached), state.displayed.clone())
            } else {
                let outcome =
                    result.and_then(|()| state.store.apply_patch(&patch).map_err(SyncError::from));
                // Success or rollback, the confirmed store is what we display.
                state.displayed = state.store.snapshot();
                (outcome, state.displayed.clone())
            }
        };

        match outcome {
            Ok(()) => {
                info!(collection = %self.collection, changed = patch.len(), "Reorder confirmed");
                self.subscribers.settled(&settled);
                Ok(ReorderOutcome::Committed(patch))
            }
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "Reorder failed; rolled back");
                self.notify_failure(&e);
                self.subscribers.settled(&settled);
                Err(e)
            }
        }
    }

    fn notify_failure(&self, error: &SyncError) {
        if let Some(failure) = ReorderFailure::from_error(error) {
            self.subscribers.failure(&failure);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::FailureKind;
    use crate::events::RecordingEmitter;
    use crate::gateway::{GatewayFailure, InMemoryGateway};

    fn seed(n: u32) -> Vec<ClientType> {
        (0..n)
            .map(|i| {
                ClientType::new(format!("Type {i}"))
                    .with_id(format!("id-{i}"))
                    .with_position(i)
            })
            .collect()
    }

    fn ids(records: &[ClientType]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    fn id_list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn setup_with(
        records: Vec<ClientType>,
        policy: BusyPolicy,
    ) -> (Arc<ReorderEngine>, Arc<InMemoryGateway>, Arc<RecordingEmitter>) {
        let gateway = Arc::new(InMemoryGateway::new(records));
        let config = RosterConfig::new().with_busy_policy(policy);
        let engine = Arc::new(ReorderEngine::new(gateway.clone(), &config));
        let events = Arc::new(RecordingEmitter::new());
        engine.subscribe(events.clone());
        engine.refresh().await.unwrap();
        (engine, gateway, events)
    }

    async fn setup(
        n: u32,
        policy: BusyPolicy,
    ) -> (Arc<ReorderEngine>, Arc<InMemoryGateway>, Arc<RecordingEmitter>) {
        setup_with(seed(n), policy).await
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..1_000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never became true");
    }

    // -------------------------------------------------------------------------
    // Direct reorders
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_move_last_to_first_diffs_every_record() {
        let (engine, gateway, _) = setup(5, BusyPolicy::Queue).await;

        let outcome = engine.reorder("id-4", 4, 0).await.unwrap();
        let patch = outcome.patch().unwrap();

        assert_eq!(patch.len(), 5);
        assert_eq!(patch.position_of("id-4"), Some(0));
        for i in 0..4u32 {
            assert_eq!(patch.position_of(&format!("id-{i}")), Some(i + 1));
        }
        assert_eq!(gateway.persist_calls(), vec![patch.changes().to_vec()]);

        let expected = id_list(&["id-4", "id-0", "id-1", "id-2", "id-3"]);
        assert_eq!(ids(&engine.displayed_order()), expected);
        assert_eq!(ids(&engine.confirmed_order()), expected);
        assert_eq!(ids(&gateway.remote_records()), expected);
        assert!(ordering::is_contiguous(&engine.displayed_order()));
    }

    #[tokio::test]
    async fn test_adjacent_move_sends_only_the_two_records() {
        let (engine, gateway, _) = setup(5, BusyPolicy::Queue).await;

        engine.reorder("id-1", 1, 2).await.unwrap();

        let calls = gateway.persist_calls();
        assert_eq!(calls.len(), 1);
        let mut sent: Vec<_> = calls[0].iter().map(|c| c.id.as_str()).collect();
        sent.sort();
        assert_eq!(sent, vec!["id-1", "id-2"]);
    }

    #[tokio::test]
    async fn test_one_based_remote_slots_keep_the_diff_minimal() {
        let fetched = seed(5)
            .into_iter()
            .map(|r| {
                let position = r.position + 1;
                r.with_position(position)
            })
            .collect();
        let (engine, gateway, _) = setup_with(fetched, BusyPolicy::Queue).await;

        engine.reorder("id-1", 1, 2).await.unwrap();

        let calls = gateway.persist_calls();
        assert_eq!(calls.len(), 1);
        let mut sent: Vec<_> = calls[0].iter().map(|c| (c.id.as_str(), c.position)).collect();
        sent.sort();
        assert_eq!(sent, vec![("id-1", 3), ("id-2", 2)]);

        let expected = id_list(&["id-0", "id-2", "id-1", "id-3", "id-4"]);
        assert_eq!(ids(&engine.confirmed_order()), expected);
        assert_eq!(ids(&gateway.remote_records()), expected);
        let positions: Vec<u32> = engine.confirmed_order().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_same_index_move_is_a_true_noop() {
        let (engine, gateway, events) = setup(5, BusyPolicy::Queue).await;
        let before = engine.displayed_order();

        let outcome = engine.reorder("id-2", 2, 2).await.unwrap();

        assert_eq!(outcome, ReorderOutcome::NoOp);
        assert_eq!(gateway.persist_count(), 0);
        assert_eq!(engine.displayed_order(), before);
        assert_eq!(engine.confirmed_order(), before);
        assert!(events.pending().is_empty());
    }

    #[tokio::test]
    async fn test_every_move_is_contiguous_and_minimal() {
        for from in 0..5usize {
            for to in (0..5usize).filter(|to| *to != from) {
                let (engine, gateway, _) = setup(5, BusyPolicy::Queue).await;
                let id = format!("id-{from}");

                let outcome = engine.reorder(&id, from, to).await.unwrap();

                let displayed = engine.displayed_order();
                assert!(ordering::is_contiguous(&displayed), "{from} -> {to}");
                assert_eq!(displayed[to].id, id);
                assert_eq!(outcome.patch().map(Patch::len), Some(from.abs_diff(to) + 1));
                assert_eq!(gateway.persist_count(), 1);
            }
        }
    }

    #[tokio::test]
    async fn test_reorder_keeps_flags() {
        let mut records = seed(4);
        records[3] = records[3].clone().as_default();
        records[1].is_active = false;
        records[2].usage_count = 12;
        let (engine, _, _) = setup_with(records, BusyPolicy::Queue).await;

        engine.reorder("id-3", 3, 0).await.unwrap();

        assert_eq!(engine.default_record().map(|r| r.id), Some("id-3".to_string()));
        let displayed = engine.displayed_order();
        assert_eq!(displayed.iter().filter(|r| r.is_default).count(), 1);
        assert!(!displayed.iter().find(|r| r.id == "id-1").unwrap().is_active);
        assert_eq!(displayed.iter().find(|r| r.id == "id-2").unwrap().usage_count, 12);
    }

    // -------------------------------------------------------------------------
    // Rejected gestures
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_gestures_never_reach_the_gateway() {
        let (engine, gateway, events) = setup(5, BusyPolicy::Queue).await;
        let before = engine.displayed_order();

        assert!(matches!(
            engine.reorder("id-3", 1, 2).await,
            Err(SyncError::Core(CoreError::StaleIndex { actual: 3, .. }))
        ));
        assert!(matches!(
            engine.reorder("id-0", 0, 9).await,
            Err(SyncError::Core(CoreError::IndexOutOfRange { index: 9, len: 5 }))
        ));
        assert!(matches!(
            engine.reorder("missing", 0, 1).await,
            Err(SyncError::Core(CoreError::NotFound(_)))
        ));

        assert_eq!(gateway.persist_count(), 0);
        assert_eq!(engine.displayed_order(), before);
        assert_eq!(engine.phase(), EnginePhase::Settled);

        let failures = events.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::NotFound);
    }

    // -------------------------------------------------------------------------
    // Rollback
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_conflict_rolls_back_and_notifies_once() {
        let (engine, gateway, events) = setup(5, BusyPolicy::Queue).await;
        let before = engine.displayed_order();
        gateway.fail_next_persist(GatewayFailure::Conflict);

        let err = engine.reorder("id-0", 0, 3).await.unwrap_err();

        assert!(matches!(err, SyncError::Conflict(_)));
        assert_eq!(engine.displayed_order(), before);
        assert_eq!(engine.confirmed_order(), before);
        assert!(!engine.is_reordering());

        let failures = events.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Conflict);
        assert_eq!(events.pending().len(), 1);
        assert_eq!(events.settled().last(), Some(&before));
    }

    #[tokio::test]
    async fn test_every_remote_failure_kind_rolls_back() {
        for (failure, kind) in [
            (GatewayFailure::Transient, FailureKind::Transient),
            (GatewayFailure::Conflict, FailureKind::Conflict),
            (GatewayFailure::Auth, FailureKind::Auth),
        ] {
            let (engine, gateway, events) = setup(4, BusyPolicy::Queue).await;
            let before = engine.displayed_order();
            gateway.fail_next_persist(failure);

            let err = engine.reorder("id-3", 3, 1).await.unwrap_err();

            assert_eq!(err.failure_kind(), Some(kind));
            assert_eq!(engine.displayed_order(), before);
            assert_eq!(events.failures().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_optimistic_order_is_visible_while_pending() {
        let (engine, gateway, _) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-2", 2, 0).await })
        };
        wait_until(|| engine.is_reordering()).await;

        assert_eq!(ids(&engine.displayed_order()), id_list(&["id-2", "id-0", "id-1"]));
        assert_eq!(ids(&engine.confirmed_order()), id_list(&["id-0", "id-1", "id-2"]));

        gateway.resume();
        task.await.unwrap().unwrap();

        assert!(!engine.is_reordering());
        assert_eq!(engine.displayed_order(), engine.confirmed_order());
    }

    #[tokio::test]
    async fn test_delete_of_patched_record_during_flight_discards_result() {
        let (engine, gateway, events) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-2", 2, 0).await })
        };
        wait_until(|| engine.is_reordering()).await;
        engine.remove("id-1").unwrap();
        assert_eq!(ids(&engine.displayed_order()), id_list(&["id-2", "id-0"]));
        gateway.resume();

        assert!(matches!(task.await.unwrap(), Err(SyncError::Detached)));
        assert_eq!(ids(&engine.displayed_order()), id_list(&["id-0", "id-2"]));
        assert_eq!(engine.displayed_order(), engine.confirmed_order());
        assert!(ordering::is_contiguous(&engine.confirmed_order()));
        assert!(events.failures().is_empty());
        assert!(!engine.is_reordering());
    }

    #[tokio::test]
    async fn test_delete_outside_patch_during_flight_keeps_store_contiguous() {
        let (engine, gateway, events) = setup(5, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-3", 3, 4).await })
        };
        wait_until(|| engine.is_reordering()).await;
        engine.remove("id-0").unwrap();
        assert!(ordering::is_contiguous(&engine.displayed_order()));
        gateway.resume();

        // The patch named slots 3 and 4, which shifted when id-0 left.
        assert!(matches!(task.await.unwrap(), Err(SyncError::Detached)));
        let confirmed = engine.confirmed_order();
        assert_eq!(ids(&confirmed), id_list(&["id-1", "id-2", "id-3", "id-4"]));
        assert!(ordering::is_contiguous(&confirmed));
        assert_eq!(engine.displayed_order(), confirmed);
        assert!(events.failures().is_empty());
        assert!(!engine.is_reordering());

        engine.reorder("id-4", 3, 2).await.unwrap();
        assert!(ordering::is_contiguous(&engine.confirmed_order()));
    }

    #[tokio::test]
    async fn test_insert_during_flight_discards_result() {
        let (engine, gateway, _) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-0", 0, 2).await })
        };
        wait_until(|| engine.is_reordering()).await;
        engine
            .insert(ClientType::new("Type 3").with_id("id-3"))
            .unwrap();
        gateway.resume();

        assert!(matches!(task.await.unwrap(), Err(SyncError::Detached)));
        let confirmed = engine.confirmed_order();
        assert_eq!(ids(&confirmed), id_list(&["id-0", "id-1", "id-2", "id-3"]));
        assert!(ordering::is_contiguous(&confirmed));
        assert_eq!(engine.displayed_order(), confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_reorder_restores_confirmed_order() {
        let (engine, gateway, events) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), engine.reorder("id-0", 0, 2)).await;

        assert!(abandoned.is_err());
        assert!(!engine.is_reordering());
        assert_eq!(engine.phase(), EnginePhase::Settled);
        assert_eq!(engine.displayed_order(), engine.confirmed_order());
        assert_eq!(ids(&engine.displayed_order()), id_list(&["id-0", "id-1", "id-2"]));
        assert_eq!(
            ids(events.settled().last().unwrap()),
            id_list(&["id-0", "id-1", "id-2"])
        );

        // The lane was released with the dropped future.
        gateway.resume();
        engine.reorder("id-0", 0, 1).await.unwrap();
        assert_eq!(ids(&engine.confirmed_order()), id_list(&["id-1", "id-0", "id-2"]));
    }

    // -------------------------------------------------------------------------
    // Serialization policies
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_queue_policy_waits_and_rediffs() {
        let (engine, gateway, _) = setup(5, BusyPolicy::Queue).await;
        gateway.pause();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-4", 4, 0).await })
        };
        wait_until(|| gateway.in_flight() == 1).await;

        // Issued against the optimistic order; runs after the first settles.
        let second = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-4", 0, 1).await })
        };
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(gateway.persist_count(), 1);

        gateway.resume();
        first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(gateway.persist_count(), 2);
        assert_eq!(gateway.max_in_flight(), 1);

        let patch = second.patch().unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.position_of("id-0"), Some(0));
        assert_eq!(patch.position_of("id-4"), Some(1));
        assert_eq!(
            ids(&engine.displayed_order()),
            id_list(&["id-0", "id-4", "id-1", "id-2", "id-3"])
        );
    }

    #[tokio::test]
    async fn test_queued_gesture_diffs_against_rolled_back_baseline() {
        let (engine, gateway, _) = setup(5, BusyPolicy::Queue).await;
        gateway.fail_next_persist(GatewayFailure::Transient);
        gateway.pause();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-4", 4, 0).await })
        };
        wait_until(|| gateway.in_flight() == 1).await;
        let second = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-0", 0, 1).await })
        };
        gateway.resume();

        assert!(first.await.unwrap().is_err());
        let second = second.await.unwrap().unwrap();

        let patch = second.patch().unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.position_of("id-1"), Some(0));
        assert_eq!(patch.position_of("id-0"), Some(1));
    }

    #[tokio::test]
    async fn test_reject_policy_returns_busy() {
        let (engine, gateway, events) = setup(5, BusyPolicy::Reject).await;
        gateway.pause();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-4", 4, 0).await })
        };
        wait_until(|| gateway.in_flight() == 1).await;

        let err = engine.reorder("id-0", 0, 1).await.unwrap_err();
        assert!(matches!(err, SyncError::Busy));
        assert!(err.is_retryable());
        assert_eq!(gateway.persist_count(), 1);
        assert!(events.failures().is_empty());

        gateway.resume();
        first.await.unwrap().unwrap();
        assert!(engine.reorder("id-0", 1, 0).await.is_ok());
    }

    // -------------------------------------------------------------------------
    // Liveness
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_detached_engine_discards_in_flight_result() {
        let (engine, gateway, events) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-1", 1, 0).await })
        };
        wait_until(|| engine.is_reordering()).await;
        engine.detach();
        gateway.resume();

        assert!(matches!(task.await.unwrap(), Err(SyncError::Detached)));
        assert_eq!(ids(&engine.confirmed_order()), id_list(&["id-0", "id-1", "id-2"]));
        assert!(events.failures().is_empty());
        assert!(!engine.is_live());
        assert!(matches!(engine.reorder("id-0", 0, 1).await, Err(SyncError::Detached)));
    }

    #[tokio::test]
    async fn test_reload_during_flight_discards_stale_result() {
        let (engine, gateway, _) = setup(3, BusyPolicy::Queue).await;
        gateway.pause();

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reorder("id-1", 1, 0).await })
        };
        wait_until(|| engine.is_reordering()).await;
        engine.load(seed(2)).unwrap();
        gateway.resume();

        assert!(matches!(task.await.unwrap(), Err(SyncError::Detached)));
        assert_eq!(ids(&engine.displayed_order()), id_list(&["id-0", "id-1"]));
        assert_eq!(engine.displayed_order(), engine.confirmed_order());
        assert!(!engine.is_reordering());
    }

    // -------------------------------------------------------------------------
    // Fetch and out-of-band mutations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_drives_fetch_state() {
        let gateway = Arc::new(InMemoryGateway::new(seed(3)));
        let engine = ReorderEngine::new(gateway.clone(), &RosterConfig::default());
        assert_eq!(engine.fetch_state(), FetchState::NotLoaded);

        engine.refresh().await.unwrap();
        assert_eq!(engine.fetch_state(), FetchState::Loaded);
        assert_eq!(engine.displayed_order().len(), 3);

        gateway.fail_next_fetch(GatewayFailure::Transient);
        assert!(engine.refresh().await.is_err());
        assert!(matches!(engine.fetch_state(), FetchState::Error(_)));
        assert_eq!(engine.displayed_order().len(), 3);

        gateway.set_remote_records(seed(4));
        engine.refresh().await.unwrap();
        assert!(engine.fetch_state().is_loaded());
        assert_eq!(engine.displayed_order().len(), 4);
        assert_eq!(gateway.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_out_of_band_mutations_keep_order() {
        let (engine, gateway, _) = setup(3, BusyPolicy::Queue).await;

        engine.set_active("id-1", false).unwrap();
        let record = engine.displayed_order().into_iter().find(|r| r.id == "id-1").unwrap();
        assert!(!record.is_active);
        assert_eq!(record.position, 1);

        let created = ClientType::new("Partner");
        let created_id = created.id.clone();
        engine.insert(created).unwrap();
        let displayed = engine.displayed_order();
        assert_eq!(displayed.last().map(|r| r.id.clone()), Some(created_id));
        assert!(ordering::is_contiguous(&displayed));
        assert!(matches!(
            engine.insert(ClientType::new("  ")),
            Err(SyncError::Core(CoreError::Validation(_)))
        ));

        engine.remove("id-0").unwrap();
        assert!(ordering::is_contiguous(&engine.displayed_order()));
        assert_eq!(gateway.persist_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_of_unchanged_ordering_is_noop() {
        let (engine, gateway, _) = setup(3, BusyPolicy::Queue).await;
        let current = engine.confirmed_order();

        let outcome = engine.commit_ordering(&current).await.unwrap();

        assert_eq!(outcome, ReorderOutcome::NoOp);
        assert_eq!(gateway.persist_count(), 0);
    }
}
