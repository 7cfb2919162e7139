//! Media sync engine - subscription lifecycle, debounce, and degradation.
//!
//! One engine instance owns the record map and per-zone rendered state; it
//! is constructed with injected store/adapter/cache dependencies and holds
//! no global state. Lifecycle:
//!
//! ```text
//! Unavailable ──ready poll──► Subscribing ──ok──► Live (change loop, debounced passes)
//!      │                          │
//!      │ timeout                  │ error
//!      ▼                          ▼
//!   Degraded ◄────────────────────┘
//!      │ one-shot fetch ──ok──► pass + snapshot cache write
//!      │ fetch failed ──► snapshot cache ──ok──► pass (stale, warn-logged)
//!      │                       └─ none ──► idle, zones keep current content
//! ```
//!
//! There is no automatic promotion out of Degraded; only an explicit
//! `force_resync()` re-runs the startup sequence. Store and render errors
//! are caught at the call boundary and logged; none of them propagate to
//! the caller or abort the engine.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::cache::{Snapshot, SnapshotCache};
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::reconcile::{classify_and_sort, reconcile_zone, ZoneOps, ZoneState};
use crate::record::RawRecord;
use crate::render::RenderAdapter;
use crate::store::{ChangeBatch, RecordChange, RecordStore};
use crate::zone::Zone;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Initial state; store readiness not yet observed
    Unavailable,
    /// Establishing the live subscription
    Subscribing,
    /// Subscribed; change notifications drive debounced passes
    Live,
    /// Operating from one-shot fetch or cached snapshot
    Degraded,
}

/// Operator-facing engine status
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub state: EngineState,
    pub cached_record_count: usize,
    pub live_subscription_active: bool,
    pub per_zone_rendered_counts: HashMap<Zone, usize>,
}

struct EngineInner {
    state: EngineState,
    live: bool,
    /// Latest known records by id, updated from change batches or fetches
    records: HashMap<String, RawRecord>,
    zones: HashMap<Zone, ZoneState>,
    containers_resolved: bool,
}

/// State and dependencies shared between the engine handle and its
/// spawned live loop task
struct EngineShared<S, R, C> {
    config: EngineConfig,
    store: Arc<S>,
    adapter: Arc<R>,
    cache: Arc<C>,
    inner: RwLock<EngineInner>,
}

impl<S, R, C> EngineShared<S, R, C>
where
    S: RecordStore,
    R: RenderAdapter,
    C: SnapshotCache,
{
    async fn set_state(&self, state: EngineState) {
        let mut inner = self.inner.write().await;
        if inner.state != state {
            info!(from = ?inner.state, to = ?state, "engine state changed");
            inner.state = state;
        }
    }

    async fn set_live(&self, live: bool) {
        self.inner.write().await.live = live;
    }

    /// Resolve zone containers. Done once per session; an unresolved zone
    /// stays inactive and is not retried.
    async fn ensure_containers(&self) {
        let mut inner = self.inner.write().await;
        if inner.containers_resolved {
            return;
        }
        for zone in Zone::ALL {
            let container = self.adapter.resolve_container(zone);
            if container.is_none() {
                warn!(zone = %zone, "no container found, zone stays inactive for this session");
            }
            inner.zones.insert(zone, ZoneState::new(container));
        }
        inner.containers_resolved = true;
    }

    async fn apply_batch(&self, batch: ChangeBatch) {
        let mut inner = self.inner.write().await;
        for change in batch.changes {
            match change {
                RecordChange::Added(record) | RecordChange::Modified(record) => {
                    inner.records.insert(record.id.clone(), record);
                }
                RecordChange::Removed(id) => {
                    inner.records.remove(&id);
                }
            }
        }
    }

    async fn replace_records(&self, records: Vec<RawRecord>) {
        let mut inner = self.inner.write().await;
        inner.records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
    }

    /// Re-classify everything and reconcile every zone against the
    /// current record map.
    async fn run_pass(&self) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let mut by_zone = classify_and_sort(&inner.records);

        let mut total = ZoneOps::default();
        for zone in Zone::ALL {
            let Some(state) = inner.zones.get_mut(&zone) else {
                continue;
            };
            let desired = by_zone.remove(&zone).unwrap_or_default();
            let ops = reconcile_zone(self.adapter.as_ref(), zone, state, &desired);
            if ops.total() > 0 {
                debug!(
                    zone = %zone,
                    inserted = ops.inserted,
                    removed = ops.removed,
                    patched = ops.patched,
                    moved = ops.moved,
                    "zone reconciled"
                );
            }
            total.merge(ops);
        }

        if total.total() > 0 {
            info!(
                inserted = total.inserted,
                removed = total.removed,
                patched = total.patched,
                moved = total.moved,
                "reconciliation pass complete"
            );
        } else {
            debug!("reconciliation pass produced no changes");
        }
    }

    /// One-shot fetch, falling back to the snapshot cache, falling back
    /// to leaving zones untouched.
    async fn run_degraded(&self) {
        self.set_state(EngineState::Degraded).await;

        match self.store.fetch_all().await {
            Ok(records) => {
                info!(count = records.len(), "one-shot fetch succeeded");
                self.replace_records(records.clone()).await;
                self.run_pass().await;
                if let Err(e) = self.cache.store(&Snapshot::new(records)).await {
                    warn!(error = %e, "snapshot cache write failed");
                }
            }
            Err(e) => {
                warn!(error = %e, "one-shot fetch failed, trying snapshot cache");
                match self.cache.load().await {
                    Ok(Some(snapshot)) => {
                        warn!(
                            count = snapshot.records.len(),
                            saved_at = %snapshot.saved_at,
                            "serving stale records from snapshot cache"
                        );
                        self.replace_records(snapshot.records).await;
                        self.run_pass().await;
                    }
                    Ok(None) => {
                        info!("no cached snapshot, zones keep their current content");
                    }
                    Err(e) => {
                        warn!(error = %e, "snapshot cache read failed, zones keep their current content");
                    }
                }
            }
        }
    }

    /// A lagged broadcast receiver has missed changes; the record map can
    /// only be trusted again after a full fetch.
    async fn resync_after_lag(&self) {
        match self.store.fetch_all().await {
            Ok(records) => {
                info!(count = records.len(), "resynced record map after lag");
                self.replace_records(records).await;
            }
            Err(e) => {
                warn!(error = %e, "resync fetch failed, continuing with known records");
            }
        }
    }
}

/// The media reconciliation engine.
///
/// Constructed with injected dependencies; see the module docs for the
/// lifecycle. All methods are safe to call at any time from the host.
pub struct MediaSyncEngine<S, R, C> {
    shared: Arc<EngineShared<S, R, C>>,
    live_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, R, C> MediaSyncEngine<S, R, C>
where
    S: RecordStore + 'static,
    R: RenderAdapter + 'static,
    C: SnapshotCache + 'static,
{
    pub fn new(config: EngineConfig, store: Arc<S>, adapter: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                config,
                store,
                adapter,
                cache,
                inner: RwLock::new(EngineInner {
                    state: EngineState::Unavailable,
                    live: false,
                    records: HashMap::new(),
                    zones: HashMap::new(),
                    containers_resolved: false,
                }),
            }),
            live_task: Mutex::new(None),
        }
    }

    /// Run the startup sequence: resolve containers, await store
    /// readiness, then subscribe or degrade. Never fails outward.
    pub async fn start(&self) {
        self.shared.ensure_containers().await;

        if let Err(e) = self.await_ready().await {
            warn!(error = %e, "record store unavailable, degrading");
            self.shared.run_degraded().await;
            return;
        }

        self.shared.set_state(EngineState::Subscribing).await;
        match self.shared.store.subscribe().await {
            Ok(rx) => {
                self.shared.set_live(true).await;
                self.shared.set_state(EngineState::Live).await;
                let shared = Arc::clone(&self.shared);
                let handle = tokio::spawn(async move { live_loop(shared, rx).await });
                *self.live_task.lock().await = Some(handle);
            }
            Err(e) => {
                warn!(error = %e, "subscription failed, degrading");
                self.shared.run_degraded().await;
            }
        }
    }

    /// Re-run the full startup sequence. Idempotent and always safe to
    /// call; this is the only path from `Degraded` back to `Live`.
    pub async fn force_resync(&self) {
        info!("forced resync requested");
        self.abort_live().await;
        self.shared.set_state(EngineState::Unavailable).await;
        self.start().await;
    }

    /// Release the subscription and clear all engine-owned state. An
    /// in-flight pass completes; nothing is aborted mid-operation.
    pub async fn teardown(&self) {
        self.abort_live().await;
        let mut inner = self.shared.inner.write().await;
        inner.records.clear();
        for state in inner.zones.values_mut() {
            state.rendered.clear();
        }
        inner.state = EngineState::Unavailable;
        info!("engine torn down");
    }

    /// Report that a rendered record's asset failed to load. The card is
    /// hidden in place, kept in the rendered set, and not retried.
    pub async fn asset_failed(&self, zone: Zone, record_id: &str) {
        let mut inner = self.shared.inner.write().await;
        let Some(state) = inner.zones.get_mut(&zone) else {
            return;
        };
        match state.rendered.iter_mut().find(|c| c.id == record_id) {
            Some(card) if !card.hidden => {
                warn!(zone = %zone, record_id, "asset failed to load, hiding card");
                self.shared.adapter.hide_card(card.handle);
                card.hidden = true;
            }
            Some(_) => {}
            None => {
                debug!(zone = %zone, record_id, "asset failure for unrendered record, ignoring");
            }
        }
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        let inner = self.shared.inner.read().await;
        Diagnostics {
            state: inner.state,
            cached_record_count: inner.records.len(),
            live_subscription_active: inner.live,
            per_zone_rendered_counts: inner
                .zones
                .iter()
                .map(|(zone, state)| (*zone, state.rendered.len()))
                .collect(),
        }
    }

    /// Bounded readiness wait with a single failure path
    async fn await_ready(&self) -> Result<(), StoreError> {
        let deadline = Instant::now() + self.shared.config.readiness_timeout;
        let mut poll = tokio::time::interval(self.shared.config.readiness_poll_interval);
        loop {
            poll.tick().await;
            if self.shared.store.ready().await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StoreError::Unavailable(self.shared.config.readiness_timeout));
            }
            debug!("record store not ready, polling again");
        }
    }

    async fn abort_live(&self) {
        if let Some(handle) = self.live_task.lock().await.take() {
            handle.abort();
        }
        self.shared.set_live(false).await;
    }
}

/// Consume change batches, coalescing bursts into one pass per debounce
/// window. Each pass reflects only the latest record snapshot;
/// intermediate states are never rendered.
async fn live_loop<S, R, C>(
    shared: Arc<EngineShared<S, R, C>>,
    mut rx: broadcast::Receiver<ChangeBatch>,
) where
    S: RecordStore,
    R: RenderAdapter,
    C: SnapshotCache,
{
    use tokio::sync::broadcast::error::RecvError;

    loop {
        let mut lagged = false;
        let mut closed = false;

        match rx.recv().await {
            Ok(batch) => shared.apply_batch(batch).await,
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "subscription lagged, will resync");
                lagged = true;
            }
            Err(RecvError::Closed) => {
                warn!("live subscription closed, degrading");
                shared.set_live(false).await;
                shared.run_degraded().await;
                return;
            }
        }

        // Debounce window: keep applying changes until it elapses, then
        // render once.
        let deadline = Instant::now() + shared.config.debounce;
        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Ok(batch)) => shared.apply_batch(batch).await,
                Ok(Err(RecvError::Lagged(missed))) => {
                    warn!(missed, "subscription lagged, will resync");
                    lagged = true;
                }
                Ok(Err(RecvError::Closed)) => {
                    closed = true;
                    break;
                }
                Err(_elapsed) => break,
            }
        }

        if lagged {
            shared.resync_after_lag().await;
        }
        shared.run_pass().await;

        if closed {
            warn!("live subscription closed, degrading");
            shared.set_live(false).await;
            shared.run_degraded().await;
            return;
        }
    }
}
