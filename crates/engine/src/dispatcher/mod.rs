// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide dispatch façade.
//!
//! One [`Dispatcher`] owns every round, the task→round index, the node
//! statistics store, and the configuration view, all behind a single
//! [`parking_lot::Mutex`]. Handlers may run concurrently; every state
//! mutation or read goes through that lock. The only work done outside it is
//! webhook delivery: payloads are captured under the lock, the guard is
//! dropped, and the post runs lock-free.
//!
//! Rounds are hot (store loaded) or cold (snapshot on the persistence sink
//! plus a metadata shadow here). The active round stays hot; any other round
//! is loaded on demand and flushed back out when the operation settles.

mod config;
mod lease;
mod nodes;
mod rounds;
mod tasks;

pub use lease::LeasedTask;
pub use nodes::ProcessedInfo;
pub use rounds::{ExportedFailure, FoundTask, ImportOptions, ImportResult, RoundSummary};
pub use tasks::InspectReport;

use crate::completion::{completion_text, FleetProgress, ReportingState};
use crate::error::DispatchError;
use crate::node_stats::NodeStatsStore;
use crate::round_store::RoundStore;
use crate::webhook::WebhookSink;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rup_core::{
    Clock, DispatchConfig, IdGen, ProcessedTotals, RoundId, RoundMetadata, RoundStatus, TaskId,
};
use rup_storage::{RoundSink, RoundSnapshot};
use std::collections::HashMap;
use std::sync::Arc;

/// One round as the dispatcher tracks it: metadata shadow plus the hot store
/// when loaded.
pub(crate) struct RoundEntry {
    pub(crate) meta: RoundMetadata,
    pub(crate) totals: ProcessedTotals,
    pub(crate) store: Option<RoundStore>,
    pub(crate) dirty: bool,
    pub(crate) has_persisted: bool,
}

impl RoundEntry {
    fn counts_now(&self) -> rup_core::RoundCounts {
        match &self.store {
            Some(store) => store.counts(),
            None => self.meta.counts,
        }
    }

    fn totals_now(&self) -> ProcessedTotals {
        match &self.store {
            Some(store) => store.processed_totals(),
            None => self.totals,
        }
    }
}

/// Everything the coarse lock guards.
pub(crate) struct DispatchState {
    pub(crate) rounds: IndexMap<RoundId, RoundEntry>,
    pub(crate) active_round: Option<RoundId>,
    pub(crate) task_index: HashMap<TaskId, RoundId>,
    pub(crate) round_seq: u64,
    pub(crate) nodes: NodeStatsStore,
    pub(crate) config: DispatchConfig,
    pub(crate) reporting: ReportingState,
    pub(crate) last_fired_digest: Option<String>,
}

/// A completion webhook captured under the lock, to be posted after release.
pub(crate) struct PendingFire {
    pub(crate) digest: String,
    pub(crate) url: String,
    pub(crate) text: String,
}

/// The coordinator façade.
pub struct Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    pub(crate) state: Arc<Mutex<DispatchState>>,
    pub(crate) sink: Arc<K>,
    pub(crate) webhook: W,
    pub(crate) clock: C,
    pub(crate) ids: G,
}

impl<K, W, C, G> Clone for Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sink: Arc::clone(&self.sink),
            webhook: self.webhook.clone(),
            clock: self.clock.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl<K, W, C, G> Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    /// Create a dispatcher with no rounds.
    pub fn new(sink: K, webhook: W, clock: C, ids: G, config: DispatchConfig) -> Self {
        let now = clock.epoch_ms();
        let mut reporting = ReportingState::default();
        reporting.reconfigure(&config, now);
        Self {
            state: Arc::new(Mutex::new(DispatchState {
                rounds: IndexMap::new(),
                active_round: None,
                task_index: HashMap::new(),
                round_seq: 0,
                nodes: NodeStatsStore::new(),
                config,
                reporting,
                last_fired_digest: None,
            })),
            sink: Arc::new(sink),
            webhook,
            clock,
            ids,
        }
    }

    /// Create a dispatcher and recover every persisted round from the sink.
    ///
    /// Each snapshot is read once to rebuild the metadata shadow and the
    /// task→round index; rounds stay cold afterwards. Unreadable snapshots
    /// are skipped with a warning so one corrupt file cannot block startup.
    pub fn open(
        sink: K,
        webhook: W,
        clock: C,
        ids: G,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        let dispatcher = Self::new(sink, webhook, clock, ids, config);
        let round_ids = dispatcher
            .sink
            .list_ids()
            .map_err(|e| DispatchError::Persistence(e.to_string()))?;

        let mut recovered: Vec<RoundSnapshot> = Vec::new();
        for id in round_ids {
            match dispatcher.sink.read(&id) {
                Ok(Some(snapshot)) => recovered.push(snapshot),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(round = %id, error = %e, "skipping unreadable round snapshot");
                }
            }
        }
        recovered.sort_by_key(|s| s.metadata.id.seq().unwrap_or(u64::MAX));

        let mut state = dispatcher.state.lock();
        for snapshot in recovered {
            let id = snapshot.metadata.id.clone();
            state.round_seq = state.round_seq.max(id.seq().unwrap_or(0));
            for task in &snapshot.store.tasks {
                state.task_index.insert(task.id.clone(), id.clone());
            }

            let mut meta = snapshot.metadata;
            // R2: at most one active round; the first recovered active wins
            if meta.status == RoundStatus::Active {
                if state.active_round.is_none() {
                    state.active_round = Some(id.clone());
                } else {
                    meta.status = RoundStatus::Pending;
                }
            }
            let entry = RoundEntry {
                meta,
                totals: ProcessedTotals {
                    item_num: snapshot.store.total_processed_item_num,
                    running_time: snapshot.store.total_processed_running_time,
                    last_processed_at: snapshot.store.last_processed_at,
                },
                store: None,
                dirty: false,
                has_persisted: true,
            };
            state.rounds.insert(id, entry);
        }
        let recovered_rounds = state.rounds.len();
        drop(state);

        if recovered_rounds > 0 {
            tracing::info!(rounds = recovered_rounds, "recovered rounds from persistence sink");
        }
        Ok(dispatcher)
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Digest of the last fired completion webhook, if any.
    pub fn completion_digest(&self) -> Option<String> {
        self.state.lock().last_fired_digest.clone()
    }

    // ── Hot/cold cache ───────────────────────────────────────────────────────

    /// Load a round's store from the sink if it is cold.
    pub(crate) fn ensure_loaded(
        &self,
        state: &mut DispatchState,
        id: &RoundId,
    ) -> Result<(), DispatchError> {
        let entry = state
            .rounds
            .get(id)
            .ok_or_else(|| DispatchError::RoundNotFound(id.clone()))?;
        if entry.store.is_some() {
            return Ok(());
        }

        let snapshot = self
            .sink
            .read(id)
            .map_err(|e| {
                tracing::warn!(round = %id, error = %e, "failed to load round snapshot");
                DispatchError::RoundUnavailable(id.clone())
            })?
            .ok_or_else(|| DispatchError::RoundUnavailable(id.clone()))?;

        if let Some(entry) = state.rounds.get_mut(id) {
            entry.store = Some(RoundStore::restore(snapshot.store));
        }
        Ok(())
    }

    /// Write the round's snapshot out if it is dirty or never persisted.
    ///
    /// A write failure keeps the dirty flag set and the store hot so no data
    /// is lost; the in-memory mutation stands.
    pub(crate) fn flush_entry(&self, state: &mut DispatchState, id: &RoundId) -> bool {
        let Some(entry) = state.rounds.get_mut(id) else {
            return true;
        };
        if !entry.dirty && entry.has_persisted {
            return true;
        }
        let Some(store) = &entry.store else {
            // Cold and dirty cannot happen: eviction only drops flushed stores
            return true;
        };

        let snapshot = RoundSnapshot {
            metadata: entry.meta.clone(),
            store: store.snapshot(),
        };
        match self.sink.write(&snapshot) {
            Ok(()) => {
                entry.dirty = false;
                entry.has_persisted = true;
                true
            }
            Err(e) => {
                tracing::warn!(round = %id, error = %e, "round snapshot write failed, keeping hot");
                false
            }
        }
    }

    /// Flush and drop the hot store. On flush failure the round stays hot.
    pub(crate) fn evict_entry(&self, state: &mut DispatchState, id: &RoundId) {
        if self.flush_entry(state, id) {
            if let Some(entry) = state.rounds.get_mut(id) {
                entry.store = None;
            }
        }
    }

    // ── Lifecycle reconciliation ─────────────────────────────────────────────

    /// Refresh the metadata shadow from the hot store and reconcile the
    /// round's lifecycle with its counts: drained → `completed`, a completed
    /// round that regained pending work → `pending`.
    pub(crate) fn refresh_entry(&self, state: &mut DispatchState, id: &RoundId, now_ms: u64) {
        let Some(entry) = state.rounds.get_mut(id) else {
            return;
        };
        if let Some(store) = &entry.store {
            entry.meta.counts = store.counts();
            entry.totals = store.processed_totals();
        }

        let drained = entry.meta.counts.is_drained();
        match entry.meta.status {
            RoundStatus::Completed if !drained => {
                entry.meta.status = RoundStatus::Pending;
                entry.meta.completed_at = None;
                entry.dirty = true;
            }
            RoundStatus::Completed => {}
            _ if drained => {
                entry.meta.status = RoundStatus::Completed;
                entry.meta.completed_at = Some(now_ms);
                entry.dirty = true;
                if state.active_round.as_ref() == Some(id) {
                    state.active_round = None;
                }
            }
            _ => {}
        }
    }

    /// Refresh a round after an operation and apply the hot/cold policy:
    /// completed or non-active rounds are flushed and dropped, the active
    /// round stays hot.
    pub(crate) fn settle_entry(&self, state: &mut DispatchState, id: &RoundId, now_ms: u64) {
        self.refresh_entry(state, id, now_ms);
        let Some(entry) = state.rounds.get(id) else {
            return;
        };
        let completed = entry.meta.status == RoundStatus::Completed;
        let is_active = state.active_round.as_ref() == Some(id);
        if completed || !is_active {
            self.evict_entry(state, id);
        }
    }

    // ── Active round resolution ──────────────────────────────────────────────

    /// Resolve the active round: keep the current pointer if it is live and
    /// not completed, else promote the first non-completed round in
    /// insertion order.
    pub(crate) fn ensure_active_round(
        &self,
        state: &mut DispatchState,
        now_ms: u64,
    ) -> Option<RoundId> {
        if let Some(id) = state.active_round.clone() {
            match state.rounds.get(&id) {
                Some(entry) if entry.meta.status != RoundStatus::Completed => return Some(id),
                _ => state.active_round = None,
            }
        }

        let next = state
            .rounds
            .iter()
            .find(|(_, e)| e.meta.status != RoundStatus::Completed)
            .map(|(id, _)| id.clone())?;
        self.mark_active(state, &next, now_ms);
        Some(next)
    }

    /// Point the active pointer at `id`, demoting any previous active round.
    pub(crate) fn mark_active(&self, state: &mut DispatchState, id: &RoundId, now_ms: u64) {
        if let Some(prev) = state.active_round.clone() {
            if prev != *id {
                self.demote_active(state, &prev, now_ms);
            }
        }
        state.active_round = Some(id.clone());
        if let Some(entry) = state.rounds.get_mut(id) {
            if entry.meta.status != RoundStatus::Active {
                entry.meta.status = RoundStatus::Active;
                if entry.meta.activated_at.is_none() {
                    entry.meta.activated_at = Some(now_ms);
                }
                entry.dirty = true;
            }
        }
    }

    /// Demote a previously-active round (drained → completed, else pending)
    /// and evict it if still loaded.
    pub(crate) fn demote_active(&self, state: &mut DispatchState, id: &RoundId, now_ms: u64) {
        if state.active_round.as_ref() == Some(id) {
            state.active_round = None;
        }
        let Some(entry) = state.rounds.get_mut(id) else {
            return;
        };
        if entry.meta.status == RoundStatus::Active {
            entry.meta.counts = entry.counts_now();
            if entry.meta.counts.is_drained() {
                entry.meta.status = RoundStatus::Completed;
                entry.meta.completed_at = Some(now_ms);
            } else {
                entry.meta.status = RoundStatus::Pending;
            }
            entry.dirty = true;
        }
        self.evict_entry(state, id);
    }

    // ── Completion detection ─────────────────────────────────────────────────

    /// Aggregate progress across every round, hot or cold.
    pub(crate) fn progress(state: &DispatchState) -> FleetProgress {
        let mut progress = FleetProgress::default();
        for entry in state.rounds.values() {
            progress.total_rounds += 1;
            if entry.meta.status == RoundStatus::Completed {
                progress.completed_rounds += 1;
            }
            let counts = entry.counts_now();
            progress.counts.total += counts.total;
            progress.counts.pending += counts.pending;
            progress.counts.processing += counts.processing;
            progress.counts.completed += counts.completed;
            progress.counts.failed += counts.failed;
            let totals = entry.totals_now();
            progress.item_num += totals.item_num;
            progress.running_time += totals.running_time;
        }
        progress
    }

    /// Run the completion detector under the lock.
    ///
    /// Returns a captured webhook payload when a fresh completion edge needs
    /// firing; the caller posts it after releasing the lock.
    pub(crate) fn detect_completion(&self, state: &mut DispatchState) -> Option<PendingFire> {
        if state.rounds.is_empty() {
            state.last_fired_digest = None;
            return None;
        }
        let progress = Self::progress(state);
        if !progress.all_completed() {
            state.last_fired_digest = None;
            return None;
        }

        let digest = progress.digest().canonical();
        if state.last_fired_digest.as_deref() == Some(digest.as_str()) {
            return None;
        }
        let url = state.config.feishu_webhook_url.clone()?;
        if state.reporting.in_flight {
            return None;
        }

        state.reporting.in_flight = true;
        Some(PendingFire {
            digest,
            url,
            text: completion_text(&progress),
        })
    }

    /// Post a captured completion webhook and record the digest on success.
    pub(crate) async fn deliver(&self, fire: Option<PendingFire>) {
        let Some(fire) = fire else {
            return;
        };
        let result = self.webhook.post(&fire.url, &fire.text).await;
        let now = self.now();

        let mut state = self.state.lock();
        state.reporting.in_flight = false;
        match result {
            Ok(()) => {
                // Re-check under the lock: record the digest only if the
                // completion state it describes still holds.
                let progress = Self::progress(&state);
                if progress.all_completed() && progress.digest().canonical() == fire.digest {
                    state.last_fired_digest = Some(fire.digest);
                }
                let config = state.config.clone();
                state.reporting.mark_reported(&config, now);
                tracing::info!("completion webhook delivered");
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion webhook failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests/mod.rs"]
mod tests;
