// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-level operations: import, activation, listing, find, export, clear.

use super::{Dispatcher, DispatchState, RoundEntry};
use crate::error::DispatchError;
use crate::round_store::{RoundStore, RunStats};
use crate::webhook::WebhookSink;
use rup_core::{
    Clock, IdGen, ProcessedTotals, RoundCounts, RoundId, RoundMetadata, RoundStatus, SourceType,
    Task, TaskId,
};
use rup_storage::RoundSink;
use serde::Serialize;

/// Options for an import request.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub name: Option<String>,
    pub source_type: SourceType,
    pub source_hint: Option<String>,
    /// Explicit activation wish; absent, a fresh non-empty round activates
    /// only when nothing else is active.
    pub activate: Option<bool>,
    /// Append into an existing round instead of creating a new one.
    pub round_id: Option<RoundId>,
}

/// Result of an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub round_id: RoundId,
    pub name: String,
    pub counts: RoundCounts,
    pub added: usize,
    pub skipped: usize,
    pub status: RoundStatus,
}

/// Summary of one round for listings, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub id: RoundId,
    pub name: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,
    pub status: RoundStatus,
    pub counts: RoundCounts,
    pub created_at: u64,
    pub activated_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub processed: ProcessedTotals,
}

/// A found task with its owning round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundTask {
    pub round_id: RoundId,
    pub task: Task,
}

/// One failed task in an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFailure {
    pub round_id: RoundId,
    pub id: TaskId,
    pub path: String,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl<K, W, C, G> Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    /// Import a batch of paths, creating a new round or appending to an
    /// existing one.
    pub async fn import<I, S>(
        &self,
        paths: I,
        opts: ImportOptions,
    ) -> Result<ImportResult, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (result, fire) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.now();

            let round_id = match &opts.round_id {
                Some(id) => {
                    if !state.rounds.contains_key(id) {
                        return Err(DispatchError::RoundNotFound(id.clone()));
                    }
                    self.ensure_loaded(state, id)?;
                    id.clone()
                }
                None => {
                    state.round_seq += 1;
                    let id = RoundId::from_seq(state.round_seq);
                    let meta = RoundMetadata::new(
                        id.clone(),
                        opts.name.clone(),
                        opts.source_type,
                        opts.source_hint.clone(),
                        now,
                    );
                    state.rounds.insert(
                        id.clone(),
                        RoundEntry {
                            meta,
                            totals: ProcessedTotals::default(),
                            store: Some(RoundStore::new(id.clone())),
                            dirty: true,
                            has_persisted: false,
                        },
                    );
                    id
                }
            };

            let outcome = {
                let entry = state
                    .rounds
                    .get_mut(&round_id)
                    .ok_or_else(|| DispatchError::RoundNotFound(round_id.clone()))?;
                let store = entry
                    .store
                    .as_mut()
                    .ok_or_else(|| DispatchError::RoundUnavailable(round_id.clone()))?;
                let outcome = store.enqueue(paths, &self.ids, now);
                entry.dirty = true;
                outcome
            };
            for id in &outcome.added {
                state.task_index.insert(id.clone(), round_id.clone());
            }
            for id in &outcome.replaced {
                state.task_index.remove(id);
            }

            self.refresh_entry(state, &round_id, now);

            let (counts, status) = match state.rounds.get(&round_id) {
                Some(entry) => (entry.meta.counts, entry.meta.status),
                None => (RoundCounts::default(), RoundStatus::Pending),
            };
            let should_activate = opts.activate.unwrap_or_else(|| {
                opts.round_id.is_none() && state.active_round.is_none() && counts.total > 0
            });
            if should_activate && status != RoundStatus::Completed {
                self.mark_active(state, &round_id, now);
            }
            self.settle_entry(state, &round_id, now);

            let result = match state.rounds.get(&round_id) {
                Some(entry) => ImportResult {
                    round_id: round_id.clone(),
                    name: entry.meta.name.clone(),
                    counts: entry.meta.counts,
                    added: outcome.added.len(),
                    skipped: outcome.skipped,
                    status: entry.meta.status,
                },
                None => return Err(DispatchError::RoundNotFound(round_id.clone())),
            };
            tracing::info!(
                round = %round_id,
                added = result.added,
                skipped = result.skipped,
                status = %result.status,
                "imported paths"
            );
            (result, self.detect_completion(state))
        };
        self.deliver(fire).await;
        Ok(result)
    }

    /// Make a round the active one. Fails on unknown or completed rounds.
    pub fn set_active_round(&self, id: &RoundId) -> Result<(), DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        let entry = state
            .rounds
            .get(id)
            .ok_or_else(|| DispatchError::RoundNotFound(id.clone()))?;
        if entry.meta.status == RoundStatus::Completed {
            return Err(DispatchError::RoundCompleted(id.clone()));
        }
        self.ensure_loaded(state, id)?;
        self.mark_active(state, id, now);
        // Activation survives a restart; the round itself stays hot
        self.flush_entry(state, id);
        Ok(())
    }

    /// Summaries of every round, in insertion order.
    pub fn list_rounds(&self) -> Vec<RoundSummary> {
        let state = self.state.lock();
        state
            .rounds
            .values()
            .map(|entry| RoundSummary {
                id: entry.meta.id.clone(),
                name: entry.meta.name.clone(),
                source_type: entry.meta.source_type,
                source_hint: entry.meta.source_hint.clone(),
                status: entry.meta.status,
                counts: entry.counts_now(),
                created_at: entry.meta.created_at,
                activated_at: entry.meta.activated_at,
                completed_at: entry.meta.completed_at,
                processed: entry.totals_now(),
            })
            .collect()
    }

    /// Run statistics for one round (explicit id, else the active round).
    pub fn round_stats(&self, round: Option<&RoundId>) -> Result<RunStats, DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        let id = self.resolve_round(state, round, now)?;
        self.ensure_loaded(state, &id)?;
        let stats = match state.rounds.get(&id).and_then(|e| e.store.as_ref()) {
            Some(store) => store.run_stats(),
            None => return Err(DispatchError::RoundUnavailable(id.clone())),
        };
        self.settle_entry(state, &id, now);
        Ok(stats)
    }

    /// Find a task by id or path, within one round or globally.
    pub fn find_task(
        &self,
        query: &str,
        round: Option<&RoundId>,
    ) -> Result<Option<FoundTask>, DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        if let Some(id) = round {
            if !state.rounds.contains_key(id) {
                return Err(DispatchError::RoundNotFound(id.clone()));
            }
            self.ensure_loaded(state, id)?;
            let found = state
                .rounds
                .get(id)
                .and_then(|e| e.store.as_ref())
                .and_then(|s| s.find(query));
            self.settle_entry(state, id, now);
            return Ok(found.map(|task| FoundTask {
                round_id: id.clone(),
                task,
            }));
        }

        // Direct id routing first
        if let Some(rid) = state.task_index.get(query).cloned() {
            self.ensure_loaded(state, &rid)?;
            let found = state
                .rounds
                .get(&rid)
                .and_then(|e| e.store.as_ref())
                .and_then(|s| s.find(query));
            self.settle_entry(state, &rid, now);
            if let Some(task) = found {
                return Ok(Some(FoundTask {
                    round_id: rid,
                    task,
                }));
            }
        }

        // Global path lookup in insertion order
        let ids: Vec<RoundId> = state.rounds.keys().cloned().collect();
        for rid in ids {
            if self.ensure_loaded(state, &rid).is_err() {
                continue;
            }
            let found = state
                .rounds
                .get(&rid)
                .and_then(|e| e.store.as_ref())
                .and_then(|s| s.find(query));
            self.settle_entry(state, &rid, now);
            if let Some(task) = found {
                return Ok(Some(FoundTask {
                    round_id: rid,
                    task,
                }));
            }
        }
        Ok(None)
    }

    /// Export failed tasks, most recent first, optionally capped.
    pub fn export_failed(
        &self,
        round: Option<&RoundId>,
        limit: Option<usize>,
    ) -> Result<Vec<ExportedFailure>, DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();
        let limit = limit.unwrap_or(usize::MAX);

        let ids: Vec<RoundId> = match round {
            Some(id) => {
                if !state.rounds.contains_key(id) {
                    return Err(DispatchError::RoundNotFound(id.clone()));
                }
                vec![id.clone()]
            }
            None => state.rounds.keys().cloned().collect(),
        };

        let mut out = Vec::new();
        for rid in ids {
            if out.len() >= limit {
                break;
            }
            // Cold rounds without failures need no load
            let shadow_failed = state
                .rounds
                .get(&rid)
                .map(|e| e.counts_now().failed)
                .unwrap_or(0);
            if shadow_failed == 0 {
                continue;
            }
            match self.ensure_loaded(state, &rid) {
                Ok(()) => {}
                Err(e) if round.is_some() => return Err(e),
                Err(_) => continue,
            }
            if let Some(store) = state.rounds.get(&rid).and_then(|e| e.store.as_ref()) {
                for task in store.failed_tasks() {
                    if out.len() >= limit {
                        break;
                    }
                    out.push(ExportedFailure {
                        round_id: rid.clone(),
                        id: task.id.clone(),
                        path: task.path.clone(),
                        failure_count: task.failure_count,
                        message: task.message.clone(),
                        created_at: task.created_at,
                        updated_at: task.updated_at,
                    });
                }
            }
            self.settle_entry(state, &rid, now);
        }
        Ok(out)
    }

    /// Drop one round: its tasks, index entries, and persisted snapshot.
    pub async fn clear_round(&self, id: &RoundId) -> Result<usize, DispatchError> {
        let (cleared, fire) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.now();

            if !state.rounds.contains_key(id) {
                return Err(DispatchError::RoundNotFound(id.clone()));
            }
            let cleared = self.purge_round(state, id);
            state.rounds.shift_remove(id);
            if state.active_round.as_ref() == Some(id) {
                state.active_round = None;
                self.ensure_active_round(state, now);
            }
            tracing::info!(round = %id, cleared, "cleared round");
            (cleared, self.detect_completion(state))
        };
        self.deliver(fire).await;
        Ok(cleared)
    }

    /// Drop every round. Returns the total number of tasks cleared.
    pub async fn clear_all(&self) -> usize {
        let (cleared, fire) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let ids: Vec<RoundId> = state.rounds.keys().cloned().collect();
            let mut cleared = 0;
            for id in &ids {
                cleared += self.purge_round(state, id);
            }
            state.rounds.clear();
            state.task_index.clear();
            state.active_round = None;
            tracing::info!(rounds = ids.len(), cleared, "cleared all rounds");
            (cleared, self.detect_completion(state))
        };
        self.deliver(fire).await;
        cleared
    }

    /// Detach a round's tasks from the node store, drop its index entries,
    /// and delete its persisted snapshot. Returns the task count.
    fn purge_round(&self, state: &mut DispatchState, id: &RoundId) -> usize {
        let task_ids: Vec<TaskId> = state
            .task_index
            .iter()
            .filter(|(_, rid)| *rid == id)
            .map(|(tid, _)| tid.clone())
            .collect();
        for tid in &task_ids {
            state.nodes.detach_task(tid);
            state.task_index.remove(tid);
        }
        if let Err(e) = self.sink.delete(id) {
            tracing::warn!(round = %id, error = %e, "failed to delete round snapshot");
        }
        task_ids.len()
    }

    /// Resolve an explicit round id or fall back to the active round.
    pub(crate) fn resolve_round(
        &self,
        state: &mut DispatchState,
        round: Option<&RoundId>,
        now_ms: u64,
    ) -> Result<RoundId, DispatchError> {
        match round {
            Some(id) => {
                if !state.rounds.contains_key(id) {
                    return Err(DispatchError::RoundNotFound(id.clone()));
                }
                Ok(id.clone())
            }
            None => self
                .ensure_active_round(state, now_ms)
                .ok_or(DispatchError::NoActiveRound),
        }
    }
}
