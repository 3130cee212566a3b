// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-level operations: report, timeout sweep, inspection, listing.

use super::Dispatcher;
use crate::error::DispatchError;
use crate::page::TaskPage;
use crate::round_store::{ProcessingSummary, TaskFilter};
use crate::webhook::WebhookSink;
use rup_core::{Clock, IdGen, RoundId, Task, TaskId, TaskStatus};
use rup_storage::RoundSink;
use serde::Serialize;

/// System-wide processing inspection: the aggregate plus, when a specific
/// round was asked for, that round's own summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub aggregate: ProcessingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_round: Option<ProcessingSummary>,
}

impl<K, W, C, G> Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    /// Record a worker's terminal outcome for a task.
    ///
    /// The owning round is resolved through the task→round index and loaded
    /// on demand, so reporting against an evicted round works transparently.
    pub async fn report(
        &self,
        task_id: &TaskId,
        success: bool,
        message: Option<String>,
    ) -> Result<TaskStatus, DispatchError> {
        let (status, fire) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.now();

            let round_id = state
                .task_index
                .get(task_id)
                .cloned()
                .ok_or_else(|| DispatchError::TaskNotFound(task_id.clone()))?;
            self.ensure_loaded(state, &round_id)?;

            let status = {
                let super::DispatchState { rounds, nodes, .. } = state;
                match rounds.get_mut(&round_id).and_then(|e| e.store.as_mut()) {
                    Some(store) => store.report(task_id, success, message, nodes, now),
                    None => None,
                }
            };
            let Some(status) = status else {
                // Stale index entry: the store no longer knows the task
                state.task_index.remove(task_id);
                return Err(DispatchError::TaskNotFound(task_id.clone()));
            };
            if let Some(entry) = state.rounds.get_mut(&round_id) {
                entry.dirty = true;
            }
            self.settle_entry(state, &round_id, now);

            tracing::debug!(task = %task_id, round = %round_id, success, status = %status, "task reported");
            (status, self.detect_completion(state))
        };
        self.deliver(fire).await;
        Ok(status)
    }

    /// Time out stale processing tasks across one round or the whole system.
    ///
    /// Returns the combined number of tasks touched (re-queued retries plus
    /// final failures).
    pub async fn sweep(
        &self,
        threshold_ms: i64,
        round: Option<&RoundId>,
    ) -> Result<usize, DispatchError> {
        let (touched, fire) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.now();

            let ids: Vec<RoundId> = match round {
                Some(id) => {
                    if !state.rounds.contains_key(id) {
                        return Err(DispatchError::RoundNotFound(id.clone()));
                    }
                    vec![id.clone()]
                }
                None => state.rounds.keys().cloned().collect(),
            };

            let mut touched = 0;
            for id in ids {
                // Rounds with no in-flight work need no load
                let processing = state
                    .rounds
                    .get(&id)
                    .map(|e| e.counts_now().processing)
                    .unwrap_or(0);
                if processing == 0 {
                    continue;
                }
                match self.ensure_loaded(state, &id) {
                    Ok(()) => {}
                    Err(e) if round.is_some() => return Err(e),
                    Err(e) => {
                        tracing::warn!(round = %id, error = %e, "skipping round during sweep");
                        continue;
                    }
                }
                let swept = {
                    let super::DispatchState { rounds, nodes, .. } = state;
                    match rounds.get_mut(&id).and_then(|e| e.store.as_mut()) {
                        Some(store) => store.sweep_timeouts(threshold_ms, nodes, now),
                        None => 0,
                    }
                };
                if swept > 0 {
                    if let Some(entry) = state.rounds.get_mut(&id) {
                        entry.dirty = true;
                    }
                }
                self.settle_entry(state, &id, now);
                touched += swept;
            }
            (touched, self.detect_completion(state))
        };
        self.deliver(fire).await;
        Ok(touched)
    }

    /// Aggregate processing inspection across every round.
    pub fn inspect(
        &self,
        threshold_ms: i64,
        round: Option<&RoundId>,
    ) -> Result<InspectReport, DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        if let Some(id) = round {
            if !state.rounds.contains_key(id) {
                return Err(DispatchError::RoundNotFound(id.clone()));
            }
        }

        let ids: Vec<RoundId> = state.rounds.keys().cloned().collect();
        let mut aggregate = ProcessingSummary::default();
        let mut selected_round = None;

        for id in ids {
            let processing = state
                .rounds
                .get(&id)
                .map(|e| e.counts_now().processing)
                .unwrap_or(0);
            let is_selected = round == Some(&id);
            if processing == 0 && !is_selected {
                continue;
            }
            match self.ensure_loaded(state, &id) {
                Ok(()) => {}
                Err(e) if is_selected => return Err(e),
                Err(_) => continue,
            }
            let summary = match state.rounds.get(&id).and_then(|e| e.store.as_ref()) {
                Some(store) => store.inspect_processing(threshold_ms, now),
                None => ProcessingSummary::default(),
            };
            self.settle_entry(state, &id, now);
            if is_selected {
                selected_round = Some(summary.clone());
            }
            aggregate.merge(summary);
        }

        Ok(InspectReport {
            aggregate,
            selected_round,
        })
    }

    /// List tasks by status filter within one round (explicit id, else the
    /// active round). With no resolvable round the page is empty.
    pub fn list_tasks(
        &self,
        filter: TaskFilter,
        page: usize,
        page_size: usize,
        round: Option<&RoundId>,
    ) -> Result<TaskPage<Task>, DispatchError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        let id = match round {
            Some(id) => {
                if !state.rounds.contains_key(id) {
                    return Err(DispatchError::RoundNotFound(id.clone()));
                }
                id.clone()
            }
            None => match self.ensure_active_round(state, now) {
                Some(id) => id,
                None => {
                    return Ok(TaskPage {
                        items: Vec::new(),
                        total: 0,
                        page: 1,
                        page_size: page_size.max(1),
                    })
                }
            },
        };

        self.ensure_loaded(state, &id)?;
        let result = match state.rounds.get(&id).and_then(|e| e.store.as_ref()) {
            Some(store) => store.list(filter, page, page_size),
            None => return Err(DispatchError::RoundUnavailable(id.clone())),
        };
        self.settle_entry(state, &id, now);
        Ok(result)
    }
}
