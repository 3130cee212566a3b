// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch allocation across rounds.

use super::{Dispatcher, DispatchState};
use crate::error::DispatchError;
use crate::webhook::WebhookSink;
use rup_core::{Clock, IdGen, NodeId, RoundId, RoundStatus, Task, TaskId};
use rup_storage::RoundSink;
use serde::Serialize;

/// A leased work item handed to a worker node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeasedTask {
    pub task_id: TaskId,
    pub round_id: RoundId,
    pub path: String,
}

impl From<&Task> for LeasedTask {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            round_id: task.round_id.clone(),
            path: task.path.clone(),
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
    /// Lease a batch of pending tasks.
    ///
    /// The batch size is clamped to `[1, max_batch_size]` (absent, the
    /// configured default applies). With an explicit round id only that
    /// round is drawn from. Otherwise the active round goes first; only
    /// when it yields nothing *and* has no pending work left does the
    /// allocator fall through the insertion-ordered list, stopping at the
    /// first round that yields tasks or still has leftover pending work.
    /// The first round to yield becomes the active round.
    pub fn lease(
        &self,
        batch_size: Option<u32>,
        round: Option<&RoundId>,
        node: Option<&NodeId>,
    ) -> Result<Vec<LeasedTask>, DispatchError> {
        if let Some(node) = node {
            if node.as_str().trim().is_empty() {
                return Err(DispatchError::InvalidInput("节点标识不能为空".to_string()));
            }
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        let batch = batch_size
            .unwrap_or(state.config.default_batch_size)
            .clamp(1, state.config.max_batch_size) as usize;

        if let Some(node) = node {
            state.nodes.record_lease_request(node, now);
        }

        let leased = match round {
            Some(id) => {
                if !state.rounds.contains_key(id) {
                    return Err(DispatchError::RoundNotFound(id.clone()));
                }
                self.lease_from_round(state, id, batch, node, now)?
            }
            None => self.lease_across_rounds(state, batch, node, now)?,
        };

        if let (Some(node), false) = (node, leased.is_empty()) {
            let ids: Vec<TaskId> = leased.iter().map(|t| t.id.clone()).collect();
            state.nodes.record_assignment(node, &ids, now);
        }

        tracing::debug!(
            requested = batch,
            leased = leased.len(),
            node = node.map(|n| n.as_str()).unwrap_or("-"),
            "leased batch"
        );
        Ok(leased.iter().map(LeasedTask::from).collect())
    }

    /// Lease from exactly one round.
    fn lease_from_round(
        &self,
        state: &mut DispatchState,
        id: &RoundId,
        batch: usize,
        node: Option<&NodeId>,
        now_ms: u64,
    ) -> Result<Vec<Task>, DispatchError> {
        self.ensure_loaded(state, id)?;
        let leased = match state.rounds.get_mut(id).and_then(|e| e.store.as_mut()) {
            Some(store) => store.lease(batch, node, now_ms),
            None => Vec::new(),
        };
        if !leased.is_empty() {
            if let Some(entry) = state.rounds.get_mut(id) {
                entry.dirty = true;
            }
        }
        self.settle_entry(state, id, now_ms);
        Ok(leased)
    }

    /// Active round first, then fall through the insertion list.
    fn lease_across_rounds(
        &self,
        state: &mut DispatchState,
        batch: usize,
        node: Option<&NodeId>,
        now_ms: u64,
    ) -> Result<Vec<Task>, DispatchError> {
        let Some(active_id) = self.ensure_active_round(state, now_ms) else {
            return Ok(Vec::new());
        };

        let mut leased = self.lease_from_round(state, &active_id, batch, node, now_ms)?;
        let active_has_more = state
            .rounds
            .get(&active_id)
            .map(|e| e.counts_now().pending > 0)
            .unwrap_or(false);
        if !leased.is_empty() || active_has_more {
            return Ok(leased);
        }

        // The active round is exhausted: walk the remaining rounds in
        // insertion order for the shortfall.
        let candidates: Vec<RoundId> = state
            .rounds
            .iter()
            .filter(|(id, entry)| {
                **id != active_id && entry.meta.status != RoundStatus::Completed
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in candidates {
            let want = batch - leased.len();
            let got = match self.lease_from_round(state, &id, want, node, now_ms) {
                Ok(got) => got,
                Err(e) => {
                    // One unreadable round must not starve the fleet
                    tracing::warn!(round = %id, error = %e, "skipping round during lease scan");
                    continue;
                }
            };
            let leftover = state
                .rounds
                .get(&id)
                .map(|e| e.counts_now().pending > 0)
                .unwrap_or(false);

            if !got.is_empty() {
                // First yielding round becomes the active round
                self.mark_active(state, &id, now_ms);
                leased.extend(got);
            }
            if !leased.is_empty() || leftover {
                break;
            }
        }
        Ok(leased)
    }
}
