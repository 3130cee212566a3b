// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node telemetry passthrough.
//!
//! The node statistics store is global: `round_id` arguments never partition
//! it, they only pick which round's processed aggregates the sample also
//! feeds.

use super::Dispatcher;
use crate::error::DispatchError;
use crate::node_stats::{NodeSummary, NodesPage};
use crate::webhook::WebhookSink;
use rup_core::{Clock, IdGen, NodeId, RoundId};
use rup_storage::RoundSink;
use serde::Deserialize;

/// One processed-info sample from a worker node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInfo {
    pub node_id: NodeId,
    pub item_num: u64,
    pub running_time: f64,
}

impl<K, W, C, G> Dispatcher<K, W, C, G>
where
    K: RoundSink,
    W: WebhookSink,
    C: Clock,
    G: IdGen,
{
    /// Record a worker's processed-info sample.
    ///
    /// The node store always updates. The round aggregates update for the
    /// explicit round when one is given, else for the currently-active round;
    /// with neither, only the node store changes.
    pub fn record_processed(
        &self,
        info: &ProcessedInfo,
        round: Option<&RoundId>,
    ) -> Result<(), DispatchError> {
        if info.node_id.as_str().trim().is_empty() {
            return Err(DispatchError::InvalidInput("节点标识不能为空".to_string()));
        }
        if !info.running_time.is_finite() || info.running_time < 0.0 {
            return Err(DispatchError::InvalidInput("运行时长不能为负".to_string()));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.now();

        // Resolve and load the target round before mutating anything, so a
        // NOT_FOUND never leaves a half-applied sample behind.
        let target = match round {
            Some(id) => {
                if !state.rounds.contains_key(id) {
                    return Err(DispatchError::RoundNotFound(id.clone()));
                }
                self.ensure_loaded(state, id)?;
                Some(id.clone())
            }
            None => match state.active_round.clone() {
                Some(id) => match self.ensure_loaded(state, &id) {
                    Ok(()) => Some(id),
                    Err(e) => {
                        tracing::warn!(round = %id, error = %e, "active round unavailable for processed info");
                        None
                    }
                },
                None => None,
            },
        };

        state
            .nodes
            .record_processed(&info.node_id, info.item_num, info.running_time, now);

        if let Some(id) = target {
            if let Some(store) = state.rounds.get_mut(&id).and_then(|e| e.store.as_mut()) {
                store.add_processed(info.item_num, info.running_time, now);
            }
            if let Some(entry) = state.rounds.get_mut(&id) {
                entry.dirty = true;
            }
            self.settle_entry(state, &id, now);
        }
        Ok(())
    }

    /// Paginated node listing plus the fleet summary.
    pub fn list_nodes(
        &self,
        page: usize,
        page_size: usize,
        _round: Option<&RoundId>,
    ) -> (NodesPage, NodeSummary) {
        let mut state = self.state.lock();
        let now = self.now();
        let nodes = state.nodes.list(page, page_size, now);
        let summary = state.nodes.summary();
        (nodes, summary)
    }

    /// Delete one node record. Returns whether the node existed.
    pub fn delete_node(&self, node_id: &NodeId, _round: Option<&RoundId>) -> bool {
        let deleted = self.state.lock().nodes.delete(node_id);
        if deleted {
            tracing::info!(node = %node_id, "deleted node record");
        }
        deleted
    }
}
