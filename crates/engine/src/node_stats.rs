// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node telemetry aggregation, independent of rounds.
//!
//! Lifetime totals are additive forever; the recent window keeps at most
//! two hours / 500 samples and overflow is folded into archived counters,
//! so `archived + window` always reconstructs the lifetime totals.

use crate::page::{paginate, TaskPage};
use rup_core::{NodeId, ProcessedRecord, TaskId};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Sliding-window span for recent records (2 hours).
pub(crate) const RECENT_WINDOW_MS: u64 = 2 * 60 * 60 * 1000;
/// Maximum number of records kept in the window.
pub(crate) const MAX_RECENT_RECORDS: usize = 500;

/// One page of node views.
pub type NodesPage = TaskPage<NodeView>;

#[derive(Debug, Default)]
struct NodeRecord {
    total_item_num: u64,
    total_running_time: f64,
    record_count: u64,
    archived_record_count: u64,
    archived_item_num: u64,
    archived_running_time: f64,
    last_updated: u64,
    // Oldest at the front
    recent_records: VecDeque<ProcessedRecord>,
    request_count: u64,
    assigned_task_count: u64,
    // Snapshot of the active set, refreshed on every assignment/detach
    active_task_ids: Vec<TaskId>,
}

/// Externally-visible view of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub node_id: NodeId,
    pub total_item_num: u64,
    pub total_running_time: f64,
    pub record_count: u64,
    pub archived_record_count: u64,
    pub archived_item_num: u64,
    pub archived_running_time: f64,
    /// Items per second, from lifetime totals
    pub average_speed: Option<f64>,
    /// Seconds per 100 items, from lifetime totals
    pub average_time_per_100_items: Option<f64>,
    pub last_updated: u64,
    pub request_count: u64,
    pub assigned_task_count: u64,
    pub active_task_count: usize,
    pub active_task_ids: Vec<TaskId>,
    pub recent_records: Vec<ProcessedRecord>,
}

/// Fleet-wide rollup of every node record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub node_count: usize,
    pub total_item_num: u64,
    pub total_running_time: f64,
    pub record_count: u64,
    pub total_requests: u64,
    pub total_assigned_tasks: u64,
    pub total_active_tasks: usize,
    pub average_speed: Option<f64>,
    pub average_time_per_100_items: Option<f64>,
}

/// Process-wide node telemetry store.
#[derive(Debug, Default)]
pub struct NodeStatsStore {
    nodes: HashMap<NodeId, NodeRecord>,
    // Node-keyed active sets; an emptied set is dropped from the map
    active_sets: HashMap<NodeId, HashSet<TaskId>>,
    task_index: HashMap<TaskId, NodeId>,
}

impl NodeStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node currently holding a task, if any.
    pub fn node_for_task(&self, id: &TaskId) -> Option<&NodeId> {
        self.task_index.get(id)
    }

    /// Count one lease request against a node.
    pub fn record_lease_request(&mut self, node_id: &NodeId, now_ms: u64) {
        let record = self.nodes.entry(node_id.clone()).or_default();
        record.request_count += 1;
        record.last_updated = now_ms;
    }

    /// Register leased task ids as a node's active assignment.
    pub fn record_assignment(&mut self, node_id: &NodeId, ids: &[TaskId], now_ms: u64) {
        if ids.is_empty() {
            return;
        }
        let set = self.active_sets.entry(node_id.clone()).or_default();
        for id in ids {
            set.insert(id.clone());
            self.task_index.insert(id.clone(), node_id.clone());
        }
        let snapshot = sorted_ids(set);

        let record = self.nodes.entry(node_id.clone()).or_default();
        record.assigned_task_count += ids.len() as u64;
        record.active_task_ids = snapshot;
        record.last_updated = now_ms;
    }

    /// Remove a task from whichever node holds it (report, sweep, or clear).
    ///
    /// The node record itself survives; only the active membership goes.
    pub fn detach_task(&mut self, id: &TaskId) {
        let Some(node_id) = self.task_index.remove(id) else {
            return;
        };
        let snapshot = match self.active_sets.get_mut(&node_id) {
            Some(set) => {
                set.remove(id);
                if set.is_empty() {
                    self.active_sets.remove(&node_id);
                    Vec::new()
                } else {
                    sorted_ids(set)
                }
            }
            None => Vec::new(),
        };
        if let Some(record) = self.nodes.get_mut(&node_id) {
            record.active_task_ids = snapshot;
        }
    }

    /// Fold one processed-info sample into a node's totals and window.
    pub fn record_processed(
        &mut self,
        node_id: &NodeId,
        item_num: u64,
        running_time: f64,
        now_ms: u64,
    ) {
        let speed = if running_time > 0.0 {
            item_num as f64 / running_time
        } else {
            0.0
        };
        let record = self.nodes.entry(node_id.clone()).or_default();
        record.recent_records.push_back(ProcessedRecord {
            at: now_ms,
            item_num,
            running_time,
            speed,
        });
        record.total_item_num += item_num;
        record.total_running_time += running_time;
        record.record_count += 1;
        record.last_updated = now_ms;
        archive_and_trim(record, now_ms);
    }

    /// Sorted node listing (most recently updated first), paginated.
    ///
    /// Runs the archive-and-trim pass on every node so returned windows are
    /// current.
    pub fn list(&mut self, page: usize, page_size: usize, now_ms: u64) -> NodesPage {
        for record in self.nodes.values_mut() {
            archive_and_trim(record, now_ms);
        }

        let mut views: Vec<NodeView> = self
            .nodes
            .iter()
            .map(|(id, record)| view_of(id, record))
            .collect();
        views.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.node_id.as_str().cmp(b.node_id.as_str()))
        });
        paginate(views, page, page_size)
    }

    /// Fleet-wide summary across every node.
    pub fn summary(&self) -> NodeSummary {
        let mut summary = NodeSummary {
            node_count: self.nodes.len(),
            ..NodeSummary::default()
        };
        for (id, record) in &self.nodes {
            summary.total_item_num += record.total_item_num;
            summary.total_running_time += record.total_running_time;
            summary.record_count += record.record_count;
            summary.total_requests += record.request_count;
            summary.total_assigned_tasks += record.assigned_task_count;
            summary.total_active_tasks += self
                .active_sets
                .get(id)
                .map(|set| set.len())
                .unwrap_or_default();
        }
        summary.average_speed = (summary.total_running_time > 0.0)
            .then(|| summary.total_item_num as f64 / summary.total_running_time);
        summary.average_time_per_100_items = (summary.total_item_num > 0)
            .then(|| summary.total_running_time / summary.total_item_num as f64 * 100.0);
        summary
    }

    /// Remove one node and purge its active assignments. Returns whether the
    /// node existed.
    pub fn delete(&mut self, node_id: &NodeId) -> bool {
        let existed = self.nodes.remove(node_id).is_some();
        self.active_sets.remove(node_id);
        self.task_index.retain(|_, owner| owner != node_id);
        existed
    }

    /// Drop every node record and assignment.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.active_sets.clear();
        self.task_index.clear();
    }
}

fn sorted_ids(set: &HashSet<TaskId>) -> Vec<TaskId> {
    let mut ids: Vec<TaskId> = set.iter().cloned().collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids
}

fn view_of(id: &NodeId, record: &NodeRecord) -> NodeView {
    NodeView {
        node_id: id.clone(),
        total_item_num: record.total_item_num,
        total_running_time: record.total_running_time,
        record_count: record.record_count,
        archived_record_count: record.archived_record_count,
        archived_item_num: record.archived_item_num,
        archived_running_time: record.archived_running_time,
        average_speed: (record.total_running_time > 0.0)
            .then(|| record.total_item_num as f64 / record.total_running_time),
        average_time_per_100_items: (record.total_item_num > 0)
            .then(|| record.total_running_time / record.total_item_num as f64 * 100.0),
        last_updated: record.last_updated,
        request_count: record.request_count,
        assigned_task_count: record.assigned_task_count,
        active_task_count: record.active_task_ids.len(),
        active_task_ids: record.active_task_ids.clone(),
        recent_records: record.recent_records.iter().copied().collect(),
    }
}

/// Move window entries that fell out of the 2-hour span, plus any beyond the
/// 500 most recent, into the archived counters.
fn archive_and_trim(record: &mut NodeRecord, now_ms: u64) {
    let cutoff = now_ms.saturating_sub(RECENT_WINDOW_MS);
    while let Some(front) = record.recent_records.front() {
        let expired = front.at < cutoff;
        let overflow = record.recent_records.len() > MAX_RECENT_RECORDS;
        if !expired && !overflow {
            break;
        }
        if let Some(old) = record.recent_records.pop_front() {
            record.archived_record_count += 1;
            record.archived_item_num += old.item_num;
            record.archived_running_time += old.running_time;
        }
    }
}

#[cfg(test)]
#[path = "node_stats_tests.rs"]
mod tests;
