// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-round task store: queues, state machine, and run statistics.
//!
//! One `RoundStore` owns every task of one round. The pending FIFO uses lazy
//! deletion: the queue holds ids, membership is authoritative in the
//! pending set, and stale queue entries are skipped on lease. That keeps
//! report/sweep/clear O(1) instead of O(queue).

use crate::node_stats::NodeStatsStore;
use crate::page::{paginate, TaskPage};
use rup_core::{IdGen, NodeId, ProcessedTotals, RoundCounts, RoundId, Task, TaskId, TaskStatus};
use rup_storage::StoreSnapshot;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Message attached to a task re-queued by the timeout sweep.
pub(crate) const RETRY_MESSAGE: &str = "处理超时，已自动重新排队重试";
/// Message attached to a task failed by the timeout sweep.
pub(crate) const MAX_RETRY_MESSAGE: &str = "处理超时，已达最大重试次数";

/// Status filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    Pending,
    Processing,
    Completed,
    Failed,
    All,
}

/// Result of enqueueing a batch of paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOutcome {
    /// Ids of freshly created tasks, in enqueue order
    pub added: Vec<TaskId>,
    /// Paths skipped as empty or already present
    pub skipped: usize,
    /// Ids of failed tasks that were replaced (the old id vanishes)
    pub replaced: Vec<TaskId>,
}

/// A currently-processing task with its elapsed duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTaskView {
    pub round_id: RoundId,
    pub task_id: TaskId,
    pub path: String,
    pub status: TaskStatus,
    pub started_at: u64,
    pub duration_ms: u64,
    pub node_id: Option<NodeId>,
}

/// Number of entries kept in the inspection top lists.
const INSPECT_TOP_N: usize = 5;

/// Summary of in-flight processing for one round (or aggregated).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub total_processing: usize,
    pub timed_out_count: usize,
    pub near_timeout_count: usize,
    pub longest_duration_ms: Option<u64>,
    pub top_timed_out: Vec<ProcessingTaskView>,
    pub top_longest: Vec<ProcessingTaskView>,
}

impl ProcessingSummary {
    /// Merge another summary into this one (for cross-round aggregation).
    pub fn merge(&mut self, other: ProcessingSummary) {
        self.total_processing += other.total_processing;
        self.timed_out_count += other.timed_out_count;
        self.near_timeout_count += other.near_timeout_count;
        self.longest_duration_ms = match (self.longest_duration_ms, other.longest_duration_ms) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.top_timed_out.extend(other.top_timed_out);
        self.top_timed_out
            .sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
        self.top_timed_out.truncate(INSPECT_TOP_N);
        self.top_longest.extend(other.top_longest);
        self.top_longest
            .sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
        self.top_longest.truncate(INSPECT_TOP_N);
    }
}

/// Run statistics for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub counts: RoundCounts,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    pub duration_ms: Option<u64>,
    /// Completed tasks per second over the round's wall-clock span
    pub average_task_speed: Option<f64>,
    /// Items per second from the processed totals
    pub average_item_speed: Option<f64>,
    /// Seconds per item from the processed totals
    pub average_time_per_item: Option<f64>,
    pub average_time_per_100_items: Option<f64>,
    pub all_completed: bool,
    pub totals: ProcessedTotals,
}

/// All tasks of one round plus the queues that drive dispatch.
#[derive(Debug)]
pub struct RoundStore {
    round_id: RoundId,
    tasks: HashMap<TaskId, Task>,
    path_index: HashMap<String, TaskId>,
    pending_queue: VecDeque<TaskId>,
    pending_set: HashSet<TaskId>,
    processing_set: HashSet<TaskId>,
    processing_started_at: HashMap<TaskId, u64>,
    // Most recent first
    completed_list: VecDeque<TaskId>,
    completed_set: HashSet<TaskId>,
    failed_list: VecDeque<TaskId>,
    failed_set: HashSet<TaskId>,
    totals: ProcessedTotals,
}

impl RoundStore {
    pub fn new(round_id: RoundId) -> Self {
        Self {
            round_id,
            tasks: HashMap::new(),
            path_index: HashMap::new(),
            pending_queue: VecDeque::new(),
            pending_set: HashSet::new(),
            processing_set: HashSet::new(),
            processing_started_at: HashMap::new(),
            completed_list: VecDeque::new(),
            completed_set: HashSet::new(),
            failed_list: VecDeque::new(),
            failed_set: HashSet::new(),
            totals: ProcessedTotals::default(),
        }
    }

    pub fn round_id(&self) -> &RoundId {
        &self.round_id
    }

    /// Whether any live pending work remains.
    pub fn has_pending(&self) -> bool {
        !self.pending_set.is_empty()
    }

    /// Per-status counts. The sets are authoritative, so the four buckets
    /// always partition the task table.
    pub fn counts(&self) -> RoundCounts {
        RoundCounts {
            total: self.tasks.len(),
            pending: self.pending_set.len(),
            processing: self.processing_set.len(),
            completed: self.completed_set.len(),
            failed: self.failed_set.len(),
        }
    }

    pub fn processed_totals(&self) -> ProcessedTotals {
        self.totals
    }

    /// Fold a worker telemetry sample into the round's processed totals.
    pub fn add_processed(&mut self, item_num: u64, running_time: f64, now_ms: u64) {
        self.totals.add(item_num, running_time, now_ms);
    }

    // ── Enqueue ──────────────────────────────────────────────────────────────

    /// Add a batch of paths as pending tasks.
    ///
    /// Blank paths and paths already present on a non-failed task are
    /// skipped. A path whose previous task failed replaces that task
    /// entirely: the old id vanishes and a fresh pending task takes the
    /// path over.
    pub fn enqueue<I, S, G>(&mut self, paths: I, ids: &G, now_ms: u64) -> EnqueueOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        G: IdGen,
    {
        let mut outcome = EnqueueOutcome::default();

        for path in paths {
            let path = path.as_ref().trim();
            if path.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            if let Some(existing_id) = self.path_index.get(path).cloned() {
                let failed = self
                    .tasks
                    .get(&existing_id)
                    .map(|t| t.status == TaskStatus::Failed)
                    .unwrap_or(false);
                if !failed {
                    outcome.skipped += 1;
                    continue;
                }
                // Replace the failed predecessor wholesale
                self.tasks.remove(&existing_id);
                self.failed_set.remove(&existing_id);
                self.failed_list.retain(|id| *id != existing_id);
                self.path_index.remove(path);
                outcome.replaced.push(existing_id);
            }

            let id = TaskId::new(ids.next());
            let task = Task::new(id.clone(), self.round_id.clone(), path, now_ms);
            self.path_index.insert(path.to_string(), id.clone());
            self.tasks.insert(id.clone(), task);
            if self.pending_set.insert(id.clone()) {
                self.pending_queue.push_back(id.clone());
            }
            outcome.added.push(id);
        }

        outcome
    }

    // ── Lease ────────────────────────────────────────────────────────────────

    /// Move up to `batch` pending tasks to `processing` in FIFO order.
    ///
    /// Stale queue entries (ids no longer pending) are discarded on the way.
    /// Returns copies of the leased tasks. The caller is responsible for
    /// registering the assignment (and the lease request) on the node store.
    pub fn lease(&mut self, batch: usize, node_id: Option<&NodeId>, now_ms: u64) -> Vec<Task> {
        let mut leased = Vec::new();

        while leased.len() < batch {
            let Some(id) = self.pending_queue.pop_front() else {
                break;
            };
            // Lazy deletion: only ids still in the pending set are live
            if !self.pending_set.contains(&id) {
                continue;
            }
            let Some(task) = self.tasks.get_mut(&id) else {
                self.pending_set.remove(&id);
                continue;
            };

            self.pending_set.remove(&id);
            task.begin_processing(node_id.cloned(), now_ms);
            self.processing_set.insert(id.clone());
            self.processing_started_at.insert(id.clone(), now_ms);
            leased.push(task.clone());
        }

        leased
    }

    // ── Report ───────────────────────────────────────────────────────────────

    /// Record a worker's terminal outcome for a task.
    ///
    /// Returns the task's resulting status, or `None` when the id is
    /// unknown. A failure reported against an already-completed task is
    /// ignored (completion wins).
    pub fn report(
        &mut self,
        id: &TaskId,
        success: bool,
        message: Option<String>,
        nodes: &mut NodeStatsStore,
        now_ms: u64,
    ) -> Option<TaskStatus> {
        if !self.tasks.contains_key(id) {
            return None;
        }

        nodes.detach_task(id);
        self.processing_set.remove(id);
        self.processing_started_at.remove(id);
        self.pending_set.remove(id);

        let task = self.tasks.get_mut(id)?;
        if task.status == TaskStatus::Completed && !success {
            return Some(TaskStatus::Completed);
        }

        task.end_processing(now_ms);
        task.message = message;

        if success {
            task.status = TaskStatus::Completed;
            task.failure_count = 0;
            if self.failed_set.remove(id) {
                self.failed_list.retain(|x| x != id);
            }
            if self.completed_set.insert(id.clone()) {
                self.completed_list.push_front(id.clone());
            }
            Some(TaskStatus::Completed)
        } else {
            task.status = TaskStatus::Failed;
            task.failure_count += 1;
            self.move_to_failed_head(id);
            Some(TaskStatus::Failed)
        }
    }

    /// Put `id` at the head of the failed list, removing any earlier entry.
    fn move_to_failed_head(&mut self, id: &TaskId) {
        if !self.failed_set.insert(id.clone()) {
            self.failed_list.retain(|x| x != id);
        }
        self.failed_list.push_front(id.clone());
    }

    // ── Timeout sweep ────────────────────────────────────────────────────────

    /// Time out stale processing tasks.
    ///
    /// A threshold ≤ 0 sweeps every processing task. A first-time offender
    /// goes back to pending with one free retry; a task that already burned
    /// its retry fails for good. Returns the number of tasks touched.
    pub fn sweep_timeouts(
        &mut self,
        threshold_ms: i64,
        nodes: &mut NodeStatsStore,
        now_ms: u64,
    ) -> usize {
        let expired: Vec<TaskId> = self
            .processing_set
            .iter()
            .filter(|id| {
                if threshold_ms <= 0 {
                    return true;
                }
                let started = self.processing_started_at.get(*id).copied().unwrap_or(0);
                now_ms.saturating_sub(started) > threshold_ms as u64
            })
            .cloned()
            .collect();

        let mut touched = 0;
        for id in expired {
            nodes.detach_task(&id);
            self.processing_set.remove(&id);
            self.processing_started_at.remove(&id);

            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };
            task.end_processing(now_ms);

            if task.failure_count == 0 {
                // One free retry
                task.failure_count = 1;
                task.status = TaskStatus::Pending;
                task.message = Some(RETRY_MESSAGE.to_string());
                if self.pending_set.insert(id.clone()) {
                    self.pending_queue.push_back(id.clone());
                }
            } else {
                task.failure_count += 1;
                task.status = TaskStatus::Failed;
                task.message = Some(MAX_RETRY_MESSAGE.to_string());
                self.move_to_failed_head(&id);
            }
            touched += 1;
        }

        if touched > 0 {
            tracing::info!(
                round = %self.round_id,
                touched,
                threshold_ms,
                "timeout sweep moved stale processing tasks"
            );
        }
        touched
    }

    // ── Processing inspection ────────────────────────────────────────────────

    /// Summarize in-flight processing against a timeout threshold.
    pub fn inspect_processing(&self, threshold_ms: i64, now_ms: u64) -> ProcessingSummary {
        let mut views: Vec<ProcessingTaskView> = self
            .processing_set
            .iter()
            .filter_map(|id| {
                let task = self.tasks.get(id)?;
                let started = self
                    .processing_started_at
                    .get(id)
                    .copied()
                    .or(task.processing_started_at)
                    .unwrap_or(now_ms);
                Some(ProcessingTaskView {
                    round_id: self.round_id.clone(),
                    task_id: id.clone(),
                    path: task.path.clone(),
                    status: task.status,
                    started_at: started,
                    duration_ms: now_ms.saturating_sub(started),
                    node_id: task.node_id.clone(),
                })
            })
            .collect();
        views.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));

        let timed_out: Vec<ProcessingTaskView> = views
            .iter()
            .filter(|v| threshold_ms > 0 && v.duration_ms > threshold_ms as u64)
            .cloned()
            .collect();
        let near_timeout_count = if threshold_ms > 0 {
            let lo = (threshold_ms as u64).saturating_mul(4) / 5;
            views
                .iter()
                .filter(|v| v.duration_ms >= lo && v.duration_ms <= threshold_ms as u64)
                .count()
        } else {
            0
        };

        ProcessingSummary {
            total_processing: views.len(),
            timed_out_count: timed_out.len(),
            near_timeout_count,
            longest_duration_ms: views.first().map(|v| v.duration_ms),
            top_timed_out: timed_out.into_iter().take(INSPECT_TOP_N).collect(),
            top_longest: views.into_iter().take(INSPECT_TOP_N).collect(),
        }
    }

    // ── Listing and find ─────────────────────────────────────────────────────

    /// List tasks matching a status filter, paginated.
    pub fn list(&self, filter: TaskFilter, page: usize, page_size: usize) -> TaskPage<Task> {
        let items: Vec<Task> = match filter {
            TaskFilter::Pending => {
                // Walk the FIFO in order, skipping stale entries
                let mut seen = HashSet::new();
                self.pending_queue
                    .iter()
                    .filter(|id| self.pending_set.contains(*id) && seen.insert(*id))
                    .filter_map(|id| self.tasks.get(id).cloned())
                    .collect()
            }
            TaskFilter::Processing => {
                let mut items: Vec<Task> = self
                    .processing_set
                    .iter()
                    .filter_map(|id| self.tasks.get(id).cloned())
                    .collect();
                items.sort_by(|a, b| {
                    b.processing_started_at
                        .cmp(&a.processing_started_at)
                        .then_with(|| a.id.as_str().cmp(b.id.as_str()))
                });
                items
            }
            TaskFilter::Completed => self.list_in_order(&self.completed_list, &self.completed_set),
            TaskFilter::Failed => self.list_in_order(&self.failed_list, &self.failed_set),
            TaskFilter::All => {
                let mut items: Vec<Task> = self.tasks.values().cloned().collect();
                items.sort_by(|a, b| {
                    b.updated_at
                        .cmp(&a.updated_at)
                        .then_with(|| a.id.as_str().cmp(b.id.as_str()))
                });
                items
            }
        };
        paginate(items, page, page_size)
    }

    fn list_in_order(&self, list: &VecDeque<TaskId>, set: &HashSet<TaskId>) -> Vec<Task> {
        list.iter()
            .filter(|id| set.contains(*id))
            .filter_map(|id| self.tasks.get(id).cloned())
            .collect()
    }

    /// Find a task by exact id, falling back to a path lookup.
    pub fn find(&self, query: &str) -> Option<Task> {
        if let Some(task) = self.tasks.get(query) {
            return Some(task.clone());
        }
        let id = self.path_index.get(query.trim())?;
        self.tasks.get(id).cloned()
    }

    /// Iterate every failed task in list order (most recent first).
    pub fn failed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.failed_list
            .iter()
            .filter(|id| self.failed_set.contains(*id))
            .filter_map(|id| self.tasks.get(id))
    }

    // ── Run statistics ───────────────────────────────────────────────────────

    /// Compute the round's run statistics from the task table and the
    /// processed totals.
    pub fn run_stats(&self) -> RunStats {
        let counts = self.counts();
        let started_at = self.tasks.values().map(|t| t.created_at).min();
        let finished_at = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.updated_at)
            .max();

        let duration_ms = match (started_at, finished_at) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        };
        let average_task_speed = duration_ms
            .filter(|d| *d > 0)
            .map(|d| counts.completed as f64 / (d as f64 / 1000.0));

        let average_item_speed = (self.totals.running_time > 0.0)
            .then(|| self.totals.item_num as f64 / self.totals.running_time);
        let average_time_per_item =
            (self.totals.item_num > 0).then(|| self.totals.running_time / self.totals.item_num as f64);

        RunStats {
            counts,
            started_at,
            finished_at,
            duration_ms,
            average_task_speed,
            average_item_speed,
            average_time_per_item,
            average_time_per_100_items: average_time_per_item.map(|t| t * 100.0),
            all_completed: counts.all_completed(),
            totals: self.totals,
        }
    }

    // ── Clearing ─────────────────────────────────────────────────────────────

    /// Drop every task, detaching them from the node store. Returns the
    /// number of tasks removed.
    pub fn clear(&mut self, nodes: &mut NodeStatsStore) -> usize {
        let cleared = self.tasks.len();
        for id in self.tasks.keys() {
            nodes.detach_task(id);
        }
        self.tasks.clear();
        self.path_index.clear();
        self.pending_queue.clear();
        self.pending_set.clear();
        self.processing_set.clear();
        self.processing_started_at.clear();
        self.completed_list.clear();
        self.completed_set.clear();
        self.failed_list.clear();
        self.failed_set.clear();
        self.totals = ProcessedTotals::default();
        cleared
    }

    // ── Snapshot / restore ───────────────────────────────────────────────────

    /// Serialize the store for persistence. Queue and list entries are
    /// filtered to live ids so stale lazy-deletion residue never hits disk.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let mut seen = HashSet::new();
        let pending_queue: Vec<TaskId> = self
            .pending_queue
            .iter()
            .filter(|id| self.pending_set.contains(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();

        let mut processing_started_at: Vec<(TaskId, u64)> = self
            .processing_started_at
            .iter()
            .filter(|(id, _)| self.processing_set.contains(*id))
            .map(|(id, ms)| (id.clone(), *ms))
            .collect();
        processing_started_at.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        StoreSnapshot {
            round_id: self.round_id.clone(),
            tasks,
            pending_queue,
            processing_started_at,
            completed_list: self
                .completed_list
                .iter()
                .filter(|id| self.completed_set.contains(*id))
                .cloned()
                .collect(),
            failed_list: self
                .failed_list
                .iter()
                .filter(|id| self.failed_set.contains(*id))
                .cloned()
                .collect(),
            total_processed_item_num: self.totals.item_num,
            total_processed_running_time: self.totals.running_time,
            last_processed_at: self.totals.last_processed_at,
        }
    }

    /// Rebuild a store from a persisted snapshot.
    ///
    /// The path index and the per-status sets are derived from the task
    /// table; queue and list entries are trimmed to surviving live ids, and
    /// any pending task missing from the persisted queue is appended so it
    /// stays leasable.
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new(snapshot.round_id);

        for task in snapshot.tasks {
            store.path_index.insert(task.path.clone(), task.id.clone());
            match task.status {
                TaskStatus::Pending => {
                    store.pending_set.insert(task.id.clone());
                }
                TaskStatus::Processing => {
                    store.processing_set.insert(task.id.clone());
                }
                TaskStatus::Completed => {
                    store.completed_set.insert(task.id.clone());
                }
                TaskStatus::Failed => {
                    store.failed_set.insert(task.id.clone());
                }
            }
            store.tasks.insert(task.id.clone(), task);
        }

        let mut queued = HashSet::new();
        for id in snapshot.pending_queue {
            if store.pending_set.contains(&id) && queued.insert(id.clone()) {
                store.pending_queue.push_back(id);
            }
        }
        // Re-queue pending tasks the persisted queue lost track of
        let mut stragglers: Vec<&Task> = store
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && !queued.contains(&t.id))
            .collect();
        stragglers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        let straggler_ids: Vec<TaskId> = stragglers.into_iter().map(|t| t.id.clone()).collect();
        for id in straggler_ids {
            store.pending_queue.push_back(id);
        }

        for (id, ms) in snapshot.processing_started_at {
            if store.processing_set.contains(&id) {
                store.processing_started_at.insert(id, ms);
            }
        }
        // Fall back to the task's own field when the map entry is missing
        let missing: Vec<(TaskId, u64)> = store
            .processing_set
            .iter()
            .filter(|id| !store.processing_started_at.contains_key(*id))
            .filter_map(|id| {
                let task = store.tasks.get(id)?;
                Some((id.clone(), task.processing_started_at.unwrap_or(task.updated_at)))
            })
            .collect();
        store.processing_started_at.extend(missing);

        for id in snapshot.completed_list {
            if store.completed_set.contains(&id) && !store.completed_list.contains(&id) {
                store.completed_list.push_back(id);
            }
        }
        for id in snapshot.failed_list {
            if store.failed_set.contains(&id) && !store.failed_list.contains(&id) {
                store.failed_list.push_back(id);
            }
        }

        store.totals = ProcessedTotals {
            item_num: snapshot.total_processed_item_num,
            running_time: snapshot.total_processed_running_time,
            last_processed_at: snapshot.last_processed_at,
        };
        store
    }
}

#[cfg(test)]
#[path = "round_store_tests/mod.rs"]
mod tests;
