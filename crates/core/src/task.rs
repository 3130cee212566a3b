// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task entity and status state machine.

use crate::node::NodeId;
use crate::round::RoundId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a task.
    ///
    /// Freshly generated on import and stable for the task's lifetime; the
    /// id never moves between rounds.
    pub struct TaskId;
}

/// Status of a task through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status is a terminal outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single file-path work item.
///
/// Serialized form is the snapshot wire format, so field names are camelCase.
/// Invariant: `processing_started_at` and `node_id` are both set exactly when
/// status is `processing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub round_id: RoundId,
    pub path: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl Task {
    /// Create a fresh pending task.
    pub fn new(id: TaskId, round_id: RoundId, path: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id,
            round_id,
            path: path.into(),
            status: TaskStatus::Pending,
            failure_count: 0,
            message: None,
            created_at: now_ms,
            updated_at: now_ms,
            processing_started_at: None,
            node_id: None,
        }
    }

    /// Transition to `processing`, recording the start time and the node.
    pub fn begin_processing(&mut self, node_id: Option<NodeId>, now_ms: u64) {
        self.status = TaskStatus::Processing;
        self.processing_started_at = Some(now_ms);
        self.updated_at = now_ms;
        self.node_id = node_id;
    }

    /// Leave `processing`: clear the start timestamp and the assigned node.
    pub fn end_processing(&mut self, now_ms: u64) {
        self.processing_started_at = None;
        self.node_id = None;
        self.updated_at = now_ms;
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
