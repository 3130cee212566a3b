// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round entity: metadata, lifecycle, counts, processed totals.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Sequential round identifier (`round_0001`, `round_0002`, …).
    pub struct RoundId;
}

/// Maximum length of a round display name.
pub const MAX_ROUND_NAME_LEN: usize = 64;

impl RoundId {
    /// Build the id for the given sequence number.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("round_{:04}", seq))
    }

    /// Parse the sequence number back out of the id, if it has the
    /// `round_NNNN` shape.
    pub fn seq(&self) -> Option<u64> {
        self.0.strip_prefix("round_")?.parse().ok()
    }
}

/// Lifecycle of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "pending"),
            RoundStatus::Active => write!(f, "active"),
            RoundStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Where a round's paths came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Folder,
    #[default]
    Manual,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::File => write!(f, "file"),
            SourceType::Folder => write!(f, "folder"),
            SourceType::Manual => write!(f, "manual"),
        }
    }
}

/// Per-status task counts for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RoundCounts {
    /// Whether the round has no open work left (pending + processing = 0).
    ///
    /// An empty round counts as drained; lifecycle reconciliation maps a
    /// drained round to `completed`.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }

    /// Whether every task finished successfully.
    pub fn all_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Aggregated processed-item totals for one round.
///
/// Fed by worker telemetry (`record_processed`), not by task transitions;
/// running time is in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTotals {
    pub item_num: u64,
    pub running_time: f64,
    pub last_processed_at: Option<u64>,
}

impl ProcessedTotals {
    /// Fold one telemetry sample into the totals.
    pub fn add(&mut self, item_num: u64, running_time: f64, now_ms: u64) {
        self.item_num += item_num;
        self.running_time += running_time;
        self.last_processed_at = Some(now_ms);
    }
}

/// Round metadata as written to the snapshot `metadata` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetadata {
    pub id: RoundId,
    pub name: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,
    pub created_at: u64,
    pub activated_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub status: RoundStatus,
    pub counts: RoundCounts,
}

impl RoundMetadata {
    /// Create metadata for a freshly imported round.
    ///
    /// The display name defaults to the round id and is truncated to
    /// [`MAX_ROUND_NAME_LEN`] characters.
    pub fn new(
        id: RoundId,
        name: Option<String>,
        source_type: SourceType,
        source_hint: Option<String>,
        now_ms: u64,
    ) -> Self {
        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(n) => truncate_name(n.trim()),
            None => id.to_string(),
        };
        Self {
            id,
            name,
            source_type,
            source_hint,
            created_at: now_ms,
            activated_at: None,
            completed_at: None,
            status: RoundStatus::Pending,
            counts: RoundCounts::default(),
        }
    }
}

/// Truncate a name to [`MAX_ROUND_NAME_LEN`] characters (char boundary safe).
fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_ROUND_NAME_LEN).collect()
}

#[cfg(test)]
#[path = "round_tests.rs"]
mod tests;
