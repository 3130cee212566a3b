// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-round snapshot documents.
//!
//! A snapshot is the complete serialized state of one round: its metadata
//! plus the round store's task table, queues, and processed totals. Cold
//! rounds exist only as these documents; loading one back rebuilds the round
//! store exactly.

use rup_core::{RoundId, RoundMetadata, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized round-store state inside a snapshot.
///
/// The pending queue and the completed/failed lists hold ids only; the task
/// table is the single authoritative copy of each task. List entries are
/// filtered to live ids on write, so a restore never resurrects tasks the
/// lazy-deletion scheme already dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub round_id: RoundId,
    pub tasks: Vec<Task>,
    pub pending_queue: Vec<TaskId>,
    pub processing_started_at: Vec<(TaskId, u64)>,
    pub completed_list: Vec<TaskId>,
    pub failed_list: Vec<TaskId>,
    pub total_processed_item_num: u64,
    pub total_processed_running_time: f64,
    pub last_processed_at: Option<u64>,
}

/// A complete persisted round: metadata plus store state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub metadata: RoundMetadata,
    pub store: StoreSnapshot,
}

impl RoundSnapshot {
    /// Save the snapshot atomically (write to .tmp, fsync, then rename).
    ///
    /// The task list dominates the document size, so the writer streams
    /// through a [`BufWriter`] rather than building the JSON in memory.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");

        // Write to temp file and sync
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        // Atomic rename replaces any prior snapshot for this round
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Load a snapshot if the file exists.
    ///
    /// Returns `Ok(None)` when the file is absent. A present-but-unparseable
    /// file is an error: the caller decides whether the round is unavailable
    /// or recoverable.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "corrupt round snapshot",
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
pub(crate) mod tests;
