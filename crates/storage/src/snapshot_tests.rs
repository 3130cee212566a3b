// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::{RoundId, RoundMetadata, SourceType, Task, TaskId, TaskStatus};

pub(crate) fn sample_snapshot(id: &str) -> RoundSnapshot {
    let round_id = RoundId::new(id);
    let mut metadata = RoundMetadata::new(
        round_id.clone(),
        Some("测试批次".to_string()),
        SourceType::Manual,
        None,
        1_000,
    );
    let mut task_a = Task::new(TaskId::new("t-1"), round_id.clone(), "/data/a", 1_000);
    let task_b = Task::new(TaskId::new("t-2"), round_id.clone(), "/data/b", 1_000);
    task_a.status = TaskStatus::Completed;
    task_a.updated_at = 2_000;
    metadata.counts.total = 2;
    metadata.counts.completed = 1;
    metadata.counts.pending = 1;

    RoundSnapshot {
        metadata,
        store: StoreSnapshot {
            round_id,
            tasks: vec![task_a, task_b],
            pending_queue: vec![TaskId::new("t-2")],
            processing_started_at: vec![],
            completed_list: vec![TaskId::new("t-1")],
            failed_list: vec![],
            total_processed_item_num: 10,
            total_processed_running_time: 5.0,
            last_processed_at: Some(2_000),
        },
    }
}

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("round_0001.json");

    let snapshot = sample_snapshot("round_0001");
    snapshot.save(&path).expect("save");

    let loaded = RoundSnapshot::load(&path).expect("load").expect("present");
    assert_eq!(loaded, snapshot);
}

#[test]
fn load_missing_file_returns_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = RoundSnapshot::load(&dir.path().join("absent.json")).expect("load");
    assert!(result.is_none());
}

#[test]
fn load_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("round_0001.json");
    std::fs::write(&path, "{ not json").expect("write");

    assert!(RoundSnapshot::load(&path).is_err());
}

#[test]
fn save_replaces_prior_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("round_0001.json");

    let mut snapshot = sample_snapshot("round_0001");
    snapshot.save(&path).expect("save");

    snapshot.store.total_processed_item_num = 99;
    snapshot.save(&path).expect("save again");

    let loaded = RoundSnapshot::load(&path).expect("load").expect("present");
    assert_eq!(loaded.store.total_processed_item_num, 99);

    // No stray temp file left behind
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/state/round_0001.json");

    sample_snapshot("round_0001").save(&path).expect("save");
    assert!(path.exists());
}

#[test]
fn wire_format_uses_spec_field_names() {
    let snapshot = sample_snapshot("round_0001");
    let json = serde_json::to_value(&snapshot).expect("serialize");

    assert_eq!(json["metadata"]["id"], "round_0001");
    assert_eq!(json["metadata"]["sourceType"], "manual");
    assert_eq!(json["store"]["roundId"], "round_0001");
    assert_eq!(json["store"]["pendingQueue"][0], "t-2");
    assert_eq!(json["store"]["completedList"][0], "t-1");
    assert_eq!(json["store"]["totalProcessedItemNum"], 10);
    assert_eq!(json["store"]["totalProcessedRunningTime"], 5.0);
    assert_eq!(json["store"]["lastProcessedAt"], 2_000);
    // Entries in processingStartedAt are [id, ms] pairs
    assert!(json["store"]["processingStartedAt"].as_array().is_some());
}
