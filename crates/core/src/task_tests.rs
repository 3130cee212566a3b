// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_task() -> Task {
    Task::new(
        TaskId::new("t-1"),
        RoundId::new("round_0001"),
        "/data/a.bin",
        1_000,
    )
}

#[test]
fn new_task_is_pending_with_clean_counters() {
    let task = sample_task();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.failure_count, 0);
    assert_eq!(task.created_at, 1_000);
    assert_eq!(task.updated_at, 1_000);
    assert!(task.message.is_none());
    assert!(task.processing_started_at.is_none());
    assert!(task.node_id.is_none());
}

#[test]
fn begin_processing_sets_start_and_node() {
    let mut task = sample_task();
    task.begin_processing(Some(NodeId::new("n1")), 2_000);

    assert_eq!(task.status, TaskStatus::Processing);
    assert_eq!(task.processing_started_at, Some(2_000));
    assert_eq!(task.updated_at, 2_000);
    assert_eq!(task.node_id.as_ref().map(|n| n.as_str()), Some("n1"));
}

#[test]
fn end_processing_clears_start_and_node() {
    let mut task = sample_task();
    task.begin_processing(Some(NodeId::new("n1")), 2_000);
    task.end_processing(3_000);

    assert!(task.processing_started_at.is_none());
    assert!(task.node_id.is_none());
    assert_eq!(task.updated_at, 3_000);
}

#[yare::parameterized(
    pending    = { TaskStatus::Pending, false },
    processing = { TaskStatus::Processing, false },
    completed  = { TaskStatus::Completed, true },
    failed     = { TaskStatus::Failed, true },
)]
fn terminal_statuses(status: TaskStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[test]
fn serde_uses_camel_case_wire_names() {
    let mut task = sample_task();
    task.begin_processing(Some(NodeId::new("n1")), 2_000);

    let json = serde_json::to_value(&task).expect("serialize");
    assert_eq!(json["roundId"], "round_0001");
    assert_eq!(json["status"], "processing");
    assert_eq!(json["failureCount"], 0);
    assert_eq!(json["createdAt"], 1_000);
    assert_eq!(json["processingStartedAt"], 2_000);
    assert_eq!(json["nodeId"], "n1");
}

#[test]
fn serde_roundtrip_preserves_task() {
    let mut task = sample_task();
    task.begin_processing(None, 2_000);

    let json = serde_json::to_string(&task).expect("serialize");
    let back: Task = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, task);
}

#[test]
fn missing_optional_fields_default() {
    let json = r#"{
        "id": "t-9",
        "roundId": "round_0002",
        "path": "/x",
        "status": "pending",
        "createdAt": 5,
        "updatedAt": 5
    }"#;
    let task: Task = serde_json::from_str(json).expect("deserialize");
    assert_eq!(task.failure_count, 0);
    assert!(task.message.is_none());
    assert!(task.node_id.is_none());
}
