// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn leased_task() -> (RoundStore, rup_core::SequentialIdGen, NodeStatsStore, TaskId) {
    let (mut store, ids, nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a"]);
    store.lease(1, Some(&NodeId::new("n1")), NOW);
    (store, ids, nodes, added[0].clone())
}

// ── Success ──────────────────────────────────────────────────────────────────

#[test]
fn success_completes_the_task() {
    let (mut store, _, mut nodes, id) = leased_task();

    let status = store.report(&id, true, Some("done".to_string()), &mut nodes, NOW + 100);
    assert_eq!(status, Some(TaskStatus::Completed));

    let task = store.find(id.as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.failure_count, 0);
    assert_eq!(task.message.as_deref(), Some("done"));
    assert_eq!(task.updated_at, NOW + 100);
    assert!(task.node_id.is_none());
    assert!(task.processing_started_at.is_none());
    assert_partition(&store);
}

#[test]
fn success_detaches_from_node_store() {
    let (mut store, _, mut nodes, id) = leased_task();
    let node = NodeId::new("n1");
    nodes.record_assignment(&node, &[id.clone()], NOW);
    assert!(nodes.node_for_task(&id).is_some());

    store.report(&id, true, None, &mut nodes, NOW + 1);
    assert!(nodes.node_for_task(&id).is_none());
}

#[test]
fn success_on_failed_task_recovers_it() {
    let (mut store, _, mut nodes, id) = leased_task();
    store.report(&id, false, None, &mut nodes, NOW + 1);
    assert_eq!(store.counts().failed, 1);

    let status = store.report(&id, true, None, &mut nodes, NOW + 2);
    assert_eq!(status, Some(TaskStatus::Completed));

    let task = store.find(id.as_str()).expect("task");
    assert_eq!(task.failure_count, 0);
    let counts = store.counts();
    assert_eq!(counts.failed, 0);
    assert_eq!(counts.completed, 1);
    assert_eq!(store.list(TaskFilter::Failed, 1, 10).total, 0);
}

#[test]
fn repeated_success_does_not_duplicate_completed_list() {
    let (mut store, _, mut nodes, id) = leased_task();
    store.report(&id, true, None, &mut nodes, NOW + 1);
    store.report(&id, true, None, &mut nodes, NOW + 2);

    let completed = store.list(TaskFilter::Completed, 1, 10);
    assert_eq!(completed.total, 1);
    assert_eq!(store.counts().completed, 1);
}

// ── Failure ──────────────────────────────────────────────────────────────────

#[test]
fn failure_marks_failed_and_increments_count() {
    let (mut store, _, mut nodes, id) = leased_task();

    let status = store.report(&id, false, Some("坏文件".to_string()), &mut nodes, NOW + 1);
    assert_eq!(status, Some(TaskStatus::Failed));

    let task = store.find(id.as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_count, 1);
    assert_eq!(task.message.as_deref(), Some("坏文件"));
    assert!(task.node_id.is_none());
    assert_partition(&store);
}

#[test]
fn repeated_failure_moves_to_list_head_once() {
    let (mut store, ids, mut nodes, id) = leased_task();
    let other = store.enqueue(["/b"], &ids, NOW).added[0].clone();
    store.lease(1, None, NOW);

    store.report(&id, false, None, &mut nodes, NOW + 1);
    store.report(&other, false, None, &mut nodes, NOW + 2);
    // Failing the first task again moves it back to the head
    store.report(&id, false, None, &mut nodes, NOW + 3);

    let failed = store.list(TaskFilter::Failed, 1, 10);
    assert_eq!(failed.total, 2);
    assert_eq!(failed.items[0].id, id);
    assert_eq!(failed.items[0].failure_count, 2);
    assert_eq!(failed.items[1].id, other);
}

// ── Edge cases ───────────────────────────────────────────────────────────────

#[test]
fn unknown_task_returns_none() {
    let (mut store, _, mut nodes, _) = leased_task();
    assert_eq!(
        store.report(&TaskId::new("missing"), true, None, &mut nodes, NOW),
        None
    );
}

#[test]
fn late_failure_does_not_undo_completion() {
    let (mut store, _, mut nodes, id) = leased_task();
    store.report(&id, true, None, &mut nodes, NOW + 1);

    let status = store.report(&id, false, Some("late".to_string()), &mut nodes, NOW + 2);
    assert_eq!(status, Some(TaskStatus::Completed));

    let task = store.find(id.as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
    // The late failure left no trace
    assert_eq!(task.updated_at, NOW + 1);
    assert_ne!(task.message.as_deref(), Some("late"));
    assert_eq!(store.counts().failed, 0);
}

#[test]
fn report_on_pending_task_is_accepted() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a"]);

    // At-least-once delivery: an outcome can arrive without a recorded lease
    let status = store.report(&added[0], true, None, &mut nodes, NOW + 1);
    assert_eq!(status, Some(TaskStatus::Completed));
    assert!(!store.has_pending());
    assert_partition(&store);
}
