// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// ── One-retry policy ─────────────────────────────────────────────────────────

#[test]
fn first_timeout_requeues_with_one_retry() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/x"]);
    store.lease(1, None, NOW);

    let touched = store.sweep_timeouts(0, &mut nodes, NOW + 10);
    assert_eq!(touched, 1);

    let task = store.find(added[0].as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.failure_count, 1);
    assert!(task.message.as_deref().unwrap_or_default().contains("重试"));
    assert!(task.processing_started_at.is_none());
    assert!(store.has_pending());
    assert_partition(&store);
}

#[test]
fn second_timeout_fails_for_good() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/x"]);

    store.lease(1, None, NOW);
    store.sweep_timeouts(0, &mut nodes, NOW + 10);
    store.lease(1, None, NOW + 20);
    let touched = store.sweep_timeouts(0, &mut nodes, NOW + 30);
    assert_eq!(touched, 1);

    let task = store.find(added[0].as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_count, 2);
    assert!(task.message.as_deref().unwrap_or_default().contains("最大重试"));

    // Never re-queued again
    assert!(!store.has_pending());
    assert!(store.lease(1, None, NOW + 40).is_empty());
    assert_eq!(store.sweep_timeouts(0, &mut nodes, NOW + 50), 0);
    assert_partition(&store);
}

#[test]
fn task_failed_once_by_report_is_not_requeued_on_timeout() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/x", "/y"]);

    store.lease(2, None, NOW);
    store.report(&added[0], false, None, &mut nodes, NOW + 1);

    // /y is still processing with failure_count 0 → requeued
    store.sweep_timeouts(0, &mut nodes, NOW + 2);
    let y = store.find(added[1].as_str()).expect("task");
    assert_eq!(y.status, TaskStatus::Pending);

    // Lease /y again; it now has failure_count 1 → next timeout is final
    store.lease(1, None, NOW + 3);
    store.sweep_timeouts(0, &mut nodes, NOW + 4);
    let y = store.find(added[1].as_str()).expect("task");
    assert_eq!(y.status, TaskStatus::Failed);
    assert_eq!(y.failure_count, 2);
}

// ── Threshold handling ───────────────────────────────────────────────────────

#[test]
fn positive_threshold_only_sweeps_expired() {
    let (mut store, ids, mut nodes) = store();
    enqueue_all(&mut store, &ids, &["/old", "/new"]);

    store.lease(1, None, NOW); // /old starts at NOW
    store.lease(1, None, NOW + 5_000); // /new starts later

    // At NOW+6_000 with a 2s threshold only /old (6s elapsed) has expired
    let touched = store.sweep_timeouts(2_000, &mut nodes, NOW + 6_000);
    assert_eq!(touched, 1);

    let old = store.find("/old").expect("old");
    let new = store.find("/new").expect("new");
    assert_eq!(old.status, TaskStatus::Pending);
    assert_eq!(new.status, TaskStatus::Processing);
}

#[test]
fn elapsed_exactly_at_threshold_is_not_expired() {
    let (mut store, ids, mut nodes) = store();
    enqueue_all(&mut store, &ids, &["/x"]);
    store.lease(1, None, NOW);

    assert_eq!(store.sweep_timeouts(1_000, &mut nodes, NOW + 1_000), 0);
    assert_eq!(store.sweep_timeouts(1_000, &mut nodes, NOW + 1_001), 1);
}

#[test]
fn sweep_detaches_from_node_store() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/x"]);
    let node = NodeId::new("n1");
    store.lease(1, Some(&node), NOW);
    nodes.record_assignment(&node, &[added[0].clone()], NOW);

    store.sweep_timeouts(0, &mut nodes, NOW + 1);
    assert!(nodes.node_for_task(&added[0]).is_none());
}

#[test]
fn reported_task_is_invisible_to_the_sweep() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/x"]);
    store.lease(1, None, NOW);
    store.report(&added[0], true, None, &mut nodes, NOW + 1);

    // The report won; the sweep sees nothing processing
    assert_eq!(store.sweep_timeouts(0, &mut nodes, NOW + 2), 0);
    let task = store.find(added[0].as_str()).expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
}

#[test]
fn sweep_with_nothing_processing_is_a_noop() {
    let (mut store, ids, mut nodes) = store();
    enqueue_all(&mut store, &ids, &["/x"]);
    assert_eq!(store.sweep_timeouts(0, &mut nodes, NOW), 0);
}
