// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn lease_returns_fifo_order() {
    let (mut store, ids, _) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b", "/c"]);

    let leased = store.lease(2, None, NOW + 10);
    let leased_ids: Vec<&TaskId> = leased.iter().map(|t| &t.id).collect();
    assert_eq!(leased_ids, vec![&added[0], &added[1]]);

    let counts = store.counts();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.processing, 2);
    assert_partition(&store);
}

#[test]
fn lease_marks_processing_with_node_and_start() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a"]);

    let leased = store.lease(1, Some(&NodeId::new("n1")), NOW + 5);
    assert_eq!(leased.len(), 1);
    let task = &leased[0];
    assert_eq!(task.status, TaskStatus::Processing);
    assert_eq!(task.processing_started_at, Some(NOW + 5));
    assert_eq!(task.updated_at, NOW + 5);
    assert_eq!(task.node_id.as_ref().map(|n| n.as_str()), Some("n1"));
}

#[test]
fn lease_stops_when_queue_drains() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a", "/b"]);

    let leased = store.lease(10, None, NOW);
    assert_eq!(leased.len(), 2);
    assert!(!store.has_pending());
    assert!(store.lease(10, None, NOW).is_empty());
}

#[test]
fn lease_never_returns_a_task_twice() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a", "/b", "/c"]);

    let first = store.lease(2, None, NOW);
    let second = store.lease(2, None, NOW);

    let mut seen: Vec<&TaskId> = first.iter().chain(second.iter()).map(|t| &t.id).collect();
    let before = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), before);
    assert_eq!(before, 3);
}

#[test]
fn lease_skips_stale_queue_entries() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);

    // Reporting a pending task directly removes it from the pending set but
    // leaves its queue slot behind (lazy deletion)
    store.report(&added[0], true, None, &mut nodes, NOW);

    let leased = store.lease(2, None, NOW);
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, added[1]);
}

#[test]
fn lease_on_empty_store_is_empty() {
    let (mut store, _, _) = store();
    assert!(store.lease(5, None, NOW).is_empty());
}
