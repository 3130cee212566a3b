// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn enqueue_adds_pending_tasks_in_order() {
    let (mut store, ids, _) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b", "/c"]);

    assert_eq!(added.len(), 3);
    let counts = store.counts();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.pending, 3);
    assert_partition(&store);

    let page = store.list(TaskFilter::Pending, 1, 10);
    let paths: Vec<&str> = page.items.iter().map(|t| t.path.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
}

#[test]
fn enqueue_trims_whitespace() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["  /a  "]);

    let task = store.find("/a").expect("trimmed path is findable");
    assert_eq!(task.path, "/a");
}

#[test]
fn blank_paths_are_skipped() {
    let (mut store, ids, _) = store();
    let outcome = store.enqueue(["", "   ", "/a"], &ids, NOW);

    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(store.counts().total, 1);
}

#[test]
fn duplicate_path_is_skipped_when_not_failed() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a", "/b"]);
    let outcome = store.enqueue(["/b", "/c"], &ids, NOW);

    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.replaced.is_empty());
    assert_eq!(store.counts().total, 3);
}

#[test]
fn duplicate_within_one_batch_is_skipped() {
    let (mut store, ids, _) = store();
    let outcome = store.enqueue(["/a", "/a"], &ids, NOW);

    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.skipped, 1);
}

#[test]
fn failed_task_is_replaced_wholesale() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a"]);
    let old_id = added[0].clone();

    store.lease(1, None, NOW);
    store.report(&old_id, false, None, &mut nodes, NOW);
    assert_eq!(store.counts().failed, 1);

    let outcome = store.enqueue(["/a"], &ids, NOW + 1);
    assert_eq!(outcome.added.len(), 1);
    assert_eq!(outcome.replaced, vec![old_id.clone()]);

    // The old id vanished entirely
    assert!(store.find(old_id.as_str()).is_none());
    let counts = store.counts();
    assert_eq!(counts.total, 1);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.failed, 0);
    assert_partition(&store);

    // The path resolves to the fresh task
    let task = store.find("/a").expect("replacement task");
    assert_eq!(task.id, outcome.added[0]);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.failure_count, 0);
}

#[test]
fn replaced_task_leaves_failed_list() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);
    store.lease(2, None, NOW);
    store.report(&added[0], false, None, &mut nodes, NOW);
    store.report(&added[1], false, None, &mut nodes, NOW);

    store.enqueue(["/a"], &ids, NOW + 1);

    let failed = store.list(TaskFilter::Failed, 1, 10);
    assert_eq!(failed.total, 1);
    assert_eq!(failed.items[0].path, "/b");
}
