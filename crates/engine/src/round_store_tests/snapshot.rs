// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn busy_store() -> (RoundStore, Vec<TaskId>) {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b", "/c", "/d", "/e"]);
    store.lease(2, Some(&NodeId::new("n1")), NOW + 10); // /a /b processing
    store.report(&added[2], true, None, &mut nodes, NOW + 20); // /c completed
    store.report(&added[3], false, None, &mut nodes, NOW + 30); // /d failed
    store.add_processed(10, 5.0, NOW + 40);
    (store, added)
}

#[test]
fn snapshot_restore_preserves_observable_state() {
    let (store, added) = busy_store();
    let restored = RoundStore::restore(store.snapshot());

    assert_eq!(restored.counts(), store.counts());
    assert_eq!(restored.processed_totals(), store.processed_totals());
    assert_eq!(restored.round_id(), store.round_id());

    for id in &added {
        assert_eq!(
            restored.find(id.as_str()),
            store.find(id.as_str()),
            "task {} must survive the round-trip",
            id
        );
    }
    assert_partition(&restored);
}

#[test]
fn restored_pending_queue_keeps_fifo_order() {
    let (store, added) = busy_store();
    let mut restored = RoundStore::restore(store.snapshot());

    let leased = restored.lease(10, None, NOW + 100);
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, added[4]);
}

#[test]
fn restored_processing_keeps_start_times() {
    let (store, _) = busy_store();
    let mut restored = RoundStore::restore(store.snapshot());
    let mut nodes = NodeStatsStore::new();

    // Original processing started at NOW+10; a 50ms threshold at NOW+100
    // (90ms elapsed) must expire both
    let touched = restored.sweep_timeouts(50, &mut nodes, NOW + 100);
    assert_eq!(touched, 2);
}

#[test]
fn restored_lists_keep_head_order() {
    let (mut store, _) = busy_store();
    let (ids, mut nodes) = (SequentialIdGen::new("y"), NodeStatsStore::new());
    let more = store.enqueue(["/f"], &ids, NOW + 50).added;
    store.report(&more[0], false, None, &mut nodes, NOW + 60);

    let restored = RoundStore::restore(store.snapshot());
    let failed = restored.list(TaskFilter::Failed, 1, 10);
    assert_eq!(failed.items[0].path, "/f");
    assert_eq!(failed.items[1].path, "/d");
}

#[test]
fn snapshot_filters_stale_queue_entries() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);
    // /a leaves pending but its queue slot lingers until leased over
    store.report(&added[0], true, None, &mut nodes, NOW);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.pending_queue, vec![added[1].clone()]);
}

#[test]
fn restore_requeues_pending_stragglers() {
    let (store, added) = busy_store();
    let mut snapshot = store.snapshot();
    // Simulate a truncated queue in an old snapshot
    snapshot.pending_queue.clear();

    let mut restored = RoundStore::restore(snapshot);
    let leased = restored.lease(10, None, NOW + 100);
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, added[4]);
}

#[test]
fn restore_falls_back_to_task_start_field() {
    let (store, _) = busy_store();
    let mut snapshot = store.snapshot();
    snapshot.processing_started_at.clear();

    let mut restored = RoundStore::restore(snapshot);
    let mut nodes = NodeStatsStore::new();
    // Start times recovered from the tasks themselves (NOW+10)
    assert_eq!(restored.sweep_timeouts(50, &mut nodes, NOW + 100), 2);
    assert_eq!(restored.counts().processing, 0);
}

#[test]
fn path_index_is_rebuilt() {
    let (store, added) = busy_store();
    let restored = RoundStore::restore(store.snapshot());
    assert_eq!(restored.find("/e").map(|t| t.id), Some(added[4].clone()));
}
