// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot/cold cache policy and restart recovery.

use super::*;

#[tokio::test]
async fn completed_round_is_flushed_and_dropped() {
    let fx = fixture();
    let round = import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;

    let snapshot = fx.sink.get(&round).expect("snapshot");
    assert_eq!(snapshot.metadata.status, RoundStatus::Completed);
    assert_eq!(snapshot.metadata.counts.completed, 1);
    assert_eq!(snapshot.store.completed_list.len(), 1);
}

#[tokio::test]
async fn demoted_round_is_persisted_with_processing_state() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    fx.dispatcher.lease(Some(1), None, None).expect("lease");
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher.set_active_round(&round_b).expect("activate");

    let snapshot = fx.sink.get(&round_a).expect("snapshot");
    assert_eq!(snapshot.metadata.status, RoundStatus::Pending);
    assert_eq!(snapshot.metadata.counts.processing, 1);
    assert_eq!(snapshot.store.processing_started_at.len(), 1);
}

#[tokio::test]
async fn operations_on_cold_rounds_load_on_demand() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a1", "/a2"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher.set_active_round(&round_b).expect("activate");

    // A is cold now; a scoped lease loads it transparently
    let leased = fx
        .dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease");
    assert_eq!(leased.len(), 1);

    // The operation settled A back to the sink with the new state
    let snapshot = fx.sink.get(&round_a).expect("snapshot");
    assert_eq!(snapshot.metadata.counts.processing, 1);
    assert_eq!(snapshot.metadata.counts.pending, 1);
}

#[tokio::test]
async fn write_failure_keeps_round_hot_and_dirty() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let writes_before = fx.sink.write_count();

    // Every flush fails from here on; demoting A must not lose its state
    fx.sink.fail_writes(true);
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher.set_active_round(&round_b).expect("activate");

    // A kept its store in memory: a scoped lease works without a sink read
    let leased = fx
        .dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease survives write failure");
    assert_eq!(leased.len(), 1);
    assert_eq!(fx.sink.write_count(), writes_before);

    // Once writes recover, the dirty round flushes on the next settle
    fx.sink.fail_writes(false);
    fx.dispatcher.sweep(0, Some(&round_a)).await.expect("sweep");
    let snapshot = fx.sink.get(&round_a).expect("snapshot after recovery");
    assert_eq!(snapshot.metadata.counts.pending, 1);
}

#[tokio::test]
async fn unreadable_round_surfaces_round_unavailable() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher.set_active_round(&round_b).expect("activate");

    fx.sink.fail_reads(true);
    let err = fx
        .dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect_err("cold round unreadable");
    assert_eq!(err.code(), "ROUND_UNAVAILABLE");
}

// ── Restart recovery ─────────────────────────────────────────────────────────

#[tokio::test]
async fn cold_hot_eviction_round_trip_across_restart() {
    let fx = fixture();
    let round_1 = import_round(&fx, &["/a1", "/a2"]).await;
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    let old_task = leased[0].task_id.clone();
    fx.dispatcher
        .report(&old_task, true, None)
        .await
        .expect("report");

    let round_2 = import_round(&fx, &["/b1"]).await;
    fx.dispatcher.set_active_round(&round_2).expect("activate");

    // Round 1 must be persisted once demoted
    assert!(fx.sink.get(&round_1).is_some());

    // "Restart": fresh dispatcher over the same sink
    let restarted = reopen(&fx);
    let rounds = restarted.list_rounds();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0].id, round_1);
    assert_eq!(rounds[0].counts.total, 2);
    assert_eq!(rounds[0].counts.completed, 1);
    assert_eq!(rounds[1].id, round_2);
    assert_eq!(rounds[1].status, RoundStatus::Active);

    // Reporting round 1's remaining task loads it on demand and completes it
    let pending = restarted
        .list_tasks(TaskFilter::Pending, 1, 10, Some(&round_1))
        .expect("list");
    assert_eq!(pending.total, 1);
    restarted
        .report(&pending.items[0].id, true, None)
        .await
        .expect("report");

    let rounds = restarted.list_rounds();
    assert_eq!(rounds[0].status, RoundStatus::Completed);
}

#[tokio::test]
async fn restart_continues_the_round_sequence() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    import_round(&fx, &["/b"]).await;
    drain_round(&fx, 10).await;

    let restarted = reopen(&fx);
    let result = restarted
        .import(["/c"], ImportOptions::default())
        .await
        .expect("import");
    assert_eq!(result.round_id.as_str(), "round_0003");
}

#[tokio::test]
async fn restart_rebuilds_task_routing() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    let task_id = leased[0].task_id.clone();
    // Evict by activating another round
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher.set_active_round(&round_b).expect("activate");

    let restarted = reopen(&fx);
    let status = restarted
        .report(&task_id, true, None)
        .await
        .expect("report routed via rebuilt index");
    assert_eq!(status, TaskStatus::Completed);
}

#[tokio::test]
async fn active_round_stays_hot_without_flushing_every_op() {
    let fx = fixture();
    let round = import_round(&fx, &["/a", "/b"]).await;
    // Import persisted nothing for the active round yet
    assert!(fx.sink.get(&round).is_none());

    fx.dispatcher.lease(Some(1), None, None).expect("lease");
    // Still hot and unflushed; mutations accumulate in memory
    assert!(fx.sink.get(&round).is_none());
}
