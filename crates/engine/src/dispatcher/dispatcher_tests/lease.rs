// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::ConfigPatch;

#[tokio::test]
async fn lease_uses_configured_default_batch() {
    let fx = fixture();
    fx.dispatcher
        .update_config(&ConfigPatch {
            default_batch_size: Some(2),
            ..ConfigPatch::default()
        })
        .expect("config");
    import_round(&fx, &["/a", "/b", "/c"]).await;

    let leased = fx.dispatcher.lease(None, None, None).expect("lease");
    assert_eq!(leased.len(), 2);
}

#[tokio::test]
async fn lease_clamps_to_max_batch() {
    let fx = fixture();
    fx.dispatcher
        .update_config(&ConfigPatch {
            max_batch_size: Some(2),
            ..ConfigPatch::default()
        })
        .expect("config");
    import_round(&fx, &["/a", "/b", "/c"]).await;

    let leased = fx.dispatcher.lease(Some(100), None, None).expect("lease");
    assert_eq!(leased.len(), 2);
}

#[tokio::test]
async fn lease_zero_clamps_to_one() {
    let fx = fixture();
    import_round(&fx, &["/a", "/b"]).await;
    let leased = fx.dispatcher.lease(Some(0), None, None).expect("lease");
    assert_eq!(leased.len(), 1);
}

#[tokio::test]
async fn lease_returns_task_views() {
    let fx = fixture();
    let round = import_round(&fx, &["/data/a.bin"]).await;
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");

    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].round_id, round);
    assert_eq!(leased[0].path, "/data/a.bin");
}

#[tokio::test]
async fn lease_without_rounds_is_empty() {
    let fx = fixture();
    assert!(fx.dispatcher.lease(Some(5), None, None).expect("lease").is_empty());
}

#[tokio::test]
async fn lease_from_specific_round_ignores_active() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await; // active
    let second = import_round(&fx, &["/b"]).await;

    let leased = fx
        .dispatcher
        .lease(Some(5), Some(&second), None)
        .expect("lease");
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].path, "/b");
}

#[tokio::test]
async fn lease_from_unknown_round_is_not_found() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .lease(Some(1), Some(&RoundId::new("round_9999")), None)
        .expect_err("unknown round");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn empty_node_id_is_invalid() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .lease(Some(1), None, Some(&NodeId::new("  ")))
        .expect_err("blank node");
    assert_eq!(err.code(), "INVALID_INPUT");
}

// ── Cross-round allocation ───────────────────────────────────────────────────

#[tokio::test]
async fn batch_does_not_fan_out_while_active_round_yields() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a1", "/a2"]).await;
    let round_b = import_round(&fx, &["/b1"]).await;

    // Lease 5 with no round id: all of A, nothing from B
    let leased = fx.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(leased.len(), 2);
    assert!(leased.iter().all(|t| t.round_id == round_a));
    assert_eq!(summary_of(&fx, &round_b).counts.pending, 1);
}

#[tokio::test]
async fn exhausted_active_round_falls_through_to_next() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a1", "/a2"]).await;
    let round_b = import_round(&fx, &["/b1"]).await;

    let first = fx.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(first.len(), 2);
    for task in first {
        fx.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
    }
    assert_eq!(summary_of(&fx, &round_a).status, RoundStatus::Completed);

    // Next lease falls through to B, which becomes active
    let second = fx.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].path, "/b1");
    assert_eq!(second[0].round_id, round_b);
    assert_eq!(summary_of(&fx, &round_b).status, RoundStatus::Active);
}

#[tokio::test]
async fn active_still_processing_but_without_pending_falls_through() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a1"]).await;
    import_round(&fx, &["/b1"]).await;

    // Drain A's pending by leasing it; the task stays processing
    let first = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(first[0].round_id, round_a);

    // A yields nothing and has no pending left, so the allocator may move on
    let second = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].path, "/b1");
}

#[tokio::test]
async fn completed_rounds_are_skipped_in_the_scan() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a1"]).await;
    import_round(&fx, &[] as &[&str]).await; // empty → completed
    let round_c = import_round(&fx, &["/c1"]).await;

    drain_round(&fx, 10).await;
    assert_eq!(summary_of(&fx, &round_a).status, RoundStatus::Completed);

    let leased = fx.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].round_id, round_c);
}

// ── Node bookkeeping ─────────────────────────────────────────────────────────

#[tokio::test]
async fn lease_with_node_counts_one_request_and_assignments() {
    let fx = fixture();
    import_round(&fx, &["/a", "/b", "/c"]).await;

    let node = NodeId::new("n1");
    let leased = fx
        .dispatcher
        .lease(Some(3), None, Some(&node))
        .expect("lease");
    assert_eq!(leased.len(), 3);

    let (page, summary) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].request_count, 1);
    assert_eq!(page.items[0].assigned_task_count, 3);
    assert_eq!(page.items[0].active_task_count, 3);
    assert_eq!(summary.total_active_tasks, 3);
}

#[tokio::test]
async fn empty_lease_still_counts_the_request() {
    let fx = fixture();
    let node = NodeId::new("n1");
    let leased = fx
        .dispatcher
        .lease(Some(3), None, Some(&node))
        .expect("lease");
    assert!(leased.is_empty());

    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.items[0].request_count, 1);
    assert_eq!(page.items[0].assigned_task_count, 0);
}
