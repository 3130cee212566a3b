// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn import_creates_sequential_round_ids() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;
    assert_eq!(first.as_str(), "round_0001");
    assert_eq!(second.as_str(), "round_0002");
}

#[tokio::test]
async fn import_reports_counts_and_defaults_name() {
    let fx = fixture();
    let result = fx
        .dispatcher
        .import(
            ["/a", "/b", "", "/b"],
            ImportOptions {
                source_type: SourceType::File,
                source_hint: Some("list.txt".to_string()),
                ..ImportOptions::default()
            },
        )
        .await
        .expect("import");

    assert_eq!(result.name, "round_0001");
    assert_eq!(result.added, 2);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.counts.total, 2);
    assert_eq!(result.counts.pending, 2);
    assert_eq!(result.status, RoundStatus::Active);
}

#[tokio::test]
async fn first_nonempty_import_becomes_active_by_default() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;

    assert_eq!(summary_of(&fx, &first).status, RoundStatus::Active);
    assert_eq!(summary_of(&fx, &second).status, RoundStatus::Pending);
}

#[tokio::test]
async fn explicit_activate_steals_the_pointer() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = fx
        .dispatcher
        .import(
            ["/b"],
            ImportOptions {
                activate: Some(true),
                ..ImportOptions::default()
            },
        )
        .await
        .expect("import")
        .round_id;

    assert_eq!(summary_of(&fx, &second).status, RoundStatus::Active);
    // The demoted round returns to pending
    assert_eq!(summary_of(&fx, &first).status, RoundStatus::Pending);
}

#[tokio::test]
async fn non_activated_round_is_flushed_and_evicted() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await; // active, stays hot
    let second = import_round(&fx, &["/b"]).await;

    // The second round was persisted on import
    let snapshot = fx.sink.get(&second).expect("persisted snapshot");
    assert_eq!(snapshot.metadata.counts.pending, 1);
    assert_eq!(snapshot.store.tasks.len(), 1);
}

#[tokio::test]
async fn empty_import_completes_immediately_and_stays_inactive() {
    let fx = fixture();
    let result = fx
        .dispatcher
        .import(Vec::<&str>::new(), ImportOptions::default())
        .await
        .expect("import");

    assert_eq!(result.counts.total, 0);
    assert_eq!(result.status, RoundStatus::Completed);
    assert!(summary_of(&fx, &result.round_id).completed_at.is_some());
}

// ── Appending into an existing round ─────────────────────────────────────────

#[tokio::test]
async fn duplicate_import_into_same_round() {
    let fx = fixture();
    let round = import_round(&fx, &["/a", "/b"]).await;

    let result = fx
        .dispatcher
        .import(
            ["/b", "/c"],
            ImportOptions {
                round_id: Some(round.clone()),
                ..ImportOptions::default()
            },
        )
        .await
        .expect("second import");

    assert_eq!(result.round_id, round);
    assert_eq!(result.added, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.counts.total, 3);
    assert_eq!(result.counts.pending, 3);
}

#[tokio::test]
async fn append_to_unknown_round_is_not_found() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .import(
            ["/x"],
            ImportOptions {
                round_id: Some(RoundId::new("round_9999")),
                ..ImportOptions::default()
            },
        )
        .await
        .expect_err("unknown round");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn append_revives_a_completed_round() {
    let fx = fixture_with_webhook();
    let round = import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    assert_eq!(summary_of(&fx, &round).status, RoundStatus::Completed);

    let result = fx
        .dispatcher
        .import(
            ["/b"],
            ImportOptions {
                round_id: Some(round.clone()),
                ..ImportOptions::default()
            },
        )
        .await
        .expect("append");

    assert_eq!(result.status, RoundStatus::Pending);
    assert!(summary_of(&fx, &round).completed_at.is_none());
}

#[tokio::test]
async fn import_routes_tasks_for_direct_reporting() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");

    let status = fx
        .dispatcher
        .report(&leased[0].task_id, true, None)
        .await
        .expect("report");
    assert_eq!(status, TaskStatus::Completed);
}

#[tokio::test]
async fn name_is_trimmed_and_capped() {
    let fx = fixture();
    let result = fx
        .dispatcher
        .import(
            ["/a"],
            ImportOptions {
                name: Some(format!("  {}  ", "n".repeat(100))),
                ..ImportOptions::default()
            },
        )
        .await
        .expect("import");
    assert_eq!(result.name.chars().count(), 64);
}
