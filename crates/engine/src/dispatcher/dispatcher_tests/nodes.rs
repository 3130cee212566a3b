// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dispatcher::ProcessedInfo;

fn info(node: &str, items: u64, secs: f64) -> ProcessedInfo {
    ProcessedInfo {
        node_id: NodeId::new(node),
        item_num: items,
        running_time: secs,
    }
}

#[tokio::test]
async fn node_stats_cycle() {
    let fx = fixture();
    import_round(&fx, &["/a", "/b", "/c"]).await;
    let node = NodeId::new("n1");

    let leased = fx
        .dispatcher
        .lease(Some(3), None, Some(&node))
        .expect("lease");
    assert_eq!(leased.len(), 3);

    // Two successes with telemetry, one failure
    for task in leased.iter().take(2) {
        fx.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
        fx.dispatcher
            .record_processed(&info("n1", 10, 5.0), None)
            .expect("record");
    }
    fx.dispatcher
        .report(&leased[2].task_id, false, None)
        .await
        .expect("report");

    let (page, summary) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.total, 1);
    let view = &page.items[0];
    assert_eq!(view.request_count, 1);
    assert_eq!(view.assigned_task_count, 3);
    assert_eq!(view.active_task_count, 0);
    assert_eq!(view.total_item_num, 20);
    assert!((view.total_running_time - 10.0).abs() < 1e-9);
    let speed = view.average_speed.expect("speed");
    assert!((speed - 2.0).abs() < 1e-9);
    let per_100 = view.average_time_per_100_items.expect("per 100");
    assert!((per_100 - 50.0).abs() < 1e-9);

    assert_eq!(summary.node_count, 1);
    assert_eq!(summary.total_assigned_tasks, 3);
    assert_eq!(summary.total_active_tasks, 0);
}

#[tokio::test]
async fn record_processed_feeds_the_active_round() {
    let fx = fixture();
    let round = import_round(&fx, &["/a"]).await;

    fx.dispatcher
        .record_processed(&info("n1", 10, 5.0), None)
        .expect("record");

    let stats = fx.dispatcher.round_stats(Some(&round)).expect("stats");
    assert_eq!(stats.totals.item_num, 10);
    assert!((stats.totals.running_time - 5.0).abs() < 1e-9);
    assert!(stats.totals.last_processed_at.is_some());
}

#[tokio::test]
async fn record_processed_with_explicit_round_targets_it() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;

    fx.dispatcher
        .record_processed(&info("n1", 7, 2.0), Some(&round_b))
        .expect("record");

    assert_eq!(
        fx.dispatcher
            .round_stats(Some(&round_b))
            .expect("stats")
            .totals
            .item_num,
        7
    );
    assert_eq!(
        fx.dispatcher
            .round_stats(Some(&round_a))
            .expect("stats")
            .totals
            .item_num,
        0
    );
}

#[tokio::test]
async fn record_processed_without_any_round_updates_only_nodes() {
    let fx = fixture();
    fx.dispatcher
        .record_processed(&info("n1", 5, 1.0), None)
        .expect("record without active round");

    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.items[0].total_item_num, 5);
}

#[tokio::test]
async fn record_processed_validates_input() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .record_processed(&info("  ", 1, 1.0), None)
        .expect_err("blank node");
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = fx
        .dispatcher
        .record_processed(&info("n1", 1, -2.0), None)
        .expect_err("negative time");
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = fx
        .dispatcher
        .record_processed(&info("n1", 1, f64::NAN), None)
        .expect_err("nan time");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn record_processed_with_unknown_round_mutates_nothing() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .record_processed(&info("n1", 5, 1.0), Some(&RoundId::new("round_9999")))
        .expect_err("unknown round");
    assert_eq!(err.code(), "NOT_FOUND");

    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn round_id_never_partitions_the_node_store() {
    let fx = fixture();
    let round = import_round(&fx, &["/a"]).await;
    fx.dispatcher
        .record_processed(&info("n1", 5, 1.0), Some(&round))
        .expect("record");

    // Listing with any round id sees the same global store
    let (with_round, _) = fx.dispatcher.list_nodes(1, 10, Some(&round));
    let (without, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(with_round.total, 1);
    assert_eq!(without.total, 1);
}

#[tokio::test]
async fn delete_node_reports_existence() {
    let fx = fixture();
    fx.dispatcher
        .record_processed(&info("n1", 1, 1.0), None)
        .expect("record");

    assert!(fx.dispatcher.delete_node(&NodeId::new("n1"), None));
    assert!(!fx.dispatcher.delete_node(&NodeId::new("n1"), None));
    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn clearing_a_round_detaches_its_tasks_from_nodes() {
    let fx = fixture();
    let round = import_round(&fx, &["/a", "/b"]).await;
    let node = NodeId::new("n1");
    fx.dispatcher
        .lease(Some(2), None, Some(&node))
        .expect("lease");

    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.items[0].active_task_count, 2);

    fx.dispatcher.clear_round(&round).await.expect("clear");
    let (page, _) = fx.dispatcher.list_nodes(1, 10, None);
    assert_eq!(page.items[0].active_task_count, 0);
}
