// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// ── Run statistics ───────────────────────────────────────────────────────────

#[test]
fn empty_store_has_null_stats() {
    let (store, _, _) = store();
    let stats = store.run_stats();
    assert_eq!(stats.counts.total, 0);
    assert!(stats.started_at.is_none());
    assert!(stats.finished_at.is_none());
    assert!(stats.duration_ms.is_none());
    assert!(stats.average_task_speed.is_none());
    assert!(stats.average_item_speed.is_none());
    assert!(!stats.all_completed);
}

#[test]
fn stats_span_from_creation_to_last_completion() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);
    store.lease(2, None, NOW + 100);
    store.report(&added[0], true, None, &mut nodes, NOW + 1_000);
    store.report(&added[1], true, None, &mut nodes, NOW + 4_000);

    let stats = store.run_stats();
    assert_eq!(stats.started_at, Some(NOW));
    assert_eq!(stats.finished_at, Some(NOW + 4_000));
    assert_eq!(stats.duration_ms, Some(4_000));
    // 2 completed over 4 seconds
    let speed = stats.average_task_speed.expect("task speed");
    assert!((speed - 0.5).abs() < 1e-9);
    assert!(stats.all_completed);
}

#[test]
fn stats_with_failures_is_not_all_completed() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);
    store.lease(2, None, NOW);
    store.report(&added[0], true, None, &mut nodes, NOW + 1);
    store.report(&added[1], false, None, &mut nodes, NOW + 2);

    assert!(!store.run_stats().all_completed);
}

#[test]
fn item_averages_come_from_processed_totals() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a"]);
    store.add_processed(10, 5.0, NOW);
    store.add_processed(10, 5.0, NOW + 1);

    let stats = store.run_stats();
    assert_eq!(stats.totals.item_num, 20);
    let item_speed = stats.average_item_speed.expect("item speed");
    assert!((item_speed - 2.0).abs() < 1e-9);
    let per_item = stats.average_time_per_item.expect("time per item");
    assert!((per_item - 0.5).abs() < 1e-9);
    let per_100 = stats.average_time_per_100_items.expect("per 100");
    assert!((per_100 - 50.0).abs() < 1e-9);
}

// ── Processing inspection ────────────────────────────────────────────────────

fn processing_store() -> RoundStore {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/a", "/b", "/c"]);
    store.lease(1, Some(&NodeId::new("n1")), NOW); // /a oldest
    store.lease(1, None, NOW + 4_000);
    store.lease(1, None, NOW + 9_000); // /c newest
    store
}

#[test]
fn inspect_sorts_by_duration_and_counts_timeouts() {
    let store = processing_store();
    // At NOW+10_000: durations are 10s, 6s, 1s; threshold 5s
    let summary = store.inspect_processing(5_000, NOW + 10_000);

    assert_eq!(summary.total_processing, 3);
    assert_eq!(summary.timed_out_count, 2);
    assert_eq!(summary.longest_duration_ms, Some(10_000));
    assert_eq!(summary.top_timed_out.len(), 2);
    assert_eq!(summary.top_longest[0].path, "/a");
    assert_eq!(summary.top_longest[0].duration_ms, 10_000);
    assert_eq!(
        summary.top_longest[0].node_id.as_ref().map(|n| n.as_str()),
        Some("n1")
    );
    assert_eq!(summary.top_longest[2].path, "/c");
}

#[test]
fn inspect_counts_near_timeout_band() {
    let store = processing_store();
    // Threshold 10s at NOW+10_000: /a at exactly 10s is near (not over),
    // /b at 6s is below the 80% band, /c at 1s is far below
    let summary = store.inspect_processing(10_000, NOW + 10_000);
    assert_eq!(summary.timed_out_count, 0);
    assert_eq!(summary.near_timeout_count, 1);
}

#[test]
fn inspect_with_zero_threshold_reports_without_timeouts() {
    let store = processing_store();
    let summary = store.inspect_processing(0, NOW + 10_000);
    assert_eq!(summary.total_processing, 3);
    assert_eq!(summary.timed_out_count, 0);
    assert_eq!(summary.near_timeout_count, 0);
}

#[test]
fn inspect_empty_store() {
    let (store, _, _) = store();
    let summary = store.inspect_processing(1_000, NOW);
    assert_eq!(summary.total_processing, 0);
    assert!(summary.longest_duration_ms.is_none());
    assert!(summary.top_longest.is_empty());
}

#[test]
fn summary_merge_keeps_top_five() {
    let mut merged = ProcessingSummary::default();
    for offset in 0..4 {
        let (mut store, ids, _) = store();
        enqueue_all(&mut store, &ids, &["/p", "/q"]);
        store.lease(2, None, NOW + offset * 100);
        merged.merge(store.inspect_processing(0, NOW + 10_000));
    }
    assert_eq!(merged.total_processing, 8);
    assert_eq!(merged.top_longest.len(), 5);
    // Merged list stays sorted by duration descending
    let durations: Vec<u64> = merged.top_longest.iter().map(|v| v.duration_ms).collect();
    let mut sorted = durations.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(durations, sorted);
}

// ── Clearing ─────────────────────────────────────────────────────────────────

#[test]
fn clear_drops_everything() {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b"]);
    let node = NodeId::new("n1");
    store.lease(1, Some(&node), NOW);
    nodes.record_assignment(&node, &[added[0].clone()], NOW);
    store.add_processed(5, 1.0, NOW);

    let cleared = store.clear(&mut nodes);
    assert_eq!(cleared, 2);
    assert_eq!(store.counts().total, 0);
    assert!(!store.has_pending());
    assert!(store.find("/a").is_none());
    assert_eq!(store.processed_totals().item_num, 0);
    assert!(nodes.node_for_task(&added[0]).is_none());
}
