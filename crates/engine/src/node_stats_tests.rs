// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::NodeId;

const NOW: u64 = 10_000_000;

fn node(name: &str) -> NodeId {
    NodeId::new(name)
}

fn task(id: &str) -> TaskId {
    TaskId::new(id)
}

// ── Requests and assignments ─────────────────────────────────────────────────

#[test]
fn lease_request_creates_record_and_counts() {
    let mut store = NodeStatsStore::new();
    store.record_lease_request(&node("n1"), NOW);
    store.record_lease_request(&node("n1"), NOW + 1);

    let page = store.list(1, 10, NOW + 2);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].request_count, 2);
    assert_eq!(page.items[0].last_updated, NOW + 1);
}

#[test]
fn assignment_tracks_active_tasks() {
    let mut store = NodeStatsStore::new();
    store.record_assignment(&node("n1"), &[task("t1"), task("t2")], NOW);

    assert_eq!(store.node_for_task(&task("t1")), Some(&node("n1")));
    let page = store.list(1, 10, NOW);
    assert_eq!(page.items[0].assigned_task_count, 2);
    assert_eq!(page.items[0].active_task_count, 2);
    assert_eq!(
        page.items[0].active_task_ids,
        vec![task("t1"), task("t2")]
    );
}

#[test]
fn detach_removes_membership_but_keeps_record() {
    let mut store = NodeStatsStore::new();
    store.record_assignment(&node("n1"), &[task("t1"), task("t2")], NOW);

    store.detach_task(&task("t1"));
    assert!(store.node_for_task(&task("t1")).is_none());
    assert_eq!(store.node_for_task(&task("t2")), Some(&node("n1")));

    store.detach_task(&task("t2"));
    let page = store.list(1, 10, NOW);
    // Record survives with zero active tasks
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].active_task_count, 0);
    assert_eq!(page.items[0].assigned_task_count, 2);
}

#[test]
fn detach_unknown_task_is_a_noop() {
    let mut store = NodeStatsStore::new();
    store.detach_task(&task("missing"));
    assert_eq!(store.node_count(), 0);
}

// ── Processed info ───────────────────────────────────────────────────────────

#[test]
fn record_processed_accumulates_lifetime_totals() {
    let mut store = NodeStatsStore::new();
    store.record_processed(&node("n1"), 10, 5.0, NOW);
    store.record_processed(&node("n1"), 10, 5.0, NOW + 1);

    let page = store.list(1, 10, NOW + 2);
    let view = &page.items[0];
    assert_eq!(view.total_item_num, 20);
    assert!((view.total_running_time - 10.0).abs() < 1e-9);
    assert_eq!(view.record_count, 2);
    assert_eq!(view.recent_records.len(), 2);

    let speed = view.average_speed.expect("speed");
    assert!((speed - 2.0).abs() < 1e-9);
    let per_100 = view.average_time_per_100_items.expect("per 100");
    assert!((per_100 - 50.0).abs() < 1e-9);
}

#[test]
fn zero_running_time_has_zero_speed_sample() {
    let mut store = NodeStatsStore::new();
    store.record_processed(&node("n1"), 10, 0.0, NOW);

    let page = store.list(1, 10, NOW);
    let view = &page.items[0];
    assert_eq!(view.recent_records[0].speed, 0.0);
    assert!(view.average_speed.is_none());
}

// ── Window archiving ─────────────────────────────────────────────────────────

#[test]
fn old_records_archive_out_of_the_window() {
    let mut store = NodeStatsStore::new();
    store.record_processed(&node("n1"), 10, 5.0, NOW);
    // Second sample lands two hours and one ms later: the first expires
    let later = NOW + RECENT_WINDOW_MS + 1;
    store.record_processed(&node("n1"), 4, 2.0, later);

    let page = store.list(1, 10, later);
    let view = &page.items[0];
    assert_eq!(view.recent_records.len(), 1);
    assert_eq!(view.archived_record_count, 1);
    assert_eq!(view.archived_item_num, 10);
    assert!((view.archived_running_time - 5.0).abs() < 1e-9);
    // Lifetime totals keep the full history
    assert_eq!(view.total_item_num, 14);
    assert_eq!(view.record_count, 2);
}

#[test]
fn window_caps_at_max_records() {
    let mut store = NodeStatsStore::new();
    for i in 0..(MAX_RECENT_RECORDS as u64 + 20) {
        store.record_processed(&node("n1"), 1, 1.0, NOW + i);
    }

    let page = store.list(1, 10, NOW + MAX_RECENT_RECORDS as u64 + 20);
    let view = &page.items[0];
    assert_eq!(view.recent_records.len(), MAX_RECENT_RECORDS);
    assert_eq!(view.archived_record_count, 20);
    // archived + window reconstruct the lifetime totals
    let windowed: u64 = view.recent_records.iter().map(|r| r.item_num).sum();
    assert_eq!(view.archived_item_num + windowed, view.total_item_num);
}

#[test]
fn listing_trims_every_node() {
    let mut store = NodeStatsStore::new();
    store.record_processed(&node("n1"), 1, 1.0, NOW);
    store.record_processed(&node("n2"), 2, 1.0, NOW + 1);

    let later = NOW + RECENT_WINDOW_MS + 10;
    let page = store.list(1, 10, later);
    for view in &page.items {
        assert!(view.recent_records.is_empty());
        assert_eq!(view.archived_record_count, 1);
    }
}

// ── Listing and summary ──────────────────────────────────────────────────────

#[test]
fn listing_sorts_by_last_updated_desc() {
    let mut store = NodeStatsStore::new();
    store.record_processed(&node("old"), 1, 1.0, NOW);
    store.record_processed(&node("new"), 1, 1.0, NOW + 100);

    let page = store.list(1, 10, NOW + 200);
    assert_eq!(page.items[0].node_id, node("new"));
    assert_eq!(page.items[1].node_id, node("old"));
}

#[test]
fn summary_rolls_up_all_nodes() {
    let mut store = NodeStatsStore::new();
    store.record_lease_request(&node("n1"), NOW);
    store.record_assignment(&node("n1"), &[task("t1"), task("t2")], NOW);
    store.record_processed(&node("n1"), 10, 5.0, NOW);
    store.record_processed(&node("n2"), 10, 5.0, NOW);
    store.detach_task(&task("t2"));

    let summary = store.summary();
    assert_eq!(summary.node_count, 2);
    assert_eq!(summary.total_item_num, 20);
    assert!((summary.total_running_time - 10.0).abs() < 1e-9);
    assert_eq!(summary.record_count, 2);
    assert_eq!(summary.total_requests, 1);
    assert_eq!(summary.total_assigned_tasks, 2);
    assert_eq!(summary.total_active_tasks, 1);
    let speed = summary.average_speed.expect("speed");
    assert!((speed - 2.0).abs() < 1e-9);
}

#[test]
fn empty_summary_has_null_averages() {
    let store = NodeStatsStore::new();
    let summary = store.summary();
    assert_eq!(summary.node_count, 0);
    assert!(summary.average_speed.is_none());
    assert!(summary.average_time_per_100_items.is_none());
}

// ── Delete and clear ─────────────────────────────────────────────────────────

#[test]
fn delete_purges_node_and_index() {
    let mut store = NodeStatsStore::new();
    store.record_assignment(&node("n1"), &[task("t1")], NOW);
    store.record_assignment(&node("n2"), &[task("t2")], NOW);

    assert!(store.delete(&node("n1")));
    assert!(!store.delete(&node("n1")));
    assert!(store.node_for_task(&task("t1")).is_none());
    assert_eq!(store.node_for_task(&task("t2")), Some(&node("n2")));
    assert_eq!(store.node_count(), 1);
}

#[test]
fn clear_drops_everything() {
    let mut store = NodeStatsStore::new();
    store.record_assignment(&node("n1"), &[task("t1")], NOW);
    store.record_processed(&node("n1"), 1, 1.0, NOW);

    store.clear();
    assert_eq!(store.node_count(), 0);
    assert!(store.node_for_task(&task("t1")).is_none());
}
