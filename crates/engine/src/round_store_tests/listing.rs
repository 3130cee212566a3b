// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn populated() -> (RoundStore, Vec<TaskId>) {
    let (mut store, ids, mut nodes) = store();
    let added = enqueue_all(&mut store, &ids, &["/a", "/b", "/c", "/d", "/e"]);
    // /a /b processing, /c completed, /d failed, /e pending
    store.lease(2, None, NOW + 10);
    store.report(&added[2], true, None, &mut nodes, NOW + 20);
    store.report(&added[3], false, None, &mut nodes, NOW + 30);
    (store, added)
}

#[test]
fn pending_listing_follows_fifo() {
    let (store, added) = populated();
    let page = store.list(TaskFilter::Pending, 1, 10);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, added[4]);
}

#[test]
fn processing_listing_sorts_by_start_desc() {
    let (mut store, _) = populated();
    // Lease /e later so it has the newest start
    let late = store.lease(1, None, NOW + 100);
    assert_eq!(late.len(), 1);

    let page = store.list(TaskFilter::Processing, 1, 10);
    assert_eq!(page.total, 3);
    assert_eq!(page.items[0].id, late[0].id);
}

#[test]
fn completed_and_failed_list_most_recent_first() {
    let (mut store, _) = populated();
    let (ids, mut nodes) = (SequentialIdGen::new("x"), NodeStatsStore::new());
    let more = store.enqueue(["/f"], &ids, NOW + 40).added;
    store.report(&more[0], true, None, &mut nodes, NOW + 50);

    let completed = store.list(TaskFilter::Completed, 1, 10);
    assert_eq!(completed.total, 2);
    assert_eq!(completed.items[0].path, "/f");
    assert_eq!(completed.items[1].path, "/c");

    let failed = store.list(TaskFilter::Failed, 1, 10);
    assert_eq!(failed.total, 1);
    assert_eq!(failed.items[0].path, "/d");
}

#[test]
fn all_listing_sorts_by_updated_desc() {
    let (store, added) = populated();
    let page = store.list(TaskFilter::All, 1, 10);
    assert_eq!(page.total, 5);
    // /d was updated last (failed at NOW+30)
    assert_eq!(page.items[0].id, added[3]);
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[test]
fn pagination_splits_pages() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/1", "/2", "/3", "/4", "/5"]);

    let page1 = store.list(TaskFilter::Pending, 1, 2);
    assert_eq!(page1.items.len(), 2);
    assert_eq!(page1.total, 5);
    assert_eq!(page1.page, 1);

    let page3 = store.list(TaskFilter::Pending, 3, 2);
    assert_eq!(page3.items.len(), 1);
    assert_eq!(page3.items[0].path, "/5");
}

#[test]
fn out_of_range_page_resolves_to_last() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/1", "/2", "/3"]);

    let page = store.list(TaskFilter::Pending, 99, 2);
    assert_eq!(page.page, 2);
    assert_eq!(page.items.len(), 1);
}

#[test]
fn page_and_size_clamp_to_one() {
    let (mut store, ids, _) = store();
    enqueue_all(&mut store, &ids, &["/1", "/2"]);

    let page = store.list(TaskFilter::Pending, 0, 0);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 1);
    assert_eq!(page.items.len(), 1);
}

#[test]
fn empty_listing_is_page_one() {
    let (store, _, _) = store();
    let page = store.list(TaskFilter::Pending, 5, 10);
    assert_eq!(page.page, 1);
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

// ── Find ─────────────────────────────────────────────────────────────────────

#[test]
fn find_by_id_then_by_path() {
    let (store, added) = populated();
    assert_eq!(
        store.find(added[0].as_str()).map(|t| t.path),
        Some("/a".to_string())
    );
    assert_eq!(store.find("/b").map(|t| t.id), Some(added[1].clone()));
    assert!(store.find("nope").is_none());
}
