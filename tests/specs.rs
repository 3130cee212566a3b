// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end scenarios against a filesystem sink.

use rup_core::{
    ConfigPatch, DispatchConfig, FakeClock, NodeId, RoundStatus, SequentialIdGen, TaskStatus,
};
use rup_engine::{Dispatcher, FakeWebhookSink, ImportOptions, ProcessedInfo, TaskFilter};
use rup_storage::FsRoundSink;
use std::path::Path;

type SpecDispatcher = Dispatcher<FsRoundSink, FakeWebhookSink, FakeClock, SequentialIdGen>;

struct Harness {
    dispatcher: SpecDispatcher,
    webhook: FakeWebhookSink,
    clock: FakeClock,
}

fn harness(dir: &Path) -> Harness {
    let webhook = FakeWebhookSink::new();
    let clock = FakeClock::new();
    let dispatcher = Dispatcher::new(
        FsRoundSink::new(dir),
        webhook.clone(),
        clock.clone(),
        SequentialIdGen::new("task"),
        DispatchConfig::default(),
    );
    Harness {
        dispatcher,
        webhook,
        clock,
    }
}

fn harness_with_webhook(dir: &Path) -> Harness {
    let h = harness(dir);
    h.dispatcher
        .update_config(&ConfigPatch {
            feishu_webhook_url: Some(Some("https://open.feishu.cn/hook/spec".to_string())),
            ..ConfigPatch::default()
        })
        .expect("configure webhook");
    h
}

async fn import(h: &Harness, paths: &[&str]) -> rup_core::RoundId {
    h.dispatcher
        .import(paths.iter().copied(), ImportOptions::default())
        .await
        .expect("import")
        .round_id
}

// ── Scenario 1: basic success path ───────────────────────────────────────────

#[tokio::test]
async fn basic_success_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness_with_webhook(dir.path());
    let round = import(&h, &["/a", "/b", "/c"]).await;

    let first = h.dispatcher.lease(Some(2), None, None).expect("lease");
    assert_eq!(first.len(), 2);
    for task in &first {
        let status = h
            .dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
        assert_eq!(status, TaskStatus::Completed);
    }

    let summary = h
        .dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == round)
        .expect("round");
    assert_eq!(summary.counts.total, 3);
    assert_eq!(summary.counts.pending, 1);
    assert_eq!(summary.counts.processing, 0);
    assert_eq!(summary.counts.completed, 2);
    assert_eq!(summary.counts.failed, 0);

    let second = h.dispatcher.lease(Some(10), None, None).expect("lease");
    assert_eq!(second.len(), 1);
    h.dispatcher
        .report(&second[0].task_id, true, None)
        .await
        .expect("report");

    let summary = h
        .dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == round)
        .expect("round");
    assert_eq!(summary.status, RoundStatus::Completed);

    let stats = h.dispatcher.round_stats(Some(&round)).expect("stats");
    assert!(stats.all_completed);

    // Webhook fired exactly once and the digest is stable
    assert_eq!(h.webhook.calls().len(), 1);
    let digest = h.dispatcher.completion_digest().expect("digest");
    h.dispatcher.sweep(0, None).await.expect("sweep");
    assert_eq!(h.dispatcher.completion_digest(), Some(digest));
    assert_eq!(h.webhook.calls().len(), 1);
}

// ── Scenario 2: duplicate import into the same round ─────────────────────────

#[tokio::test]
async fn duplicate_import_into_same_round() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    let round = import(&h, &["/a", "/b"]).await;

    let result = h
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

    assert_eq!(result.added, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.counts.total, 3);
    assert_eq!(result.counts.pending, 3);
}

// ── Scenario 3: fail-then-retry path ─────────────────────────────────────────

#[tokio::test]
async fn fail_then_retry_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    import(&h, &["/x"]).await;

    let leased = h.dispatcher.lease(Some(1), None, None).expect("lease");
    let task_id = leased[0].task_id.clone();

    assert_eq!(h.dispatcher.sweep(0, None).await.expect("sweep"), 1);
    let task = h
        .dispatcher
        .find_task(task_id.as_str(), None)
        .expect("find")
        .expect("present")
        .task;
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.failure_count, 1);
    assert!(task.message.as_deref().unwrap_or_default().contains("重试"));

    let leased = h.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(leased[0].task_id, task_id);

    assert_eq!(h.dispatcher.sweep(0, None).await.expect("sweep"), 1);
    let task = h
        .dispatcher
        .find_task(task_id.as_str(), None)
        .expect("find")
        .expect("present")
        .task;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_count, 2);

    // No further requeue
    assert!(h.dispatcher.lease(Some(1), None, None).expect("lease").is_empty());
}

// ── Scenario 4: cross-round allocation ───────────────────────────────────────

#[tokio::test]
async fn cross_round_allocation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    let round_a = import(&h, &["/a1", "/a2"]).await;
    let round_b = import(&h, &["/b1"]).await;

    let leased = h.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(leased.len(), 2);
    assert!(leased.iter().all(|t| t.round_id == round_a));

    let untouched = h
        .dispatcher
        .list_tasks(TaskFilter::Pending, 1, 10, Some(&round_b))
        .expect("list");
    assert_eq!(untouched.total, 1);

    for task in &leased {
        h.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
    }

    let leased = h.dispatcher.lease(Some(5), None, None).expect("lease");
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].path, "/b1");
    let summary = h
        .dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == round_b)
        .expect("round");
    assert_eq!(summary.status, RoundStatus::Active);
}

// ── Scenario 5: node stats cycle ─────────────────────────────────────────────

#[tokio::test]
async fn node_stats_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    import(&h, &["/a", "/b", "/c"]).await;
    let node = NodeId::new("n1");

    let leased = h
        .dispatcher
        .lease(Some(3), None, Some(&node))
        .expect("lease");
    assert_eq!(leased.len(), 3);

    for task in leased.iter().take(2) {
        h.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
        h.dispatcher
            .record_processed(
                &ProcessedInfo {
                    node_id: node.clone(),
                    item_num: 10,
                    running_time: 5.0,
                },
                None,
            )
            .expect("record");
    }
    h.dispatcher
        .report(&leased[2].task_id, false, None)
        .await
        .expect("report");

    let (page, _) = h.dispatcher.list_nodes(1, 10, None);
    let view = &page.items[0];
    assert_eq!(view.request_count, 1);
    assert_eq!(view.assigned_task_count, 3);
    assert_eq!(view.active_task_count, 0);
    assert_eq!(view.total_item_num, 20);
    assert!((view.total_running_time - 10.0).abs() < 1e-9);
    assert!((view.average_speed.expect("speed") - 2.0).abs() < 1e-9);
    assert!((view.average_time_per_100_items.expect("per 100") - 50.0).abs() < 1e-9);
}

// ── Scenario 6: cold/hot eviction round-trip ─────────────────────────────────

#[tokio::test]
async fn cold_hot_eviction_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (round_1, round_2, old_task) = {
        let h = harness(dir.path());
        let round_1 = import(&h, &["/a1", "/a2"]).await;
        let leased = h.dispatcher.lease(Some(1), None, None).expect("lease");
        h.dispatcher
            .report(&leased[0].task_id, true, None)
            .await
            .expect("report");

        let round_2 = import(&h, &["/b1"]).await;
        h.dispatcher.set_active_round(&round_2).expect("activate");

        // Round 1 was persisted and released
        assert!(dir.path().join(format!("{round_1}.json")).exists());

        let pending = h
            .dispatcher
            .list_tasks(TaskFilter::Pending, 1, 10, Some(&round_1))
            .expect("list");
        (round_1, round_2, pending.items[0].id.clone())
    };

    // Restart: a fresh dispatcher over the same directory
    let dispatcher = Dispatcher::open(
        FsRoundSink::new(dir.path()),
        FakeWebhookSink::new(),
        FakeClock::new(),
        SequentialIdGen::new("task2"),
        DispatchConfig::default(),
    )
    .expect("open");

    let rounds = dispatcher.list_rounds();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0].id, round_1);
    assert_eq!(rounds[0].counts.total, 2);
    assert_eq!(rounds[0].counts.completed, 1);
    assert_eq!(rounds[0].counts.pending, 1);
    assert_eq!(rounds[1].id, round_2);

    // Reporting the old task id loads round 1 on demand
    let status = dispatcher
        .report(&old_task, true, None)
        .await
        .expect("report");
    assert_eq!(status, TaskStatus::Completed);

    let summary = dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == round_1)
        .expect("round");
    assert_eq!(summary.status, RoundStatus::Completed);
}

// ── Cross-cutting properties ─────────────────────────────────────────────────

/// Lease/report/sweep never lose or duplicate tasks.
#[tokio::test]
async fn no_tasks_are_lost_across_transitions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    let round = import(&h, &["/1", "/2", "/3", "/4", "/5"]).await;

    let leased = h.dispatcher.lease(Some(3), None, None).expect("lease");
    h.dispatcher
        .report(&leased[0].task_id, true, None)
        .await
        .expect("report");
    h.dispatcher
        .report(&leased[1].task_id, false, None)
        .await
        .expect("report");
    h.dispatcher.sweep(0, None).await.expect("sweep");
    h.clock.advance(std::time::Duration::from_secs(1));
    h.dispatcher.lease(Some(2), None, None).expect("lease");

    let summary = h
        .dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == round)
        .expect("round");
    let counts = summary.counts;
    assert_eq!(counts.total, 5);
    assert_eq!(
        counts.pending + counts.processing + counts.completed + counts.failed,
        counts.total
    );

    let all = h
        .dispatcher
        .list_tasks(TaskFilter::All, 1, 100, Some(&round))
        .expect("list");
    assert_eq!(all.total, 5);
}

/// Completion wins over late failures and sweeps.
#[tokio::test]
async fn completion_is_monotonic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    import(&h, &["/x"]).await;

    let leased = h.dispatcher.lease(Some(1), None, None).expect("lease");
    let id = leased[0].task_id.clone();
    h.dispatcher.report(&id, true, None).await.expect("report");

    let status = h
        .dispatcher
        .report(&id, false, Some("late".to_string()))
        .await
        .expect("late failure");
    assert_eq!(status, TaskStatus::Completed);

    h.dispatcher.sweep(0, None).await.expect("sweep");
    let task = h
        .dispatcher
        .find_task(id.as_str(), None)
        .expect("find")
        .expect("present")
        .task;
    assert_eq!(task.status, TaskStatus::Completed);
}

/// Snapshot files follow the documented wire format.
#[tokio::test]
async fn snapshot_files_use_the_wire_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness(dir.path());
    let round = import(&h, &["/a"]).await;
    // Evict by activating a second round
    let round_2 = import(&h, &["/b"]).await;
    h.dispatcher.set_active_round(&round_2).expect("activate");

    let raw = std::fs::read_to_string(dir.path().join(format!("{round}.json"))).expect("read");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("parse");
    assert_eq!(json["metadata"]["id"], round.as_str());
    assert_eq!(json["metadata"]["status"], "pending");
    assert_eq!(json["store"]["roundId"], round.as_str());
    assert!(json["store"]["tasks"].is_array());
    assert!(json["store"]["pendingQueue"].is_array());
    assert_eq!(json["store"]["totalProcessedItemNum"], 0);
}
