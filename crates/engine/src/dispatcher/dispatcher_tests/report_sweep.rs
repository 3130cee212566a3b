// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::TaskId;

// ── Report ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn basic_success_path_counts() {
    let fx = fixture();
    let round = import_round(&fx, &["/a", "/b", "/c"]).await;

    let leased = fx.dispatcher.lease(Some(2), None, None).expect("lease");
    for task in &leased {
        fx.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
    }

    let counts = summary_of(&fx, &round).counts;
    assert_eq!(counts.total, 3);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.processing, 0);
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.failed, 0);

    // Last task completes the round
    let rest = fx.dispatcher.lease(Some(10), None, None).expect("lease");
    assert_eq!(rest.len(), 1);
    fx.dispatcher
        .report(&rest[0].task_id, true, None)
        .await
        .expect("report");
    assert_eq!(summary_of(&fx, &round).status, RoundStatus::Completed);

    let stats = fx.dispatcher.round_stats(Some(&round)).expect("stats");
    assert!(stats.all_completed);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    let err = fx
        .dispatcher
        .report(&TaskId::new("missing"), true, None)
        .await
        .expect_err("unknown task");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn failure_report_keeps_round_open_until_drained() {
    let fx = fixture();
    let round = import_round(&fx, &["/a", "/b"]).await;
    let leased = fx.dispatcher.lease(Some(2), None, None).expect("lease");

    fx.dispatcher
        .report(&leased[0].task_id, false, Some("坏数据".to_string()))
        .await
        .expect("report");
    assert_eq!(summary_of(&fx, &round).status, RoundStatus::Active);

    fx.dispatcher
        .report(&leased[1].task_id, true, None)
        .await
        .expect("report");
    // Drained with one failure: completed lifecycle, not all-completed stats
    assert_eq!(summary_of(&fx, &round).status, RoundStatus::Completed);
    let stats = fx.dispatcher.round_stats(Some(&round)).expect("stats");
    assert!(!stats.all_completed);
    assert_eq!(stats.counts.failed, 1);
}

// ── Sweep ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fail_then_retry_path() {
    let fx = fixture();
    let round = import_round(&fx, &["/x"]).await;

    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    let task_id = leased[0].task_id.clone();

    let touched = fx.dispatcher.sweep(0, None).await.expect("sweep");
    assert_eq!(touched, 1);

    let found = fx
        .dispatcher
        .find_task(task_id.as_str(), None)
        .expect("find")
        .expect("present");
    assert_eq!(found.task.status, TaskStatus::Pending);
    assert_eq!(found.task.failure_count, 1);
    assert!(found
        .task
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("重试"));

    // Second lease + sweep fails it for good
    let again = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(again[0].task_id, task_id);
    assert_eq!(fx.dispatcher.sweep(0, None).await.expect("sweep"), 1);

    let found = fx
        .dispatcher
        .find_task(task_id.as_str(), None)
        .expect("find")
        .expect("present");
    assert_eq!(found.task.status, TaskStatus::Failed);
    assert_eq!(found.task.failure_count, 2);

    // No further requeue; the round is drained and completes
    assert!(fx.dispatcher.lease(Some(1), None, None).expect("lease").is_empty());
    assert_eq!(summary_of(&fx, &round).status, RoundStatus::Completed);
}

#[tokio::test]
async fn sweep_covers_cold_rounds() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    fx.dispatcher.lease(Some(1), None, None).expect("lease");
    // B becomes active; A is demoted (still processing) and evicted
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher
        .set_active_round(&round_b)
        .expect("activate B");
    assert_eq!(summary_of(&fx, &round_a).status, RoundStatus::Pending);

    let touched = fx.dispatcher.sweep(0, None).await.expect("sweep");
    assert_eq!(touched, 1);
    assert_eq!(summary_of(&fx, &round_a).counts.pending, 1);
}

#[tokio::test]
async fn sweep_scoped_to_one_round() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease a");
    fx.dispatcher
        .lease(Some(1), Some(&round_b), None)
        .expect("lease b");

    let touched = fx.dispatcher.sweep(0, Some(&round_b)).await.expect("sweep");
    assert_eq!(touched, 1);
    assert_eq!(summary_of(&fx, &round_a).counts.processing, 1);
    assert_eq!(summary_of(&fx, &round_b).counts.pending, 1);
}

#[tokio::test]
async fn sweep_respects_positive_threshold_with_clock() {
    let fx = fixture();
    import_round(&fx, &["/x"]).await;
    fx.dispatcher.lease(Some(1), None, None).expect("lease");

    fx.clock.advance(std::time::Duration::from_secs(30));
    assert_eq!(fx.dispatcher.sweep(60_000, None).await.expect("sweep"), 0);

    fx.clock.advance(std::time::Duration::from_secs(31));
    assert_eq!(fx.dispatcher.sweep(60_000, None).await.expect("sweep"), 1);
}

// ── Inspection ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn inspect_aggregates_across_rounds() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease a");
    fx.clock.advance(std::time::Duration::from_secs(10));
    fx.dispatcher
        .lease(Some(1), Some(&round_b), None)
        .expect("lease b");
    fx.clock.advance(std::time::Duration::from_secs(5));

    // Durations: /a 15s, /b 5s; threshold 8s
    let report = fx.dispatcher.inspect(8_000, None).expect("inspect");
    assert_eq!(report.aggregate.total_processing, 2);
    assert_eq!(report.aggregate.timed_out_count, 1);
    assert_eq!(report.aggregate.longest_duration_ms, Some(15_000));
    assert_eq!(report.aggregate.top_longest[0].round_id, round_a);
    assert!(report.selected_round.is_none());
}

#[tokio::test]
async fn inspect_selected_round_rides_along() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    fx.dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease a");

    let report = fx.dispatcher.inspect(1_000, Some(&round_b)).expect("inspect");
    let selected = report.selected_round.expect("selected");
    assert_eq!(selected.total_processing, 0);
    assert_eq!(report.aggregate.total_processing, 1);
}

// ── Listing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_tasks_defaults_to_active_round() {
    let fx = fixture();
    import_round(&fx, &["/a1", "/a2"]).await;
    let round_b = import_round(&fx, &["/b1"]).await;

    let page = fx
        .dispatcher
        .list_tasks(TaskFilter::Pending, 1, 10, None)
        .expect("list");
    assert_eq!(page.total, 2);

    let page = fx
        .dispatcher
        .list_tasks(TaskFilter::Pending, 1, 10, Some(&round_b))
        .expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].path, "/b1");
}

#[tokio::test]
async fn list_tasks_without_rounds_is_empty() {
    let fx = fixture();
    let page = fx
        .dispatcher
        .list_tasks(TaskFilter::All, 1, 10, None)
        .expect("list");
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn export_failed_collects_across_rounds() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;
    let leased_a = fx
        .dispatcher
        .lease(Some(1), Some(&round_a), None)
        .expect("lease");
    let leased_b = fx
        .dispatcher
        .lease(Some(1), Some(&round_b), None)
        .expect("lease");
    fx.dispatcher
        .report(&leased_a[0].task_id, false, Some("err-a".to_string()))
        .await
        .expect("report");
    fx.dispatcher
        .report(&leased_b[0].task_id, false, Some("err-b".to_string()))
        .await
        .expect("report");

    let exported = fx.dispatcher.export_failed(None, None).expect("export");
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].round_id, round_a);
    assert_eq!(exported[0].failure_count, 1);
    assert_eq!(exported[0].message.as_deref(), Some("err-a"));

    let capped = fx.dispatcher.export_failed(None, Some(1)).expect("export");
    assert_eq!(capped.len(), 1);

    let scoped = fx
        .dispatcher
        .export_failed(Some(&round_b), None)
        .expect("export");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].path, "/b");
}
