// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn list_rounds_keeps_insertion_order() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;
    let third = import_round(&fx, &["/c"]).await;

    let ids: Vec<RoundId> = fx.dispatcher.list_rounds().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first, second, third]);
}

#[tokio::test]
async fn set_active_round_swaps_the_pointer() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;

    fx.dispatcher.set_active_round(&second).expect("activate");
    assert_eq!(summary_of(&fx, &second).status, RoundStatus::Active);
    assert_eq!(summary_of(&fx, &first).status, RoundStatus::Pending);
    assert!(summary_of(&fx, &second).activated_at.is_some());

    // Leases now come from the new active round
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(leased[0].round_id, second);
}

#[tokio::test]
async fn set_active_round_rejects_unknown_and_completed() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .set_active_round(&RoundId::new("round_9999"))
        .expect_err("unknown");
    assert_eq!(err.code(), "NOT_FOUND");

    let round = import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    let err = fx
        .dispatcher
        .set_active_round(&round)
        .expect_err("completed");
    assert_eq!(err.code(), "ROUND_COMPLETED");
}

#[tokio::test]
async fn activation_time_is_set_on_first_transition_only() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;
    let activated_at = summary_of(&fx, &first).activated_at.expect("activated");

    fx.clock.advance(std::time::Duration::from_secs(60));
    fx.dispatcher.set_active_round(&second).expect("activate");
    fx.dispatcher.set_active_round(&first).expect("re-activate");

    assert_eq!(summary_of(&fx, &first).activated_at, Some(activated_at));
}

#[tokio::test]
async fn find_task_searches_globally_by_path() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/deep/b"]).await;

    let found = fx
        .dispatcher
        .find_task("/deep/b", None)
        .expect("find")
        .expect("present");
    assert_eq!(found.round_id, round_b);
    assert_eq!(found.task.path, "/deep/b");

    assert!(fx
        .dispatcher
        .find_task("/missing", None)
        .expect("find")
        .is_none());
}

#[tokio::test]
async fn find_task_scoped_to_a_round() {
    let fx = fixture();
    let round_a = import_round(&fx, &["/a"]).await;
    let round_b = import_round(&fx, &["/b"]).await;

    assert!(fx
        .dispatcher
        .find_task("/a", Some(&round_b))
        .expect("find")
        .is_none());
    let found = fx
        .dispatcher
        .find_task("/a", Some(&round_a))
        .expect("find")
        .expect("present");
    assert_eq!(found.task.path, "/a");
}

#[tokio::test]
async fn round_stats_without_any_round_is_no_active() {
    let fx = fixture();
    let err = fx.dispatcher.round_stats(None).expect_err("no rounds");
    assert_eq!(err.code(), "NO_ACTIVE_ROUND");
}

#[tokio::test]
async fn clear_round_reresolves_the_active_pointer() {
    let fx = fixture();
    let first = import_round(&fx, &["/a"]).await;
    let second = import_round(&fx, &["/b"]).await;

    fx.dispatcher.clear_round(&first).await.expect("clear");
    // The next round in insertion order takes over
    assert_eq!(summary_of(&fx, &second).status, RoundStatus::Active);
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");
    assert_eq!(leased[0].round_id, second);
}

#[tokio::test]
async fn clear_unknown_round_is_not_found() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .clear_round(&RoundId::new("round_9999"))
        .await
        .expect_err("unknown");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn cleared_tasks_are_unroutable() {
    let fx = fixture();
    let round = import_round(&fx, &["/a"]).await;
    let leased = fx.dispatcher.lease(Some(1), None, None).expect("lease");

    fx.dispatcher.clear_round(&round).await.expect("clear");
    let err = fx
        .dispatcher
        .report(&leased[0].task_id, true, None)
        .await
        .expect_err("cleared task");
    assert_eq!(err.code(), "NOT_FOUND");
}
